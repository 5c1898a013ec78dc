use crate::database::models::TopicAppendRecord;
use anyhow::Result;
use rusqlite::{params, Connection};

pub(super) struct SqliteTopicAppendRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::TopicAppendRepository for SqliteTopicAppendRepository<'conn> {
    fn create(&self, record: &TopicAppendRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO topic_appends (content, topic_id, create_time)
            VALUES (?1, ?2, ?3)
            "#,
            params![record.content, record.topic_id, record.create_time],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_for_topic(&self, topic_id: i64) -> Result<Vec<TopicAppendRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, content, topic_id, create_time
            FROM topic_appends
            WHERE topic_id = ?1
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![topic_id], |row| {
            Ok(TopicAppendRecord {
                id: row.get(0)?,
                content: row.get(1)?,
                topic_id: row.get(2)?,
                create_time: row.get(3)?,
            })
        })?;
        let mut appends = Vec::new();
        for row in rows {
            appends.push(row?);
        }
        Ok(appends)
    }
}
