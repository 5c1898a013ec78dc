use crate::database::models::TopicRecord;
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteTopicRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn map_topic(row: &Row<'_>) -> rusqlite::Result<TopicRecord> {
    Ok(TopicRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        node_id: row.get(3)?,
        user_id: row.get(4)?,
        reply_num: row.get(5)?,
        create_time: row.get(6)?,
    })
}

impl<'conn> super::TopicRepository for SqliteTopicRepository<'conn> {
    fn create(&self, record: &TopicRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO topics (title, content, node_id, user_id, reply_num, create_time)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.title,
                record.content,
                record.node_id,
                record.user_id,
                record.reply_num,
                record.create_time
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<TopicRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, title, content, node_id, user_id, reply_num, create_time
                FROM topics
                WHERE id = ?1
                "#,
                params![id],
                map_topic,
            )
            .optional()?)
    }

    fn list_page(&self, limit: usize, offset: usize) -> Result<Vec<TopicRecord>> {
        let limit = i64::try_from(limit).context("page size out of range")?;
        let offset = i64::try_from(offset).context("page offset out of range")?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, title, content, node_id, user_id, reply_num, create_time
            FROM topics
            ORDER BY datetime(create_time) DESC, id DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )?;
        let rows = stmt.query_map(params![limit, offset], map_topic)?;
        let mut topics = Vec::new();
        for row in rows {
            topics.push(row?);
        }
        Ok(topics)
    }

    fn update_content(&self, id: i64, content: &str) -> Result<()> {
        let updated = self.conn.execute(
            r#"
            UPDATE topics
            SET content = ?1
            WHERE id = ?2
            "#,
            params![content, id],
        )?;
        if updated == 0 {
            bail!("topic {id} not found");
        }
        Ok(())
    }

    fn increment_reply_num(&self, id: i64) -> Result<()> {
        let updated = self.conn.execute(
            r#"
            UPDATE topics
            SET reply_num = reply_num + 1
            WHERE id = ?1
            "#,
            params![id],
        )?;
        if updated == 0 {
            bail!("topic {id} not found");
        }
        Ok(())
    }
}
