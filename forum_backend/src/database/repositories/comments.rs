use crate::database::models::CommentRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteCommentRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRecord> {
    Ok(CommentRecord {
        id: row.get(0)?,
        content: row.get(1)?,
        user_id: row.get(2)?,
        topic_id: row.get(3)?,
        create_time: row.get(4)?,
    })
}

impl<'conn> super::CommentRepository for SqliteCommentRepository<'conn> {
    fn create(&self, record: &CommentRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO comments (content, user_id, topic_id, create_time)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                record.content,
                record.user_id,
                record.topic_id,
                record.create_time
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<CommentRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, content, user_id, topic_id, create_time
                FROM comments
                WHERE id = ?1
                "#,
                params![id],
                map_comment,
            )
            .optional()?)
    }

    fn list_for_topic(&self, topic_id: i64) -> Result<Vec<CommentRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, content, user_id, topic_id, create_time
            FROM comments
            WHERE topic_id = ?1
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![topic_id], map_comment)?;
        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    fn count_for_topic(&self, topic_id: i64) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM comments
            WHERE topic_id = ?1
            "#,
            params![topic_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
