use crate::database::models::{NotificationKind, NotificationRecord};
use anyhow::Result;
use rusqlite::types::Type;
use rusqlite::{params, Connection};

pub(super) struct SqliteNotificationRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::NotificationRepository for SqliteNotificationRepository<'conn> {
    fn create(&self, record: &NotificationRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO notifications (recipient_id, sender_id, topic_id, comment_id, kind, create_time, is_read)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.recipient_id,
                record.sender_id,
                record.topic_id,
                record.comment_id,
                record.kind.as_str(),
                record.create_time,
                if record.is_read { 1 } else { 0 }
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_for_recipient(&self, recipient_id: i64) -> Result<Vec<NotificationRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, recipient_id, sender_id, topic_id, comment_id, kind, create_time, is_read
            FROM notifications
            WHERE recipient_id = ?1
            ORDER BY id DESC
            "#,
        )?;
        let rows = stmt.query_map(params![recipient_id], |row| {
            let kind: String = row.get(5)?;
            let kind = kind.parse::<NotificationKind>().map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(5, Type::Text, err.into())
            })?;
            Ok(NotificationRecord {
                id: row.get(0)?,
                recipient_id: row.get(1)?,
                sender_id: row.get(2)?,
                topic_id: row.get(3)?,
                comment_id: row.get(4)?,
                kind,
                create_time: row.get(6)?,
                is_read: row.get::<_, i64>(7)? != 0,
            })
        })?;
        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?);
        }
        Ok(notifications)
    }
}
