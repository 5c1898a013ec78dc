use crate::database::models::UserRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};

pub(super) struct SqliteUserRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        token_hash: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl<'conn> SqliteUserRepository<'conn> {
    fn find_one<P: Params>(&self, column: &str, params: P) -> Result<Option<UserRecord>> {
        let sql = format!(
            "SELECT id, username, token_hash, created_at FROM users WHERE {column} = ?1"
        );
        Ok(self.conn.query_row(&sql, params, map_user).optional()?)
    }
}

impl<'conn> super::UserRepository for SqliteUserRepository<'conn> {
    fn create(&self, record: &UserRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO users (username, token_hash, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![record.username, record.token_hash, record.created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<UserRecord>> {
        self.find_one("id", params![id])
    }

    fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        self.find_one("username", params![username])
    }

    fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<UserRecord>> {
        self.find_one("token_hash", params![token_hash])
    }
}
