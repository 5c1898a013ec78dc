use crate::auth::{generate_token, hash_token};
use crate::database::models::UserRecord;
use crate::database::repositories::UserRepository;
use crate::database::Database;
use anyhow::{bail, Result};
use serde::Serialize;

#[derive(Clone)]
pub struct UserService {
    database: Database,
}

/// A newly registered user together with the only copy of their API token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedCredentials {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

impl UserService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn register(&self, username: &str) -> Result<IssuedCredentials> {
        let username = username.trim();
        if username.is_empty() {
            bail!("username may not be empty");
        }
        if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            bail!("username may only contain letters, digits and underscores");
        }

        let token = generate_token();
        let record = UserRecord::new(username, hash_token(&token));
        let user_id = self.database.with_transaction(|repos| {
            let users = repos.users();
            if users.find_by_username(username)?.is_some() {
                bail!("username {username} is already taken");
            }
            users.create(&record)
        })?;
        tracing::info!(user_id, username, "user registered");

        Ok(IssuedCredentials {
            user_id,
            username: username.to_string(),
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authenticate;
    use rusqlite::Connection;

    fn service() -> UserService {
        let db = Database::from_connection(Connection::open_in_memory().unwrap(), true);
        db.ensure_migrations().unwrap();
        UserService::new(db)
    }

    #[test]
    fn registered_token_authenticates() {
        let service = service();
        let issued = service.register("alice").unwrap();
        let user = authenticate(&service.database, &issued.token).unwrap();
        assert_eq!(user.id, issued.user_id);
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn rejects_duplicate_and_invalid_names() {
        let service = service();
        service.register("alice").unwrap();
        assert!(service.register("alice").is_err());
        assert!(service.register("   ").is_err());
        assert!(service.register("bad name").is_err());
    }
}
