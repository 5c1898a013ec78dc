//! Token authentication for mutating endpoints.
//!
//! Clients send their API token either as `Authorization: Bearer <token>` or
//! as HTTP Basic credentials whose username is the token. Only the SHA-256
//! digest of a token is ever stored.

use crate::api::{ApiError, AppState};
use crate::database::models::UserRecord;
use crate::database::repositories::UserRepository;
use crate::database::Database;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication required")]
    MissingCredentials,
    #[error("invalid authorization header")]
    MalformedHeader,
    #[error("invalid token")]
    InvalidToken,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Identity resolved from the request's credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

impl From<UserRecord> for AuthUser {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
        }
    }
}

pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Pulls the raw token out of an `Authorization` header value.
pub fn parse_authorization(value: &str) -> Result<String, AuthError> {
    let value = value.trim();
    let (scheme, credentials) = value
        .split_once(' ')
        .ok_or(AuthError::MalformedHeader)?;
    let credentials = credentials.trim();

    let token = if scheme.eq_ignore_ascii_case("bearer") {
        credentials.to_string()
    } else if scheme.eq_ignore_ascii_case("basic") {
        let decoded = STANDARD
            .decode(credentials)
            .map_err(|_| AuthError::MalformedHeader)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedHeader)?;
        // token:<anything>
        match decoded.split_once(':') {
            Some((token, _)) => token.to_string(),
            None => decoded,
        }
    } else {
        return Err(AuthError::MalformedHeader);
    };

    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}

pub fn authenticate(database: &Database, token: &str) -> Result<AuthUser, AuthError> {
    let token_hash = hash_token(token);
    let user = database.with_repositories(|repos| repos.users().find_by_token_hash(&token_hash))?;
    user.map(AuthUser::from).ok_or(AuthError::InvalidToken)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingCredentials)?;
        let header = header.to_str().map_err(|_| AuthError::MalformedHeader)?;
        let token = parse_authorization(header)?;
        let user = authenticate(&state.database, &token)?;
        tracing::debug!(user_id = user.id, username = %user.username, "request authenticated");
        Ok(user)
    }
}
