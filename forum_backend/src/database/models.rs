use crate::utils::now_utc_iso;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Row ids are assigned by SQLite; records built for insertion carry `id = 0`.
pub const UNSAVED_ID: i64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    /// Hex SHA-256 of the API token.
    pub token_hash: String,
    pub created_at: String,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, token_hash: impl Into<String>) -> Self {
        Self {
            id: UNSAVED_ID,
            username: username.into(),
            token_hash: token_hash.into(),
            created_at: now_utc_iso(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub node_id: i64,
    pub user_id: i64,
    pub reply_num: i64,
    pub create_time: String,
}

impl TopicRecord {
    pub fn new(title: String, content: String, node_id: i64, user_id: i64) -> Self {
        Self {
            id: UNSAVED_ID,
            title,
            content,
            node_id,
            user_id,
            reply_num: 0,
            create_time: now_utc_iso(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub topic_id: i64,
    pub create_time: String,
}

impl CommentRecord {
    pub fn new(content: String, user_id: i64, topic_id: i64) -> Self {
        Self {
            id: UNSAVED_ID,
            content,
            user_id,
            topic_id,
            create_time: now_utc_iso(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicAppendRecord {
    pub id: i64,
    pub content: String,
    pub topic_id: i64,
    pub create_time: String,
}

impl TopicAppendRecord {
    pub fn new(content: String, topic_id: i64) -> Self {
        Self {
            id: UNSAVED_ID,
            content,
            topic_id,
            create_time: now_utc_iso(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Reply,
    Mention,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Reply => "reply",
            NotificationKind::Mention => "mention",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "reply" => Ok(NotificationKind::Reply),
            "mention" => Ok(NotificationKind::Mention),
            other => anyhow::bail!("unknown notification kind {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: i64,
    pub recipient_id: i64,
    pub sender_id: i64,
    pub topic_id: i64,
    pub comment_id: i64,
    pub kind: NotificationKind,
    pub create_time: String,
    pub is_read: bool,
}

impl NotificationRecord {
    pub fn new(
        recipient_id: i64,
        sender_id: i64,
        topic_id: i64,
        comment_id: i64,
        kind: NotificationKind,
    ) -> Self {
        Self {
            id: UNSAVED_ID,
            recipient_id,
            sender_id,
            topic_id,
            comment_id,
            kind,
            create_time: now_utc_iso(),
            is_read: false,
        }
    }
}
