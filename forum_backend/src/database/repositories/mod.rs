mod comments;
mod notifications;
mod topic_appends;
mod topics;
mod users;

use super::models::{
    CommentRecord, NotificationRecord, TopicAppendRecord, TopicRecord, UserRecord,
};
use anyhow::Result;
use rusqlite::Connection;

/// `create` methods ignore the record's `id` and return the row id SQLite
/// assigned.
pub trait UserRepository {
    fn create(&self, record: &UserRecord) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<UserRecord>>;
    fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>>;
    fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<UserRecord>>;
}

pub trait TopicRepository {
    fn create(&self, record: &TopicRecord) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<TopicRecord>>;
    /// Newest first.
    fn list_page(&self, limit: usize, offset: usize) -> Result<Vec<TopicRecord>>;
    fn update_content(&self, id: i64, content: &str) -> Result<()>;
    fn increment_reply_num(&self, id: i64) -> Result<()>;
}

pub trait CommentRepository {
    fn create(&self, record: &CommentRecord) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<CommentRecord>>;
    fn list_for_topic(&self, topic_id: i64) -> Result<Vec<CommentRecord>>;
    fn count_for_topic(&self, topic_id: i64) -> Result<i64>;
}

pub trait TopicAppendRepository {
    fn create(&self, record: &TopicAppendRecord) -> Result<i64>;
    fn list_for_topic(&self, topic_id: i64) -> Result<Vec<TopicAppendRecord>>;
}

pub trait NotificationRepository {
    fn create(&self, record: &NotificationRecord) -> Result<i64>;
    /// Newest first.
    fn list_for_recipient(&self, recipient_id: i64) -> Result<Vec<NotificationRecord>>;
}

pub struct SqliteRepositories<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositories<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn users(&self) -> impl UserRepository + '_ {
        users::SqliteUserRepository { conn: self.conn }
    }

    pub fn topics(&self) -> impl TopicRepository + '_ {
        topics::SqliteTopicRepository { conn: self.conn }
    }

    pub fn comments(&self) -> impl CommentRepository + '_ {
        comments::SqliteCommentRepository { conn: self.conn }
    }

    pub fn topic_appends(&self) -> impl TopicAppendRepository + '_ {
        topic_appends::SqliteTopicAppendRepository { conn: self.conn }
    }

    pub fn notifications(&self) -> impl NotificationRepository + '_ {
        notifications::SqliteNotificationRepository { conn: self.conn }
    }
}
