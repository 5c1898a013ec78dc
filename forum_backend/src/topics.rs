use crate::auth::AuthUser;
use crate::config::PaginationConfig;
use crate::database::models::{CommentRecord, TopicAppendRecord, TopicRecord, UserRecord};
use crate::database::repositories::{
    CommentRepository, SqliteRepositories, TopicAppendRepository, TopicRepository,
    UserRepository,
};
use crate::database::Database;
use crate::notify;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

pub const NO_TOPIC: &str = "no topic";
pub const NO_TOPICS: &str = "no topics";
pub const CANNOT_APPEND: &str = "can't append topic";
pub const CANNOT_EDIT: &str = "can't edit topic";

#[derive(Debug, Error)]
pub enum TopicError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type TopicResult<T> = Result<T, TopicError>;

#[derive(Clone)]
pub struct TopicService {
    database: Database,
    pagination: PaginationConfig,
}

impl TopicService {
    pub fn new(database: Database, pagination: PaginationConfig) -> Self {
        Self {
            database,
            pagination,
        }
    }

    /// One page of topics, newest first. Pages are 1-based; an empty page is
    /// reported as `NotFound`.
    pub fn list_topics(&self, page: usize) -> TopicResult<Vec<TopicView>> {
        let per_page = self.pagination.per_page;
        let offset = page
            .max(1)
            .checked_sub(1)
            .and_then(|skipped| skipped.checked_mul(per_page))
            .filter(|offset| *offset <= i64::MAX as usize)
            .ok_or(TopicError::NotFound(NO_TOPICS))?;

        let views = self.database.with_repositories(|repos| {
            let topics = repos.topics().list_page(per_page, offset)?;
            let mut authors = HashMap::new();
            let mut views = Vec::with_capacity(topics.len());
            for topic in topics {
                views.push(build_view(&repos, topic, &mut authors)?);
            }
            Ok(views)
        })?;

        if views.is_empty() {
            return Err(TopicError::NotFound(NO_TOPICS));
        }
        Ok(views)
    }

    pub fn create_topic(&self, author: &AuthUser, input: CreateTopicInput) -> TopicResult<i64> {
        let title = input
            .title
            .filter(|title| !title.trim().is_empty())
            .ok_or(TopicError::Validation("not title provided"))?;
        let content = input
            .content
            .ok_or(TopicError::Validation("not content provided"))?;
        let node_id = input
            .node_id
            .ok_or(TopicError::Validation("not node_id provided"))?;

        let record = TopicRecord::new(title, content, node_id, author.id);
        let topic_id = self
            .database
            .with_repositories(|repos| repos.topics().create(&record))?;
        tracing::info!(topic_id, node_id, user_id = author.id, "topic created");
        Ok(topic_id)
    }

    pub fn get_topic(&self, topic_id: i64) -> TopicResult<TopicView> {
        let view = self.database.with_repositories(|repos| {
            let Some(topic) = repos.topics().get(topic_id)? else {
                return Ok(None);
            };
            build_view(&repos, topic, &mut HashMap::new()).map(Some)
        })?;
        view.ok_or(TopicError::NotFound(NO_TOPIC))
    }

    /// Stores the comment and bumps `reply_num` in one transaction, then
    /// notifies mentioned users and the topic owner. Notification failures
    /// are logged only; the comment stands.
    pub fn add_comment(
        &self,
        author: &AuthUser,
        topic_id: i64,
        input: CreateCommentInput,
    ) -> TopicResult<CommentView> {
        let content = input
            .content
            .ok_or(TopicError::Validation("not comment content provided"))?;
        let tid = input
            .tid
            .ok_or(TopicError::Validation("not topic id provided"))?;
        if tid != topic_id {
            tracing::debug!(topic_id, tid, "comment body tid differs from path, using path");
        }

        let record = CommentRecord::new(content, author.id, topic_id);
        let comment_id = self.database.with_transaction(|repos| {
            if repos.topics().get(topic_id)?.is_none() {
                return Err(TopicError::NotFound(NO_TOPIC));
            }
            let comment_id = repos.comments().create(&record)?;
            repos.topics().increment_reply_num(topic_id)?;
            Ok::<_, TopicError>(comment_id)
        })?;
        tracing::info!(topic_id, comment_id, user_id = author.id, "comment added");

        if let Err(err) = notify::dispatch_comment_notifications(
            &self.database,
            &record.content,
            author.id,
            topic_id,
            comment_id,
        ) {
            tracing::warn!(error = ?err, topic_id, comment_id, "failed to dispatch comment notifications");
        }

        Ok(CommentView {
            id: comment_id,
            topic_id,
            content: record.content,
            user: UserSummary {
                id: author.id,
                username: author.username.clone(),
            },
            create_time: record.create_time,
        })
    }

    pub fn append_topic(
        &self,
        author: &AuthUser,
        topic_id: i64,
        input: TopicContentInput,
    ) -> TopicResult<i64> {
        let content = input
            .content
            .ok_or(TopicError::Validation("not append content provided"))?;
        let record = TopicAppendRecord::new(content, topic_id);

        let append_id = self.database.with_transaction(|repos| {
            ensure_owner(&repos, author, topic_id, CANNOT_APPEND)?;
            Ok::<_, TopicError>(repos.topic_appends().create(&record)?)
        })?;
        tracing::info!(topic_id, append_id, user_id = author.id, "topic append stored");
        Ok(append_id)
    }

    pub fn edit_topic(
        &self,
        author: &AuthUser,
        topic_id: i64,
        input: TopicContentInput,
    ) -> TopicResult<()> {
        let content = input
            .content
            .ok_or(TopicError::Validation("not edit content provided"))?;

        self.database.with_transaction(|repos| {
            ensure_owner(&repos, author, topic_id, CANNOT_EDIT)?;
            Ok::<_, TopicError>(repos.topics().update_content(topic_id, &content)?)
        })?;
        tracing::info!(topic_id, user_id = author.id, "topic content replaced");
        Ok(())
    }
}

fn ensure_owner(
    repos: &SqliteRepositories<'_>,
    author: &AuthUser,
    topic_id: i64,
    denied: &'static str,
) -> TopicResult<TopicRecord> {
    let topic = repos
        .topics()
        .get(topic_id)?
        .ok_or(TopicError::NotFound(NO_TOPIC))?;
    if topic.user_id != author.id {
        tracing::info!(topic_id, owner_id = topic.user_id, user_id = author.id, "{denied}");
        return Err(TopicError::Forbidden(denied));
    }
    Ok(topic)
}

fn build_view(
    repos: &SqliteRepositories<'_>,
    topic: TopicRecord,
    authors: &mut HashMap<i64, UserSummary>,
) -> anyhow::Result<TopicView> {
    let user = match authors.get(&topic.user_id) {
        Some(user) => user.clone(),
        None => {
            let summary = repos
                .users()
                .get(topic.user_id)?
                .map(UserSummary::from_record)
                .ok_or_else(|| anyhow::anyhow!("topic {} has no owner row", topic.id))?;
            authors.insert(topic.user_id, summary.clone());
            summary
        }
    };
    let appends = repos
        .topic_appends()
        .list_for_topic(topic.id)?
        .into_iter()
        .map(TopicAppendView::from_record)
        .collect();
    Ok(TopicView {
        id: topic.id,
        title: topic.title,
        content: topic.content,
        node_id: topic.node_id,
        user,
        reply_num: topic.reply_num,
        create_time: topic.create_time,
        appends,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
}

impl UserSummary {
    fn from_record(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicAppendView {
    pub id: i64,
    pub content: String,
    pub create_time: String,
}

impl TopicAppendView {
    fn from_record(record: TopicAppendRecord) -> Self {
        Self {
            id: record.id,
            content: record.content,
            create_time: record.create_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub node_id: i64,
    pub user: UserSummary,
    pub reply_num: i64,
    pub create_time: String,
    pub appends: Vec<TopicAppendView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: i64,
    pub topic_id: i64,
    pub content: String,
    pub user: UserSummary,
    pub create_time: String,
}

/// Accepts a JSON integer or a numeric string. Anything else reads as absent,
/// so the service rejects it with the field's own message.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(number)) => number.as_i64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Fields are optional so a missing one can be reported by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTopicInput {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub node_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCommentInput {
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub tid: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicContentInput {
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_token;
    use crate::database::repositories::NotificationRepository;
    use rusqlite::Connection;

    struct Fixture {
        service: TopicService,
        db: Database,
        u1: AuthUser,
        u2: AuthUser,
    }

    fn fixture(per_page: usize) -> Fixture {
        let db = Database::from_connection(Connection::open_in_memory().unwrap(), true);
        db.ensure_migrations().unwrap();
        let (u1, u2) = db
            .with_repositories(|repos| {
                let u1 = repos.users().create(&UserRecord::new("u1", hash_token("t1")))?;
                let u2 = repos.users().create(&UserRecord::new("u2", hash_token("t2")))?;
                Ok((u1, u2))
            })
            .unwrap();
        Fixture {
            service: TopicService::new(db.clone(), PaginationConfig::new(per_page)),
            db,
            u1: AuthUser { id: u1, username: "u1".into() },
            u2: AuthUser { id: u2, username: "u2".into() },
        }
    }

    fn new_topic(fx: &Fixture, author: &AuthUser, title: &str, content: &str) -> i64 {
        fx.service
            .create_topic(
                author,
                CreateTopicInput {
                    title: Some(title.into()),
                    content: Some(content.into()),
                    node_id: Some(7),
                },
            )
            .expect("create topic")
    }

    fn content(text: &str) -> TopicContentInput {
        TopicContentInput {
            content: Some(text.into()),
        }
    }

    #[test]
    fn create_requires_every_field() {
        let fx = fixture(10);
        let cases = [
            (
                CreateTopicInput { title: None, content: Some("c".into()), node_id: Some(1) },
                "not title provided",
            ),
            (
                CreateTopicInput { title: Some("  ".into()), content: Some("c".into()), node_id: Some(1) },
                "not title provided",
            ),
            (
                CreateTopicInput { title: Some("t".into()), content: None, node_id: Some(1) },
                "not content provided",
            ),
            (
                CreateTopicInput { title: Some("t".into()), content: Some("c".into()), node_id: None },
                "not node_id provided",
            ),
        ];
        for (input, expected) in cases {
            match fx.service.create_topic(&fx.u1, input) {
                Err(TopicError::Validation(msg)) => assert_eq!(msg, expected),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
        assert!(matches!(
            fx.service.list_topics(1),
            Err(TopicError::NotFound(NO_TOPICS))
        ));
    }

    #[test]
    fn listing_pages_newest_first() {
        let fx = fixture(2);
        let ids: Vec<i64> = (0..5)
            .map(|i| new_topic(&fx, &fx.u1, &format!("topic {i}"), "body"))
            .collect();

        let page1 = fx.service.list_topics(1).unwrap();
        assert_eq!(page1.iter().map(|t| t.id).collect::<Vec<_>>(), vec![ids[4], ids[3]]);
        let page3 = fx.service.list_topics(3).unwrap();
        assert_eq!(page3.iter().map(|t| t.id).collect::<Vec<_>>(), vec![ids[0]]);
        assert_eq!(page3[0].user.username, "u1");

        assert!(matches!(
            fx.service.list_topics(4),
            Err(TopicError::NotFound(NO_TOPICS))
        ));
        // page 0 behaves like page 1
        assert_eq!(fx.service.list_topics(0).unwrap().len(), 2);
        assert!(fx.service.list_topics(usize::MAX).is_err());
    }

    #[test]
    fn get_reports_missing_topic() {
        let fx = fixture(10);
        let id = new_topic(&fx, &fx.u1, "hello", "world");
        let view = fx.service.get_topic(id).unwrap();
        assert_eq!(view.title, "hello");
        assert_eq!(view.node_id, 7);
        assert_eq!(view.reply_num, 0);
        assert!(view.appends.is_empty());

        assert!(matches!(
            fx.service.get_topic(id + 1),
            Err(TopicError::NotFound(NO_TOPIC))
        ));
    }

    #[test]
    fn comment_increments_reply_num_once() {
        let fx = fixture(10);
        let id = new_topic(&fx, &fx.u1, "hello", "world");

        let comment = fx
            .service
            .add_comment(
                &fx.u2,
                id,
                CreateCommentInput { content: Some("first!".into()), tid: Some(id) },
            )
            .unwrap();
        assert_eq!(comment.topic_id, id);
        assert_eq!(comment.user.id, fx.u2.id);

        let view = fx.service.get_topic(id).unwrap();
        assert_eq!(view.reply_num, 1);
        let comments = fx
            .db
            .with_repositories(|repos| repos.comments().list_for_topic(id))
            .unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].content, "first!");

        let owner_inbox = fx
            .db
            .with_repositories(|repos| repos.notifications().list_for_recipient(fx.u1.id))
            .unwrap();
        assert_eq!(owner_inbox.len(), 1);
    }

    #[test]
    fn comment_validation_and_missing_topic_write_nothing() {
        let fx = fixture(10);
        let id = new_topic(&fx, &fx.u1, "hello", "world");

        assert!(matches!(
            fx.service.add_comment(&fx.u2, id, CreateCommentInput { content: None, tid: Some(id) }),
            Err(TopicError::Validation("not comment content provided"))
        ));
        assert!(matches!(
            fx.service.add_comment(&fx.u2, id, CreateCommentInput { content: Some("x".into()), tid: None }),
            Err(TopicError::Validation("not topic id provided"))
        ));
        assert!(matches!(
            fx.service.add_comment(
                &fx.u2,
                id + 1,
                CreateCommentInput { content: Some("x".into()), tid: Some(id + 1) }
            ),
            Err(TopicError::NotFound(NO_TOPIC))
        ));

        let count = fx
            .db
            .with_repositories(|repos| repos.comments().count_for_topic(id))
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(fx.service.get_topic(id).unwrap().reply_num, 0);
    }

    #[test]
    fn only_owner_can_append() {
        let fx = fixture(10);
        let id = new_topic(&fx, &fx.u1, "hello", "world");

        assert!(matches!(
            fx.service.append_topic(&fx.u2, id, content("intrusion")),
            Err(TopicError::Forbidden(CANNOT_APPEND))
        ));
        assert!(fx.service.get_topic(id).unwrap().appends.is_empty());

        fx.service.append_topic(&fx.u1, id, content("update")).unwrap();
        let appends = fx.service.get_topic(id).unwrap().appends;
        assert_eq!(appends.len(), 1);
        assert_eq!(appends[0].content, "update");

        assert!(matches!(
            fx.service.append_topic(&fx.u1, id + 1, content("x")),
            Err(TopicError::NotFound(NO_TOPIC))
        ));
        assert!(matches!(
            fx.service.append_topic(&fx.u1, id, TopicContentInput::default()),
            Err(TopicError::Validation("not append content provided"))
        ));
    }

    #[test]
    fn only_owner_can_edit() {
        let fx = fixture(10);
        let id = new_topic(&fx, &fx.u1, "hello", "a");

        assert!(matches!(
            fx.service.edit_topic(&fx.u2, id, content("b")),
            Err(TopicError::Forbidden(CANNOT_EDIT))
        ));
        assert_eq!(fx.service.get_topic(id).unwrap().content, "a");

        fx.service.edit_topic(&fx.u1, id, content("b")).unwrap();
        assert_eq!(fx.service.get_topic(id).unwrap().content, "b");

        assert!(matches!(
            fx.service.edit_topic(&fx.u1, id + 1, content("x")),
            Err(TopicError::NotFound(NO_TOPIC))
        ));
        assert!(matches!(
            fx.service.edit_topic(&fx.u1, id, TopicContentInput::default()),
            Err(TopicError::Validation("not edit content provided"))
        ));
        assert_eq!(fx.service.get_topic(id).unwrap().content, "b");
    }

    #[test]
    fn numeric_fields_accept_digit_strings_only() {
        let parse = |body: Value| -> CreateTopicInput {
            serde_json::from_value(body).expect("topic input")
        };
        assert_eq!(parse(serde_json::json!({"node_id": 3})).node_id, Some(3));
        assert_eq!(parse(serde_json::json!({"node_id": " 3 "})).node_id, Some(3));
        assert_eq!(parse(serde_json::json!({"node_id": "abc"})).node_id, None);
        assert_eq!(parse(serde_json::json!({"node_id": 1.5})).node_id, None);
        assert_eq!(parse(serde_json::json!({"node_id": [1]})).node_id, None);
        assert_eq!(parse(serde_json::json!({})).node_id, None);

        let comment: CreateCommentInput =
            serde_json::from_value(serde_json::json!({"content": "hi", "tid": "12"}))
                .expect("comment input");
        assert_eq!(comment.tid, Some(12));

        let fx = fixture(10);
        let input = parse(serde_json::json!({"title": "t", "content": "c", "node_id": "abc"}));
        assert!(matches!(
            fx.service.create_topic(&fx.u1, input),
            Err(TopicError::Validation("not node_id provided"))
        ));
    }
}
