use crate::database::models::{NotificationKind, NotificationRecord};
use crate::database::repositories::{NotificationRepository, TopicRepository, UserRepository};
use crate::database::Database;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const MENTION_PATTERN: &str = r"@([A-Za-z0-9_]+)";

/// Compiled once per process.
fn mention_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(MENTION_PATTERN))
        .as_ref()
        .map_err(|err| anyhow!("invalid mention pattern: {err}"))
}

/// Usernames mentioned as `@name`, first occurrence order, without duplicates.
pub fn extract_mentions(content: &str) -> Result<Vec<String>> {
    let pattern = mention_pattern()?;
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for capture in pattern.captures_iter(content) {
        let name = capture[1].to_string();
        if seen.insert(name.clone()) {
            names.push(name);
        }
    }
    Ok(names)
}

/// Stores the notifications produced by a new comment and returns how many
/// were written.
///
/// Every mentioned user other than the author gets a `mention`. The topic
/// owner gets a `reply` unless they wrote the comment or were already
/// mentioned in it. Unknown usernames are skipped.
pub fn dispatch_comment_notifications(
    database: &Database,
    content: &str,
    author_id: i64,
    topic_id: i64,
    comment_id: i64,
) -> Result<usize> {
    let mentions = extract_mentions(content)?;

    database.with_transaction(|repos| {
        let topic = repos
            .topics()
            .get(topic_id)?
            .with_context(|| format!("topic {topic_id} vanished before notifying"))?;

        let users = repos.users();
        let notifications = repos.notifications();
        let mut notified = HashSet::new();

        for name in &mentions {
            let Some(user) = users.find_by_username(name)? else {
                tracing::debug!(username = %name, "mention of unknown user ignored");
                continue;
            };
            if user.id == author_id || !notified.insert(user.id) {
                continue;
            }
            notifications.create(&NotificationRecord::new(
                user.id,
                author_id,
                topic_id,
                comment_id,
                NotificationKind::Mention,
            ))?;
        }

        if topic.user_id != author_id && notified.insert(topic.user_id) {
            notifications.create(&NotificationRecord::new(
                topic.user_id,
                author_id,
                topic_id,
                comment_id,
                NotificationKind::Reply,
            ))?;
        }

        tracing::debug!(
            topic_id,
            comment_id,
            count = notified.len(),
            "comment notifications stored"
        );
        Ok(notified.len())
    })
}
