//! Conversation domain model.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::message::{Message, MessageRole};

/// Title used when no user text is available to derive one from.
pub const FALLBACK_TITLE: &str = "Imported conversation";

/// Maximum number of characters kept when deriving a title from user text.
pub const DERIVED_TITLE_MAX_CHARS: usize = 50;

/// A titled, ordered, persisted sequence of chat turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique identifier derived from the creation timestamp.
    pub id: String,
    /// Sidebar title.
    pub title: String,
    /// Chat turns in display order.
    pub messages: Vec<Message>,
    /// Creation time (RFC 3339), the sole sort key.
    pub created_at: String,
}

impl Conversation {
    /// Creates a conversation stamped with `now`.
    ///
    /// The id is the millisecond timestamp, bumped past any id in `taken`.
    pub fn create(
        title: impl Into<String>,
        messages: Vec<Message>,
        now: DateTime<Utc>,
        taken: &[Conversation],
    ) -> Self {
        Self {
            id: mint_id(now, taken),
            title: title.into(),
            messages,
            created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Parsed creation time; `None` when the stored string is malformed.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Title taken from the first user message's first text part.
    pub fn derive_title(messages: &[Message]) -> String {
        messages
            .iter()
            .find(|m| m.role == MessageRole::User)
            .and_then(|m| m.first_text())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| text.chars().take(DERIVED_TITLE_MAX_CHARS).collect())
            .unwrap_or_else(|| FALLBACK_TITLE.to_string())
    }
}

/// Mints a timestamp-derived id that does not collide with `taken`.
pub fn mint_id(now: DateTime<Utc>, taken: &[Conversation]) -> String {
    let mut candidate = now.timestamp_millis();
    while taken.iter().any(|c| c.id == candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}

/// Orders conversations most recent first.
///
/// Records whose timestamp does not parse sort after every valid one and
/// fall back to a string comparison among themselves.
pub fn sort_newest_first(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| match (a.created_at_utc(), b.created_at_utc()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => b.created_at.cmp(&a.created_at),
    });
}

/// Keeps conversations whose title starts with `query`, ignoring case and
/// surrounding whitespace. An empty query keeps everything.
pub fn filter_by_title_prefix(conversations: Vec<Conversation>, query: &str) -> Vec<Conversation> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return conversations;
    }
    conversations
        .into_iter()
        .filter(|c| c.title.to_lowercase().starts_with(&needle))
        .collect()
}
