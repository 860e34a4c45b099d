//! Single-conversation history to conversation list migration.

use chrono::{DateTime, Utc};
use ragdesk_core::conversation::Conversation;
use ragdesk_core::conversation::Message;
use ragdesk_core::error::{RagDeskError, Result};
use serde::{Deserialize, Serialize};

/// The legacy record: one untitled conversation stored as a bare message array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyChatHistory(pub Vec<Message>);

impl LegacyChatHistory {
    /// Parses the stored JSON value.
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| {
            RagDeskError::migration(format!("Legacy chat history is not a message array: {}", e))
        })
    }

    /// Converts into the current format.
    ///
    /// A present record always becomes exactly one conversation, even when it
    /// holds no messages; the title then falls back to the generated one.
    pub fn into_conversations(self, now: DateTime<Utc>) -> Vec<Conversation> {
        // Transient state never survives a reload
        let messages: Vec<Message> = self
            .0
            .into_iter()
            .filter(|m| !m.is_placeholder())
            .map(|mut m| {
                m.upload_status = None;
                m
            })
            .collect();
        let title = Conversation::derive_title(&messages);
        vec![Conversation::create(title, messages, now, &[])]
    }
}

/// Parses and converts a raw legacy record in one step.
pub fn migrate_legacy_history(raw: &str, now: DateTime<Utc>) -> Result<Vec<Conversation>> {
    let history = LegacyChatHistory::parse(raw)?;
    let conversations = history.into_conversations(now);
    tracing::info!(
        "Migrated legacy chat history into {} conversation(s)",
        conversations.len()
    );
    Ok(conversations)
}
