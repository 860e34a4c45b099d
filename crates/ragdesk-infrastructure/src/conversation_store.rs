//! KeyValueStore-backed ConversationRepository implementation

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ragdesk_core::conversation::{
    Conversation, ConversationRepository, filter_by_title_prefix, sort_newest_first,
};
use ragdesk_core::error::{RagDeskError, Result};
use ragdesk_core::storage::KeyValueStore;
use tokio::sync::Mutex;

use crate::migration::migrate_legacy_history;

/// Key holding the JSON array of conversations.
pub const CONVERSATIONS_KEY: &str = "ragdesk.conversations";

/// Key of the pre-conversation-list format, a JSON array of messages.
pub const LEGACY_HISTORY_KEY: &str = "ragdesk.chat_history";

/// Persists the ordered conversation list as one record.
///
/// - Reads migrate the legacy single-conversation record on first use
/// - Writes replace the whole record; the backing store keeps the previous
///   value readable when a write fails
/// - Read-modify-write operations run behind an internal write gate
pub struct ConversationStore {
    kv: Arc<dyn KeyValueStore>,
    write_gate: Mutex<()>,
}

impl ConversationStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_gate: Mutex::new(()),
        }
    }

    /// Loads the list; the caller must hold the write gate.
    async fn load_locked(&self) -> Result<Vec<Conversation>> {
        let raw = self.kv.get(CONVERSATIONS_KEY).await.inspect_err(|e| {
            tracing::error!("Failed to read conversations: {}", e);
        })?;

        match raw {
            Some(raw) => {
                let mut conversations: Vec<Conversation> =
                    serde_json::from_str(&raw).map_err(|e| {
                        tracing::error!("Stored conversations are corrupt: {}", e);
                        RagDeskError::storage(format!("Stored conversations are corrupt: {}", e))
                    })?;
                sort_newest_first(&mut conversations);
                Ok(conversations)
            }
            None => self.migrate_legacy_locked().await,
        }
    }

    /// Converts the legacy record if present.
    ///
    /// The legacy key is removed only after the converted list is stored, so
    /// an interrupted migration is simply repeated on the next load.
    async fn migrate_legacy_locked(&self) -> Result<Vec<Conversation>> {
        let Some(raw) = self.kv.get(LEGACY_HISTORY_KEY).await.inspect_err(|e| {
            tracing::error!("Failed to read legacy chat history: {}", e);
        })?
        else {
            return Ok(Vec::new());
        };

        let mut conversations = migrate_legacy_history(&raw, Utc::now()).inspect_err(|e| {
            tracing::error!("Legacy chat history left in place: {}", e);
        })?;
        sort_newest_first(&mut conversations);
        self.write_locked(&conversations).await?;

        // The current key now exists, so a leftover legacy record is never read again
        if let Err(e) = self.kv.remove(LEGACY_HISTORY_KEY).await {
            tracing::warn!("Failed to remove legacy chat history: {}", e);
        }
        Ok(conversations)
    }

    /// Serializes and stores the list; the caller must hold the write gate.
    async fn write_locked(&self, conversations: &[Conversation]) -> Result<()> {
        let raw = serde_json::to_string(conversations)?;
        self.kv
            .set(CONVERSATIONS_KEY, &raw)
            .await
            .inspect_err(|e| {
                tracing::error!("Failed to save {} conversation(s): {}", conversations.len(), e);
            })?;
        tracing::debug!("Saved {} conversation(s)", conversations.len());
        Ok(())
    }
}

fn ensure_unique_ids(conversations: &[Conversation]) -> Result<()> {
    let mut seen = HashSet::new();
    for conversation in conversations {
        if !seen.insert(conversation.id.as_str()) {
            return Err(RagDeskError::invalid_input(format!(
                "Duplicate conversation id '{}'",
                conversation.id
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl ConversationRepository for ConversationStore {
    async fn load(&self) -> Result<Vec<Conversation>> {
        let _gate = self.write_gate.lock().await;
        self.load_locked().await
    }

    async fn save(&self, conversations: &[Conversation]) -> Result<()> {
        ensure_unique_ids(conversations)?;
        let mut ordered = conversations.to_vec();
        sort_newest_first(&mut ordered);

        let _gate = self.write_gate.lock().await;
        self.write_locked(&ordered).await
    }

    async fn upsert(&self, conversation: &Conversation) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let mut conversations = self.load_locked().await?;

        match conversations.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => *existing = conversation.clone(),
            None => conversations.push(conversation.clone()),
        }
        sort_newest_first(&mut conversations);
        self.write_locked(&conversations).await
    }

    async fn get(&self, id: &str) -> Result<Option<Conversation>> {
        let conversations = self.load().await?;
        Ok(conversations.into_iter().find(|c| c.id == id))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let _gate = self.write_gate.lock().await;
        let mut conversations = self.load_locked().await?;

        let before = conversations.len();
        conversations.retain(|c| c.id != id);
        if conversations.len() == before {
            return Ok(false);
        }
        self.write_locked(&conversations).await?;
        Ok(true)
    }

    async fn search_by_title_prefix(&self, query: &str) -> Result<Vec<Conversation>> {
        let conversations = self.load().await?;
        Ok(filter_by_title_prefix(conversations, query))
    }
}
