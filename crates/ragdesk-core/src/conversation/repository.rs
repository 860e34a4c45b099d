//! Conversation repository trait.
//!
//! Defines the interface for conversation persistence operations.

use super::model::Conversation;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for the ordered conversation collection.
///
/// The collection is stored as one record, so [`save`](Self::save) is a full
/// replace with last-write-wins semantics. Callers must serialize their
/// writes per session; two racing saves of overlapping snapshots silently
/// drop one of the updates.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Loads every conversation, most recent first.
    ///
    /// Implementations migrate older storage formats on first use.
    async fn load(&self) -> Result<Vec<Conversation>>;

    /// Atomically replaces the whole stored collection.
    ///
    /// On failure the previously stored collection is left untouched.
    async fn save(&self, conversations: &[Conversation]) -> Result<()>;

    /// Inserts the conversation or replaces the record with the same id.
    async fn upsert(&self, conversation: &Conversation) -> Result<()>;

    /// Finds a conversation by its id.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Conversation))`: found
    /// - `Ok(None)`: no record with this id
    /// - `Err(_)`: storage failure
    async fn get(&self, id: &str) -> Result<Option<Conversation>>;

    /// Deletes a conversation; deleting a missing id is not an error.
    ///
    /// Returns whether a record was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Case-insensitive title prefix search, most recent first.
    async fn search_by_title_prefix(&self, query: &str) -> Result<Vec<Conversation>>;
}
