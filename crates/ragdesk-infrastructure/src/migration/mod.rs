//! Storage format migrations.
//!
//! # Formats
//!
//! ```text
//! ragdesk.chat_history   (legacy)   [Message, ...]          one implicit conversation
//!          │
//!          V
//! ragdesk.conversations  (current)  [Conversation, ...]    titled, timestamped records
//! ```
//!
//! The legacy record is read at most once: the migrated list is written under
//! the current key before the legacy key is deleted, and the current key is
//! authoritative as soon as it exists.

mod legacy;

pub use legacy::{LegacyChatHistory, migrate_legacy_history};
