//! Conversation domain module.
//!
//! # Module Structure
//!
//! - `model`: the persisted `Conversation` record, id minting and ordering
//! - `message`: chat turn types (`Message`, `MessagePart`, `MessageRole`, `MessageIcon`)
//! - `repository`: persistence contract consumed by the session layer

mod message;
mod model;
mod repository;

pub use message::{Message, MessageIcon, MessagePart, MessageRole};
pub use model::{
    Conversation, DERIVED_TITLE_MAX_CHARS, FALLBACK_TITLE, filter_by_title_prefix, mint_id,
    sort_newest_first,
};
pub use repository::ConversationRepository;
