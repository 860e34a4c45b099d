pub mod config_service;
pub mod conversation_store;
pub mod migration;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::conversation_store::{CONVERSATIONS_KEY, ConversationStore, LEGACY_HISTORY_KEY};
pub use crate::paths::RagDeskPaths;
pub use crate::storage::{FileKeyValueStore, MemoryKeyValueStore};
