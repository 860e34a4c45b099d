//! Domain model and collaborator contracts for the RagDesk client core.

pub mod backend;
pub mod config;
pub mod conversation;
pub mod error;
pub mod storage;
pub mod upload;

// Re-export common error type
pub use error::{RagDeskError, Result};
