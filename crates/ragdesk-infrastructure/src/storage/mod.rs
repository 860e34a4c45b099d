//! Storage layer: atomic file operations and key/value backends.

mod atomic_file;
mod file_store;
mod memory_store;

pub use atomic_file::{AtomicFile, AtomicFileError};
pub use file_store::FileKeyValueStore;
pub use memory_store::MemoryKeyValueStore;
