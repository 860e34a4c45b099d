//! Transport-facing components: the HTTP backend, answer streaming and task
//! polling.

pub mod http_backend;
pub mod poller;
pub mod retry;
pub mod stream;

pub use http_backend::HttpBackend;
pub use poller::TaskPoller;
pub use retry::BackoffPolicy;
pub use stream::{SnapshotStream, StreamConsumer, Utf8Decoder};
