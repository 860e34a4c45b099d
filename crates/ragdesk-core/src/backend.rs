//! Backend collaborator contract.
//!
//! The question-answering service is reached only through the request and
//! response shapes defined here. Retrieval, generation and file parsing are
//! opaque to the client core.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::conversation::MessageRole;
use crate::error::Result;
use crate::upload::UploadStatusInfo;

/// Default sampling temperature sent with every chat request.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Incrementally delivered response body.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Text-only part of a chat request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTextPart {
    pub text: String,
}

/// One prior turn sent as chat context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatContent {
    pub role: MessageRole,
    pub parts: Vec<ChatTextPart>,
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub contents: Vec<ChatContent>,
    pub temperature: f32,
}

impl ChatRequest {
    /// Builds a request, clamping the temperature to the accepted range.
    pub fn new(contents: Vec<ChatContent>, temperature: f32) -> Self {
        Self {
            contents,
            temperature: temperature.clamp(0.0, 2.0),
        }
    }
}

/// How the transport hands over the chat response body.
pub enum ReplyBody {
    /// Chunked body, read chunk by chunk.
    Stream(ByteStream),
    /// Fully buffered body (non-streaming responses and error bodies).
    Buffered(Bytes),
    /// The transport cannot expose the body incrementally.
    Unsupported,
}

/// Response of `POST /chat` before decoding.
pub struct ChatReply {
    pub status: u16,
    pub body: ReplyBody,
}

impl ChatReply {
    pub fn streaming(status: u16, body: ByteStream) -> Self {
        Self {
            status,
            body: ReplyBody::Stream(body),
        }
    }

    pub fn buffered(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: ReplyBody::Buffered(body.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Response of `POST /upload`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Result of one status query.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusQuery {
    Found(UploadStatusInfo),
    /// The backend answered 404 for this task id.
    NotFound,
}

/// Response of `GET /documents`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentList {
    #[serde(default)]
    pub count: Option<usize>,
    pub documents: Vec<String>,
}

/// The HTTP surface consumed by the client core.
///
/// Implementations map transport failures to `RagDeskError::Network` and
/// non-success statuses to `RagDeskError::Http`, except for
/// [`open_chat`](Self::open_chat) which returns the raw status so the stream
/// consumer can classify it.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// `POST /chat`.
    async fn open_chat(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// `POST /upload` with multipart field `file`.
    async fn upload(&self, file: UploadFile) -> Result<UploadReceipt>;

    /// `GET /upload/status/{task_id}`; a 404 maps to [`StatusQuery::NotFound`].
    async fn upload_status(&self, task_id: &str) -> Result<StatusQuery>;

    /// `GET /upload/tasks`.
    async fn list_upload_tasks(&self) -> Result<HashMap<String, UploadStatusInfo>>;

    /// `GET /documents`.
    async fn list_documents(&self) -> Result<Vec<String>>;

    /// `DELETE /documents?filename=...`.
    async fn delete_document(&self, filename: &str) -> Result<()>;

    /// `POST /documents/ingest`, returning the backend's summary message.
    async fn trigger_ingest(&self) -> Result<String>;
}
