//! Incremental decoding of streamed chat answers.
//!
//! A chat reply is turned into a sequence of cumulative snapshots: every item
//! is the full answer received so far, never a delta.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use ragdesk_core::backend::{ByteStream, ChatBackend, ChatReply, ChatRequest, ReplyBody};
use ragdesk_core::error::{RagDeskError, Result};
use serde::Deserialize;

/// Cumulative answer snapshots.
pub type SnapshotStream = BoxStream<'static, Result<String>>;

// ============================================================================
// UTF-8 decoding
// ============================================================================

/// Stateful UTF-8 decoder for chunked bodies.
///
/// A multi-byte sequence split across chunks is held back until it is
/// complete. Invalid bytes become U+FFFD, as does a truncated sequence left
/// over when the body ends.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes as much of `pending + chunk` as is complete.
    pub fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(invalid) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + invalid);
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flushes whatever is still buffered at end of stream.
    pub fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

// ============================================================================
// Reply classification
// ============================================================================

#[derive(Deserialize)]
struct TextBody {
    text: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Turns a chat reply into a snapshot stream.
///
/// - Non-success status: `Http { status, message }` with the body's `detail`
///   when it has one
/// - Buffered success body: exactly one snapshot, the JSON `text` field or the
///   raw body
/// - Streamed success body: one snapshot per chunk that adds text
/// - No body access: `UnsupportedTransport`
pub async fn snapshots(reply: ChatReply) -> Result<SnapshotStream> {
    if !reply.is_success() {
        let message = error_message(reply.status, reply.body).await;
        tracing::warn!("Chat request failed with status {}: {}", reply.status, message);
        return Err(RagDeskError::http(reply.status, message));
    }

    match reply.body {
        ReplyBody::Stream(body) => Ok(chunk_snapshots(body)),
        ReplyBody::Buffered(bytes) => {
            let text = buffered_text(&bytes);
            Ok(stream::once(async move { Ok(text) }).boxed())
        }
        ReplyBody::Unsupported => Err(RagDeskError::UnsupportedTransport),
    }
}

/// Drives a snapshot stream to completion, returning the final text.
///
/// `on_snapshot` sees every snapshot in order and is awaited before the next
/// chunk is read. An empty answer yields an empty string.
pub async fn consume<F, Fut>(mut snapshots: SnapshotStream, mut on_snapshot: F) -> Result<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut last = String::new();
    while let Some(snapshot) = snapshots.next().await {
        let snapshot = snapshot?;
        on_snapshot(snapshot.clone()).await;
        last = snapshot;
    }
    Ok(last)
}

struct ChunkState {
    body: ByteStream,
    decoder: Utf8Decoder,
    text: String,
    done: bool,
}

fn chunk_snapshots(body: ByteStream) -> SnapshotStream {
    let state = ChunkState {
        body,
        decoder: Utf8Decoder::new(),
        text: String::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let piece = state.decoder.push(&chunk);
                    tracing::debug!(bytes = chunk.len(), chars = piece.chars().count(), "chat chunk");
                    if piece.is_empty() {
                        continue;
                    }
                    state.text.push_str(&piece);
                    let snapshot = state.text.clone();
                    return Some((Ok(snapshot), state));
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.done = true;
                    let tail = state.decoder.finish();
                    if tail.is_empty() {
                        return None;
                    }
                    state.text.push_str(&tail);
                    let snapshot = state.text.clone();
                    return Some((Ok(snapshot), state));
                }
            }
        }
    })
    .boxed()
}

fn buffered_text(bytes: &Bytes) -> String {
    match serde_json::from_slice::<TextBody>(bytes) {
        Ok(body) => body.text,
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

async fn error_message(status: u16, body: ReplyBody) -> String {
    let bytes = match body {
        ReplyBody::Buffered(bytes) => bytes.to_vec(),
        ReplyBody::Stream(mut chunks) => {
            let mut collected = Vec::new();
            while let Some(Ok(chunk)) = chunks.next().await {
                collected.extend_from_slice(&chunk);
            }
            collected
        }
        ReplyBody::Unsupported => Vec::new(),
    };

    let detail = serde_json::from_slice::<ErrorBody>(&bytes)
        .ok()
        .map(|body| match body.detail {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        });
    let raw = String::from_utf8_lossy(&bytes).trim().to_string();

    match detail {
        Some(detail) => detail,
        None if !raw.is_empty() => raw,
        None => format!("request failed with status {}", status),
    }
}

// ============================================================================
// Consumer
// ============================================================================

/// Opens chat requests against a backend and exposes their answers.
///
/// Each call is an independent read; there is no resume and no internal retry.
#[derive(Clone)]
pub struct StreamConsumer {
    backend: Arc<dyn ChatBackend>,
}

impl StreamConsumer {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Sends the request and returns the lazy snapshot sequence.
    pub async fn open(&self, request: &ChatRequest) -> Result<SnapshotStream> {
        tracing::info!(
            turns = request.contents.len(),
            temperature = request.temperature,
            "Opening chat stream"
        );
        let reply = self.backend.open_chat(request).await?;
        snapshots(reply).await
    }
}
