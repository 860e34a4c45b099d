use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use ragdesk_core::backend::{ChatBackend, ChatRequest, UploadFile};
use ragdesk_core::config::ClientConfig;
use ragdesk_core::conversation::{
    Conversation, ConversationRepository, Message, MessageIcon, filter_by_title_prefix,
};
use ragdesk_core::error::{RagDeskError, Result};
use ragdesk_core::upload::{UploadStatus, UploadStatusInfo, is_supported_upload};
use ragdesk_interaction::stream;
use ragdesk_interaction::{BackoffPolicy, StreamConsumer, TaskPoller};
use tokio::sync::{Mutex, mpsc};

use super::events::{AcknowledgementKind, SessionEvent};
use super::state::{FlowToken, SessionPhase, SessionSnapshot, SessionState};
use crate::payload;

/// Text of the warning that replaces an empty answer.
pub const EMPTY_ANSWER_NOTICE: &str = "The server returned an empty answer.";

/// Owns the session state and runs every user-initiated flow.
///
/// `SessionController` is responsible for:
/// - Keeping the active conversation buffer and the upload feed
/// - Persisting the conversation list at every completed step
/// - Discarding results of flows that started in an older context
/// - Publishing [`SessionEvent`]s for the view layer
///
/// The state mutex is never held across a network or storage call. Saves
/// run behind a separate persist gate and take their snapshot inside it, so
/// the last save to complete always carries the newest state.
pub struct SessionController {
    backend: Arc<dyn ChatBackend>,
    repository: Arc<dyn ConversationRepository>,
    consumer: StreamConsumer,
    poller: TaskPoller,
    temperature: f32,
    state: Mutex<SessionState>,
    persist_gate: Mutex<()>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionController {
    /// Creates a controller and the receiving end of its event channel.
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        repository: Arc<dyn ConversationRepository>,
        config: &ClientConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            consumer: StreamConsumer::new(backend.clone()),
            poller: TaskPoller::new(backend.clone(), BackoffPolicy::from_config(&config.poll)),
            backend,
            repository,
            temperature: config.temperature,
            state: Mutex::new(SessionState::default()),
            persist_gate: Mutex::new(()),
            events,
        };
        (controller, receiver)
    }

    // ============================================================================
    // Lifecycle and queries
    // ============================================================================

    /// Loads stored conversations and the document list.
    ///
    /// Failures are logged; the session then starts empty.
    pub async fn init(&self) {
        match self.repository.load().await {
            Ok(conversations) => {
                tracing::info!("Loaded {} conversation(s)", conversations.len());
                let mut state = self.state.lock().await;
                state.conversations = conversations;
                self.emit_conversations(&state);
            }
            Err(e) => tracing::warn!("Starting with no conversations: {}", e),
        }

        if let Err(e) = self.refresh_documents().await {
            tracing::warn!("Failed to load document list: {}", e);
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn conversations(&self) -> Vec<Conversation> {
        self.state.lock().await.conversations.clone()
    }

    /// Case-insensitive title prefix search over the in-memory list.
    pub async fn search(&self, query: &str) -> Vec<Conversation> {
        let conversations = self.conversations().await;
        filter_by_title_prefix(conversations, query)
    }

    /// Tracks the input box; toggles between `Idle` and `Composing`.
    pub async fn update_draft(&self, text: &str) {
        let mut state = self.state.lock().await;
        state.draft = text.to_string();
        let next = match state.phase {
            SessionPhase::Idle if !text.trim().is_empty() => SessionPhase::Composing,
            SessionPhase::Composing if text.trim().is_empty() => SessionPhase::Idle,
            other => other,
        };
        if next != state.phase {
            state.phase = next;
            self.emit(SessionEvent::PhaseChanged(next));
        }
    }

    /// Clears the view without persisting anything.
    pub async fn new_conversation(&self) {
        let mut state = self.state.lock().await;
        state.reset_view(None, Vec::new());
        tracing::debug!("Started new conversation (generation {})", state.generation);
        self.emit_messages(&state);
        self.emit_side_channel(&state);
    }

    /// Makes a stored conversation the active one.
    pub async fn open_conversation(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let messages = state
            .conversations
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.messages.clone())
            .ok_or_else(|| RagDeskError::not_found("Conversation", id))?;
        state.reset_view(Some(id.to_string()), messages);
        self.emit_messages(&state);
        self.emit_side_channel(&state);
        Ok(())
    }

    /// Reloads the backend document list.
    pub async fn refresh_documents(&self) -> Result<Vec<String>> {
        let documents = self.backend.list_documents().await?;
        let mut state = self.state.lock().await;
        state.documents = documents.clone();
        self.emit(SessionEvent::DocumentsChanged(documents.clone()));
        Ok(documents)
    }

    pub async fn upload_tasks(&self) -> Result<HashMap<String, UploadStatusInfo>> {
        self.backend.list_upload_tasks().await
    }

    /// Asks the backend to re-ingest every stored document.
    pub async fn ingest_documents(&self) -> Result<String> {
        match self.backend.trigger_ingest().await {
            Ok(message) => {
                if let Err(e) = self.refresh_documents().await {
                    tracing::warn!("Failed to refresh documents after ingest: {}", e);
                }
                self.acknowledge(AcknowledgementKind::Success, message.clone());
                Ok(message)
            }
            Err(e) => {
                self.acknowledge(AcknowledgementKind::Error, format!("Ingest failed: {}", e));
                Err(e)
            }
        }
    }

    // ============================================================================
    // Send
    // ============================================================================

    /// Sends a question and streams the answer into the active conversation.
    ///
    /// Backend failures end up as an error message in the conversation; only
    /// rejected input and an overlapping send are returned as errors.
    pub async fn send(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(RagDeskError::invalid_input("Message is empty"));
        }

        let (token, request) = {
            let mut state = self.state.lock().await;
            if state.send_in_flight == Some(state.generation) {
                return Err(RagDeskError::Busy(
                    "An answer is still being generated".to_string(),
                ));
            }
            state.send_in_flight = Some(state.generation);
            state.messages.push(Message::user(text));

            if state.active_id.is_none() {
                let conversation =
                    Conversation::create(text, Vec::new(), Utc::now(), &state.conversations);
                tracing::info!("Created conversation {}", conversation.id);
                state.active_id = Some(conversation.id.clone());
                state.conversations.insert(0, conversation);
            }
            state.sync_active_conversation();
            state.draft.clear();
            state.begin_flow(SessionPhase::Sending);

            let request = payload::build_request(&state.messages, self.temperature);
            self.emit(SessionEvent::PhaseChanged(state.phase));
            self.emit_messages(&state);
            self.emit_conversations(&state);
            (state.token(), request)
        };

        self.persist().await;

        let placeholder_index = {
            let mut state = self.state.lock().await;
            if state.is_current(&token) {
                state.messages.push(Message::placeholder());
                self.emit_messages(&state);
                Some(state.messages.len() - 1)
            } else {
                None
            }
        };

        let outcome = self.stream_answer(&request, &token, placeholder_index).await;

        let completed = {
            let mut state = self.state.lock().await;
            let current = state.is_current(&token);
            if current {
                let final_message = match &outcome {
                    Ok(answer) if answer.trim().is_empty() => {
                        Message::notice(EMPTY_ANSWER_NOTICE, MessageIcon::Warning)
                    }
                    Ok(answer) => Message::model(answer.clone()),
                    Err(e) => Message::error(format!("Failed to get an answer: {}", e)),
                };
                match placeholder_index {
                    Some(index) if index < state.messages.len() => {
                        state.messages[index] = final_message;
                    }
                    _ => state.messages.push(final_message),
                }
                state.sync_active_conversation();
                self.emit_messages(&state);
                self.emit_conversations(&state);
            } else {
                tracing::debug!(
                    "Discarding answer for stale conversation {:?}",
                    token.conversation_id
                );
            }
            if state.send_in_flight == Some(token.generation) {
                state.send_in_flight = None;
            }
            self.finish_flow(&mut state);
            current
        };

        if let Err(e) = &outcome {
            tracing::warn!("Send failed: {}", e);
        }
        if completed {
            self.persist().await;
        }
        Ok(())
    }

    async fn stream_answer(
        &self,
        request: &ChatRequest,
        token: &FlowToken,
        placeholder_index: Option<usize>,
    ) -> Result<String> {
        let snapshots = self.consumer.open(request).await?;
        self.set_phase_if_current(token, SessionPhase::StreamingResponse)
            .await;

        let this = self;
        stream::consume(snapshots, move |snapshot| async move {
            this.show_snapshot(token, placeholder_index, snapshot).await
        })
        .await
    }

    /// Replaces the placeholder text with the latest snapshot.
    async fn show_snapshot(&self, token: &FlowToken, placeholder_index: Option<usize>, snapshot: String) {
        let mut state = self.state.lock().await;
        if let Some(index) = placeholder_index
            && state.is_current(token)
            && index < state.messages.len()
        {
            state.messages[index].set_text(snapshot);
            self.emit_messages(&state);
        }
    }

    // ============================================================================
    // Upload
    // ============================================================================

    /// Uploads a document and follows its ingestion task to completion.
    ///
    /// Progress goes to the side-channel feed, never to the conversation.
    pub async fn upload(&self, file: UploadFile) -> Result<()> {
        if !is_supported_upload(&file.file_name) {
            return Err(RagDeskError::invalid_input(format!(
                "Unsupported file type: '{}' (expected .pdf, .md or .zip)",
                file.file_name
            )));
        }
        let file_name = file.file_name.clone();

        let token = {
            let mut state = self.state.lock().await;
            state
                .side_channel
                .push(Message::user(format!("Uploading {}", file_name)));
            state.begin_flow(SessionPhase::Uploading);
            self.emit(SessionEvent::PhaseChanged(state.phase));
            self.emit_side_channel(&state);
            state.token()
        };

        match self.backend.upload(file).await {
            Ok(receipt) => match receipt.task_id {
                None => {
                    let text = receipt
                        .message
                        .unwrap_or_else(|| format!("Uploaded {}", file_name));
                    self.feed(&token, Message::notice(text, MessageIcon::Success))
                        .await;
                    self.refresh_documents_logged().await;
                }
                Some(task_id) => {
                    self.follow_task(&token, &file_name, &task_id, receipt.message)
                        .await;
                }
            },
            Err(e) => {
                tracing::warn!("Upload of {} failed: {}", file_name, e);
                self.feed(
                    &token,
                    Message::error(format!("Upload of {} failed: {}", file_name, e)),
                )
                .await;
            }
        }

        let mut state = self.state.lock().await;
        self.finish_flow(&mut state);
        Ok(())
    }

    async fn follow_task(
        &self,
        token: &FlowToken,
        file_name: &str,
        task_id: &str,
        message: Option<String>,
    ) {
        let mut initial = UploadStatusInfo::new(UploadStatus::Uploaded).with_progress(0);
        initial.message = message;
        initial.task_id = Some(task_id.to_string());
        initial.filename = Some(file_name.to_string());

        let slot = {
            let mut state = self.state.lock().await;
            if state.is_same_generation(token) {
                state.phase = SessionPhase::PollingTask;
                state.side_channel.push(Message::upload_progress(initial));
                self.emit(SessionEvent::PhaseChanged(state.phase));
                self.emit_side_channel(&state);
                Some(state.side_channel.len() - 1)
            } else {
                None
            }
        };

        let this = self;
        let progress_token = token.clone();
        let outcome = self
            .poller
            .poll(task_id, move |status| {
                let token = progress_token.clone();
                async move { this.show_progress(&token, slot, status).await }
            })
            .await;

        // The terminal notice takes over the progress slot; upload status is
        // never left behind on a settled task
        match outcome {
            Ok(status) if status.status == UploadStatus::Done => {
                self.settle_progress(
                    token,
                    slot,
                    Message::notice(
                        format!("{} is ready to be searched", file_name),
                        MessageIcon::Success,
                    ),
                )
                .await;
                self.refresh_documents_logged().await;
            }
            Ok(status) => {
                let reason = status.message.unwrap_or_else(|| "unknown error".to_string());
                self.settle_progress(
                    token,
                    slot,
                    Message::error(format!("Processing {} failed: {}", file_name, reason)),
                )
                .await;
            }
            Err(e) => {
                tracing::warn!("Following upload task {} failed: {}", task_id, e);
                self.settle_progress(
                    token,
                    slot,
                    Message::error(format!("Processing {} failed: {}", file_name, e)),
                )
                .await;
            }
        }
    }

    /// Replaces the single progress message of an upload in place.
    async fn show_progress(&self, token: &FlowToken, slot: Option<usize>, status: UploadStatusInfo) {
        let mut state = self.state.lock().await;
        if !state.is_same_generation(token) {
            return;
        }
        if let Some(index) = slot
            && index < state.side_channel.len()
        {
            state.side_channel[index] = Message::upload_progress(status);
            self.emit_side_channel(&state);
        }
    }

    // ============================================================================
    // Deletion
    // ============================================================================

    /// Deletes a backend document and acknowledges the outcome.
    pub async fn delete_document(&self, filename: &str) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            state.begin_flow(SessionPhase::DeletingDocument);
            self.emit(SessionEvent::PhaseChanged(state.phase));
        }

        let result = self.backend.delete_document(filename).await;
        match &result {
            Ok(()) => {
                tracing::info!("Deleted document {}", filename);
                self.refresh_documents_logged().await;
                self.acknowledge(
                    AcknowledgementKind::Success,
                    format!("Deleted {}", filename),
                );
            }
            Err(e) => {
                tracing::warn!("Failed to delete document {}: {}", filename, e);
                self.acknowledge(
                    AcknowledgementKind::Error,
                    format!("Failed to delete {}: {}", filename, e),
                );
            }
        }

        let mut state = self.state.lock().await;
        self.finish_flow(&mut state);
        result
    }

    /// Removes a conversation; deleting the active one resets the view.
    pub async fn delete_conversation(&self, id: &str) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            let before = state.conversations.len();
            state.conversations.retain(|c| c.id != id);
            if state.conversations.len() == before {
                return Err(RagDeskError::not_found("Conversation", id));
            }

            state.begin_flow(SessionPhase::DeletingConversation);
            self.emit(SessionEvent::PhaseChanged(state.phase));
            if state.active_id.as_deref() == Some(id) {
                state.reset_view(None, Vec::new());
                self.emit_messages(&state);
                self.emit_side_channel(&state);
            }
            self.emit_conversations(&state);
        }

        self.persist().await;

        let mut state = self.state.lock().await;
        self.finish_flow(&mut state);
        Ok(())
    }

    // ============================================================================
    // Helpers
    // ============================================================================

    /// Saves the conversation list; failures are logged and swallowed.
    async fn persist(&self) {
        let _gate = self.persist_gate.lock().await;
        let snapshot = self.state.lock().await.conversations.clone();
        if let Err(e) = self.repository.save(&snapshot).await {
            tracing::warn!("Failed to persist conversations: {}", e);
        }
    }

    /// Writes the final upload message over the progress message.
    async fn settle_progress(&self, token: &FlowToken, slot: Option<usize>, message: Message) {
        let mut state = self.state.lock().await;
        if !state.is_same_generation(token) {
            tracing::debug!("Dropping upload result for an older view");
            return;
        }
        match slot {
            Some(index) if index < state.side_channel.len() => state.side_channel[index] = message,
            _ => state.side_channel.push(message),
        }
        self.emit_side_channel(&state);
    }

    async fn feed(&self, token: &FlowToken, message: Message) {
        let mut state = self.state.lock().await;
        if state.is_same_generation(token) {
            state.side_channel.push(message);
            self.emit_side_channel(&state);
        } else {
            tracing::debug!("Dropping upload feedback for an older view");
        }
    }

    async fn refresh_documents_logged(&self) {
        if let Err(e) = self.refresh_documents().await {
            tracing::warn!("Failed to refresh documents: {}", e);
        }
    }

    async fn set_phase_if_current(&self, token: &FlowToken, phase: SessionPhase) {
        let mut state = self.state.lock().await;
        if state.is_current(token) {
            state.phase = phase;
            self.emit(SessionEvent::PhaseChanged(phase));
        }
    }

    fn finish_flow(&self, state: &mut SessionState) {
        let before = state.phase;
        state.end_flow();
        if state.phase != before {
            self.emit(SessionEvent::PhaseChanged(state.phase));
        }
    }

    fn acknowledge(&self, kind: AcknowledgementKind, text: String) {
        self.emit(SessionEvent::Acknowledgement { kind, text });
    }

    fn emit_messages(&self, state: &SessionState) {
        self.emit(SessionEvent::MessagesChanged {
            conversation_id: state.active_id.clone(),
            messages: state.messages.clone(),
        });
    }

    fn emit_side_channel(&self, state: &SessionState) {
        self.emit(SessionEvent::SideChannelChanged(state.side_channel.clone()));
    }

    fn emit_conversations(&self, state: &SessionState) {
        self.emit(SessionEvent::ConversationsChanged(state.conversations.clone()));
    }

    fn emit(&self, event: SessionEvent) {
        // A dropped receiver only means nobody is watching
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
