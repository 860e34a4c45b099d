//! Ephemeral session state.

use ragdesk_core::conversation::{Conversation, Message};

/// What the session is doing right now.
///
/// Flows may overlap (an upload can run during a send); the phase tracks the
/// most recent transition and drops back to `Idle` once no flow is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Composing,
    Sending,
    StreamingResponse,
    Uploading,
    PollingTask,
    DeletingDocument,
    DeletingConversation,
}

/// Identifies the conversation context a flow started in.
///
/// A flow whose token no longer matches the session must not touch the
/// visible buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowToken {
    pub conversation_id: Option<String>,
    pub generation: u64,
}

/// Read-only copy of the session for rendering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub draft: String,
    pub active_conversation_id: Option<String>,
    pub messages: Vec<Message>,
    pub side_channel: Vec<Message>,
    pub conversations: Vec<Conversation>,
    pub documents: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub phase: SessionPhase,
    pub draft: String,
    pub active_id: Option<String>,
    /// The ephemeral buffer of the active conversation.
    pub messages: Vec<Message>,
    /// Upload feedback; never persisted.
    pub side_channel: Vec<Message>,
    /// Newest first, mirrors what was last persisted plus pending changes.
    pub conversations: Vec<Conversation>,
    pub documents: Vec<String>,
    pub generation: u64,
    /// Generation of the send currently in flight.
    pub send_in_flight: Option<u64>,
    pub running_flows: u32,
}

impl SessionState {
    pub fn token(&self) -> FlowToken {
        FlowToken {
            conversation_id: self.active_id.clone(),
            generation: self.generation,
        }
    }

    /// The staleness check every flow runs before touching shared state.
    pub fn is_current(&self, token: &FlowToken) -> bool {
        self.generation == token.generation && self.active_id == token.conversation_id
    }

    /// Weaker check for flows that are not tied to one conversation.
    ///
    /// The first send of a fresh session assigns an id without starting a new
    /// generation, so uploads compare generations only.
    pub fn is_same_generation(&self, token: &FlowToken) -> bool {
        self.generation == token.generation
    }

    /// Starts a new visible context; in-flight flows become stale.
    pub fn reset_view(&mut self, active_id: Option<String>, messages: Vec<Message>) {
        self.active_id = active_id;
        self.messages = messages;
        self.side_channel.clear();
        self.generation += 1;
    }

    /// Copies the buffer into the active conversation record.
    pub fn sync_active_conversation(&mut self) {
        let Some(id) = self.active_id.as_deref() else {
            return;
        };
        if let Some(record) = self.conversations.iter_mut().find(|c| c.id == id) {
            record.messages = self.messages.clone();
        }
    }

    pub fn begin_flow(&mut self, phase: SessionPhase) {
        self.running_flows += 1;
        self.phase = phase;
    }

    pub fn end_flow(&mut self) {
        self.running_flows = self.running_flows.saturating_sub(1);
        if self.running_flows == 0 {
            self.phase = SessionPhase::Idle;
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            draft: self.draft.clone(),
            active_conversation_id: self.active_id.clone(),
            messages: self.messages.clone(),
            side_channel: self.side_channel.clone(),
            conversations: self.conversations.clone(),
            documents: self.documents.clone(),
        }
    }
}
