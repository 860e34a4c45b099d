//! Typed notifications for the UI layer.

use ragdesk_core::conversation::{Conversation, Message};

use super::state::SessionPhase;

/// Outcome class of a fire-and-forget acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcknowledgementKind {
    Success,
    Error,
}

/// Everything a view needs to stay in sync with the session.
///
/// Events carry full copies so receivers never reach back into the
/// controller.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    /// The active conversation buffer changed.
    MessagesChanged {
        conversation_id: Option<String>,
        messages: Vec<Message>,
    },
    /// The upload feedback feed changed.
    SideChannelChanged(Vec<Message>),
    ConversationsChanged(Vec<Conversation>),
    DocumentsChanged(Vec<String>),
    /// Short-lived notice (toast) about a completed action.
    Acknowledgement {
        kind: AcknowledgementKind,
        text: String,
    },
}
