//! Conversation message types.
//!
//! This module contains types for representing chat turns, including roles,
//! text parts and the transient upload status a message may carry.

use serde::{Deserialize, Serialize};

use crate::upload::UploadStatusInfo;

/// Represents the author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message typed by the user.
    User,
    /// Message produced by the model (answers and client-side notices).
    Model,
}

/// Status icon attached to a notice-style message part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageIcon {
    Success,
    Error,
    Info,
    Warning,
}

/// One text fragment of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePart {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<MessageIcon>,
}

impl MessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            icon: None,
        }
    }

    pub fn with_icon(text: impl Into<String>, icon: MessageIcon) -> Self {
        Self {
            text: text.into(),
            icon: Some(icon),
        }
    }
}

/// A single chat turn.
///
/// `parts` is never empty; the only message with an empty text part is the
/// loading placeholder created by [`Message::placeholder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: MessageRole,
    pub parts: Vec<MessagePart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_status: Option<UploadStatusInfo>,
}

impl Message {
    /// Creates a plain user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            parts: vec![MessagePart::text(text)],
            upload_status: None,
        }
    }

    /// Creates a plain model answer.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Model,
            parts: vec![MessagePart::text(text)],
            upload_status: None,
        }
    }

    /// Creates a model-authored notice carrying a status icon.
    pub fn notice(text: impl Into<String>, icon: MessageIcon) -> Self {
        Self {
            role: MessageRole::Model,
            parts: vec![MessagePart::with_icon(text, icon)],
            upload_status: None,
        }
    }

    /// Creates an error notice.
    pub fn error(text: impl Into<String>) -> Self {
        Self::notice(text, MessageIcon::Error)
    }

    /// Creates the loading placeholder shown while an answer streams in.
    pub fn placeholder() -> Self {
        Self::model("")
    }

    /// Creates a model message that displays an in-flight upload status.
    pub fn upload_progress(status: UploadStatusInfo) -> Self {
        let text = status.describe();
        Self {
            role: MessageRole::Model,
            parts: vec![MessagePart::with_icon(text, MessageIcon::Info)],
            upload_status: Some(status),
        }
    }

    /// Returns the text of the first part, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.first().map(|p| p.text.as_str())
    }

    /// Returns all parts joined without separators.
    pub fn text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }

    /// Returns the icon of the first part.
    pub fn icon(&self) -> Option<MessageIcon> {
        self.parts.first().and_then(|p| p.icon)
    }

    /// True for the empty loading placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.role == MessageRole::Model
            && self.upload_status.is_none()
            && self.parts.iter().all(|p| p.text.is_empty() && p.icon.is_none())
    }

    /// True for client-generated notices (errors, warnings, upload feedback).
    pub fn is_notice(&self) -> bool {
        self.upload_status.is_some() || self.parts.iter().any(|p| p.icon.is_some())
    }

    /// Replaces the whole text content with a single part.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.parts = vec![MessagePart::text(text)];
    }
}
