//! Session application services.
//!
//! This module contains the controller that reconciles the visible chat state
//! with durable storage while send, upload and delete flows overlap.

mod controller;
mod events;
mod state;

pub use controller::{EMPTY_ANSWER_NOTICE, SessionController};
pub use events::{AcknowledgementKind, SessionEvent};
pub use state::{FlowToken, SessionPhase, SessionSnapshot};
