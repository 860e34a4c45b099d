//! Chat payload shaping.
//!
//! Turns the visible conversation into the `contents` array sent with a chat
//! request.

use std::sync::LazyLock;

use ragdesk_core::backend::{ChatContent, ChatRequest, ChatTextPart};
use ragdesk_core::conversation::Message;
use regex::Regex;

/// Citation block the backend appends to every answer.
static SOURCES_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<div class=['"]sources['"]>.*?</div>"#).unwrap());

static LINE_BREAKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\r\n]+").unwrap());

/// Removes citation blocks and collapses line breaks into single spaces.
pub fn clean_text(text: &str) -> String {
    let without_sources = SOURCES_BLOCK.replace_all(text, "");
    LINE_BREAKS
        .replace_all(&without_sources, " ")
        .trim()
        .to_string()
}

/// Builds the request context from the visible messages.
///
/// Client-side notices, upload feedback and the loading placeholder are not
/// part of the dialogue and are skipped, as are turns left empty after
/// cleaning.
pub fn build_contents(messages: &[Message]) -> Vec<ChatContent> {
    messages
        .iter()
        .filter(|m| !m.is_notice() && !m.is_placeholder())
        .filter_map(|m| {
            let parts: Vec<ChatTextPart> = m
                .parts
                .iter()
                .map(|p| clean_text(&p.text))
                .filter(|text| !text.is_empty())
                .map(|text| ChatTextPart { text })
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(ChatContent {
                    role: m.role,
                    parts,
                })
            }
        })
        .collect()
}

pub fn build_request(messages: &[Message], temperature: f32) -> ChatRequest {
    ChatRequest::new(build_contents(messages), temperature)
}
