//! Turns session events into terminal output.
//!
//! Answers arrive as cumulative snapshots; only the newly added suffix is
//! written so the text appears to stream in place.

use ragdesk_core::conversation::{Message, MessageIcon, MessageRole};

/// Color class of a piece of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Answer,
    User,
    Success,
    Error,
    Warning,
    Info,
}

impl Tone {
    pub fn of(message: &Message) -> Self {
        match message.icon() {
            Some(MessageIcon::Success) => Tone::Success,
            Some(MessageIcon::Error) => Tone::Error,
            Some(MessageIcon::Warning) => Tone::Warning,
            Some(MessageIcon::Info) => Tone::Info,
            None if message.role == MessageRole::User => Tone::User,
            None => Tone::Answer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Text(String, Tone),
    Newline,
}

#[derive(Debug, Default)]
pub struct Transcript {
    conversation: Option<String>,
    /// Messages of the active conversation that are fully written.
    settled: usize,
    /// Text already written for the message being streamed.
    partial: String,
    known: usize,
    line_open: bool,
    feed: Vec<String>,
}

impl Transcript {
    /// Renders a change of the active conversation buffer.
    ///
    /// Switching conversations does not replay history; the REPL prints it
    /// when a conversation is opened. User turns are never echoed.
    pub fn messages(&mut self, conversation_id: Option<&str>, messages: &[Message]) -> Vec<Chunk> {
        let mut out = Vec::new();
        if conversation_id != self.conversation.as_deref() {
            self.close_line(&mut out);
            self.conversation = conversation_id.map(str::to_string);
            self.settled = messages.len();
            self.partial.clear();
        }
        if messages.len() < self.settled {
            self.close_line(&mut out);
            self.settled = messages.len();
            self.partial.clear();
        }
        self.known = messages.len();

        for (index, message) in messages.iter().enumerate().skip(self.settled) {
            let last = index + 1 == messages.len();
            if message.role == MessageRole::User || message.is_placeholder() {
                if !last || message.role == MessageRole::User {
                    self.settled = index + 1;
                }
                continue;
            }

            let text = message.text();
            let tone = Tone::of(message);
            if tone == Tone::Answer && text.starts_with(self.partial.as_str()) {
                let delta = &text[self.partial.len()..];
                if !delta.is_empty() {
                    out.push(Chunk::Text(delta.to_string(), tone));
                    self.line_open = true;
                }
            } else {
                self.close_line(&mut out);
                out.push(Chunk::Text(text.clone(), tone));
                self.line_open = true;
            }
            self.partial = text;

            if !last {
                self.close_line(&mut out);
                self.settled = index + 1;
                self.partial.clear();
            }
        }
        out
    }

    /// Marks everything received so far as final.
    pub fn settle(&mut self) -> Vec<Chunk> {
        let mut out = Vec::new();
        self.close_line(&mut out);
        self.settled = self.known;
        self.partial.clear();
        out
    }

    /// Renders upload feedback; a progress message is repeated only when its
    /// text changes.
    pub fn feed(&mut self, feed: &[Message]) -> Vec<Chunk> {
        let mut out = Vec::new();
        if feed.len() < self.feed.len() {
            self.feed.clear();
        }
        for (index, message) in feed.iter().enumerate() {
            let text = message.text();
            if self.feed.get(index) == Some(&text) {
                continue;
            }
            self.close_line(&mut out);
            out.push(Chunk::Text(format!("[upload] {}", text), Tone::of(message)));
            out.push(Chunk::Newline);
            if index < self.feed.len() {
                self.feed[index] = text;
            } else {
                self.feed.push(text);
            }
        }
        out
    }

    /// Renders a one-line notice outside the conversation.
    pub fn notice(&mut self, text: String, tone: Tone) -> Vec<Chunk> {
        let mut out = Vec::new();
        self.close_line(&mut out);
        out.push(Chunk::Text(text, tone));
        out.push(Chunk::Newline);
        out
    }

    fn close_line(&mut self, out: &mut Vec<Chunk>) {
        if self.line_open {
            out.push(Chunk::Newline);
            self.line_open = false;
        }
    }
}
