//! Turn-level identifiers and message types
//!
//! A turn is one inbound raw input plus the synchronous processing it
//! triggers. The engine never holds a live continuation between turns;
//! everything a turn needs is loaded from the persisted stack.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque key identifying one ongoing conversation
///
/// Typically channel + user + thread, flattened by the transport. One
/// dialog stack exists per conversation id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ConversationId(String);

impl ConversationId {
    /// Create a conversation id from an opaque key
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a fresh random conversation id
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a registered dialog definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogId(String);

impl DialogId {
    /// Create a dialog id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DialogId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One outbound message produced while processing a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum OutboundMessage {
    /// Plain text sent to the user
    Text {
        /// Message body
        text: String,
    },

    /// A file attachment, delivered as a content URL
    Attachment {
        /// Attachment file name
        name: String,
        /// MIME content type
        content_type: String,
        /// Content URL (e.g. a base64 data URL)
        content_url: String,
    },
}

impl OutboundMessage {
    /// Build a plain text message
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// The text body, if this is a text message
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Attachment { .. } => None,
        }
    }
}

/// Collector for messages emitted while a turn executes
///
/// Dispatch to the real sink happens after the stack is persisted; from
/// the engine's perspective sends are fire-and-forget.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<OutboundMessage>,
}

impl Outbox {
    /// Create an empty outbox
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain text message
    pub fn send_text(&mut self, text: impl Into<String>) {
        self.messages.push(OutboundMessage::text(text));
    }

    /// Queue an arbitrary message
    pub fn send(&mut self, message: OutboundMessage) {
        self.messages.push(message);
    }

    /// Consume the outbox, yielding queued messages in send order
    pub fn into_messages(self) -> Vec<OutboundMessage> {
        self.messages
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether no messages were queued
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Result of processing one turn
#[derive(Debug)]
pub struct TurnReply {
    /// Messages to dispatch, in order
    pub messages: Vec<OutboundMessage>,

    /// Final result value, present only when the root dialog completed
    /// this turn and the stack is empty again
    pub completion: Option<serde_json::Value>,

    /// Version of the stack blob written by this turn
    pub version: u64,
}

impl TurnReply {
    /// Whether the conversation reached a terminal state this turn
    pub fn is_complete(&self) -> bool {
        self.completion.is_some()
    }
}
