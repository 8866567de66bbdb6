//! The EMR intake bot: turn driver wiring router, engine, and documents
//!
//! `EmrBot` is the hosting-process boundary: it owns the intent router in
//! front of the engine and the document call behind it. The engine sees
//! neither.

pub mod dialogs;
pub mod document;
pub mod intents;
pub mod profile;
pub mod validators;

use crate::dialog::{
    ConversationId, Engine, EngineConfig, EngineError, ConversationStore, OutboundMessage, Result,
};

use dialogs::MAIN_DIALOG;
use document::{pdf_attachment, DocumentClient};
use intents::{IntentTable, RouteDecision};
use profile::UserProfile;

/// One fully wired intake bot
pub struct EmrBot<S: ConversationStore, D: DocumentClient> {
    engine: Engine<S>,
    intents: IntentTable,
    documents: D,
}

impl<S: ConversationStore, D: DocumentClient> EmrBot<S, D> {
    /// Wire a bot from a store and a document client
    pub fn new(store: S, documents: D) -> Result<Self> {
        Self::with_config(store, documents, IntentTable::default(), EngineConfig::default())
    }

    /// Wire a bot with an explicit intent table and engine configuration
    pub fn with_config(
        store: S,
        documents: D,
        intents: IntentTable,
        config: EngineConfig,
    ) -> Result<Self> {
        let registry = dialogs::build_registry()?;
        let engine = Engine::with_config(registry, MAIN_DIALOG, store, config)?;
        Ok(Self {
            engine,
            intents,
            documents,
        })
    }

    /// The wrapped engine
    pub fn engine(&self) -> &Engine<S> {
        &self.engine
    }

    /// Handle one inbound message end to end
    ///
    /// Fresh messages (no dialog in progress) go through the intent
    /// router; everything else resumes the suspended stack. When the
    /// conversation completes, the document call runs and its outcome is
    /// appended as a message.
    pub fn handle_message(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<Vec<OutboundMessage>> {
        let mut messages = Vec::new();

        if !self.engine.is_active(conversation)? {
            match self.intents.classify(text) {
                RouteDecision::Respond(reply) => {
                    return Ok(vec![OutboundMessage::text(reply)]);
                }
                RouteDecision::BeginIntake { ack } => {
                    if let Some(ack) = ack {
                        messages.push(OutboundMessage::text(ack));
                    }
                }
            }
        }

        let reply = self.engine.process_turn(conversation, text)?;
        messages.extend(reply.messages);

        if let Some(result) = reply.completion {
            if !result.is_null() {
                let profile: UserProfile =
                    serde_json::from_value(result).map_err(EngineError::State)?;
                match self.documents.generate(&profile) {
                    Ok(bytes) => messages.push(pdf_attachment("GeneratedPdf.pdf", &bytes)),
                    Err(err) => {
                        tracing::warn!(error = %err, "document generation failed");
                        messages.push(OutboundMessage::text(format!(
                            "Failed to generate PDF: {err}"
                        )));
                    }
                }
            }
        }

        Ok(messages)
    }

    /// Reset the conversation, abandoning any in-progress dialog
    pub fn reset(&self, conversation: &ConversationId) -> Result<()> {
        self.engine.cancel(conversation)
    }
}
