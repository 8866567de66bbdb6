//! Dialog engine orchestrator and public API
//!
//! The `Engine` ties the frozen dialog registry to a conversation store
//! and exposes the single turn entry point: load the stack, begin or
//! resume, save the stack, hand back the outbound messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// Submodules
pub mod component;
pub mod error;
pub mod executor;
pub mod prompt;
pub mod registry;
pub mod stack;
pub mod store;
pub mod turn;
pub mod waterfall;

// Re-export commonly used types
pub use component::{ComponentDialog, ComponentState};
pub use error::{EngineError, Result, StoreError, StoreResult};
pub use executor::DialogExecutor;
pub use prompt::{PromptDialog, PromptKind, PromptRequest, Validator};
pub use registry::{DialogDef, DialogRegistry, DialogSet};
pub use stack::{DialogStack, Frame, FrameStatus};
pub use store::{ConversationStore, FileStore, MemoryStore, PersistedStack};
pub use turn::{ConversationId, DialogId, Outbox, OutboundMessage, TurnReply};
pub use waterfall::{step, StepContext, StepFn, StepOutcome, ValueBag, Waterfall};

/// Configuration for the dialog engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How many times a turn is re-loaded and re-run after losing an
    /// optimistic-concurrency race on save
    pub save_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { save_retries: 3 }
    }
}

/// The turn-processing engine for one dialog registry
///
/// One engine serves any number of conversations; per-conversation state
/// lives entirely in the store. Turns for distinct conversations may run
/// concurrently, turns for one conversation are serialized by the store's
/// version token.
pub struct Engine<S: ConversationStore> {
    registry: DialogRegistry,
    root: DialogId,
    store: S,
    config: EngineConfig,
}

impl<S: ConversationStore> Engine<S> {
    /// Create an engine over a frozen registry
    ///
    /// `root` is the dialog begun when a turn arrives for a conversation
    /// with no dialog in progress. Fails if `root` is not registered.
    pub fn new(registry: DialogRegistry, root: impl Into<DialogId>, store: S) -> Result<Self> {
        Self::with_config(registry, root, store, EngineConfig::default())
    }

    /// Create an engine with explicit configuration
    pub fn with_config(
        registry: DialogRegistry,
        root: impl Into<DialogId>,
        store: S,
        config: EngineConfig,
    ) -> Result<Self> {
        let root = root.into();
        if !registry.contains(&root) {
            return Err(EngineError::UnknownDialog(root.to_string()));
        }
        Ok(Self {
            registry,
            root,
            store,
            config,
        })
    }

    /// The registry this engine dispatches against
    pub fn registry(&self) -> &DialogRegistry {
        &self.registry
    }

    /// The underlying conversation store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether a dialog is currently in progress for `conversation`
    pub fn is_active(&self, conversation: &ConversationId) -> Result<bool> {
        let persisted = self.store.load(conversation)?;
        Ok(persisted.is_some_and(|p| !p.stack.is_empty()))
    }

    /// Process one inbound turn: load, begin-or-resume, save
    ///
    /// An empty stack begins the root dialog; otherwise `raw_input` is
    /// delivered to the suspended top frame. A save that loses the
    /// version race is re-loaded and re-run up to
    /// [`EngineConfig::save_retries`] times before the conflict is
    /// surfaced.
    pub fn process_turn(
        &self,
        conversation: &ConversationId,
        raw_input: &str,
    ) -> Result<TurnReply> {
        let mut attempt = 0;
        loop {
            let (mut stack, version) = match self.store.load(conversation)? {
                Some(persisted) => (persisted.stack, persisted.version),
                None => (DialogStack::new(), 0),
            };
            stack
                .check_invariant()
                .map_err(EngineError::CorruptStack)?;

            let exec = DialogExecutor::new(&self.registry);
            let mut outbox = Outbox::new();
            let completion = if stack.is_empty() {
                exec.begin(&mut stack, &mut outbox, &self.root, Value::Null)?
            } else {
                exec.resume(&mut stack, &mut outbox, raw_input)?
            };

            match self.store.save(conversation, &stack, version) {
                Ok(new_version) => {
                    tracing::debug!(
                        conversation = %conversation,
                        depth = stack.depth(),
                        complete = completion.is_some(),
                        version = new_version,
                        "turn processed"
                    );
                    return Ok(TurnReply {
                        messages: outbox.into_messages(),
                        completion,
                        version: new_version,
                    });
                }
                Err(err @ StoreError::VersionConflict { .. }) => {
                    if attempt >= self.config.save_retries {
                        return Err(err.into());
                    }
                    attempt += 1;
                    tracing::warn!(
                        conversation = %conversation,
                        attempt,
                        "save lost version race, re-running turn"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Cancel the whole conversation: pop every frame, deliver nothing
    pub fn cancel(&self, conversation: &ConversationId) -> Result<()> {
        let mut attempt = 0;
        loop {
            let (mut stack, version) = match self.store.load(conversation)? {
                Some(persisted) => (persisted.stack, persisted.version),
                None => (DialogStack::new(), 0),
            };
            DialogExecutor::new(&self.registry).cancel_all(&mut stack);
            match self.store.save(conversation, &stack, version) {
                Ok(_) => return Ok(()),
                Err(err @ StoreError::VersionConflict { .. }) => {
                    if attempt >= self.config.save_retries {
                        return Err(err.into());
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
