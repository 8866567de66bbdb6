//! Dialog registration: setup-time catalog, frozen runtime registry
//!
//! Dialogs are registered once, before any turns are processed, and the
//! registry is immutable thereafter. Registration is validated eagerly so
//! that `UnknownDialog` is a setup-time failure, not a runtime surprise.

use std::collections::HashMap;
use std::sync::Arc;

use super::component::ComponentDialog;
use super::error::{EngineError, Result};
use super::prompt::PromptDialog;
use super::turn::DialogId;
use super::waterfall::Waterfall;

/// A registered unit of conversational logic
///
/// The three dialog shapes share one begin/continue capability set,
/// dispatched as a tagged variant rather than through inheritance.
#[derive(Debug, Clone)]
pub enum DialogDef {
    /// Ordered step list threading a value bag
    Waterfall(Waterfall),

    /// Typed value request with recognition, validation, and retry
    Prompt(PromptDialog),

    /// A nested stack packaged as one addressable dialog
    Component(ComponentDialog),
}

impl From<Waterfall> for DialogDef {
    fn from(w: Waterfall) -> Self {
        Self::Waterfall(w)
    }
}

impl From<PromptDialog> for DialogDef {
    fn from(p: PromptDialog) -> Self {
        Self::Prompt(p)
    }
}

impl From<ComponentDialog> for DialogDef {
    fn from(c: ComponentDialog) -> Self {
        Self::Component(c)
    }
}

/// Setup-time catalog of dialog definitions
#[derive(Debug, Default)]
pub struct DialogSet {
    dialogs: HashMap<DialogId, Arc<DialogDef>>,
}

impl DialogSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dialog under `id`, replacing any previous registration
    pub fn add(&mut self, id: impl Into<DialogId>, def: impl Into<DialogDef>) -> &mut Self {
        self.dialogs.insert(id.into(), Arc::new(def.into()));
        self
    }

    /// Freeze the set into an immutable registry
    pub fn freeze(self) -> DialogRegistry {
        DialogRegistry {
            dialogs: Arc::new(self.dialogs),
        }
    }
}

/// Immutable runtime view of registered dialogs
#[derive(Debug, Clone)]
pub struct DialogRegistry {
    dialogs: Arc<HashMap<DialogId, Arc<DialogDef>>>,
}

impl DialogRegistry {
    /// Look up a dialog definition
    pub fn get(&self, id: &DialogId) -> Result<&DialogDef> {
        self.dialogs
            .get(id)
            .map(Arc::as_ref)
            .ok_or_else(|| EngineError::UnknownDialog(id.to_string()))
    }

    /// Whether `id` is registered
    pub fn contains(&self, id: &DialogId) -> bool {
        self.dialogs.contains_key(id)
    }

    /// List registered dialog ids
    pub fn ids(&self) -> Vec<&DialogId> {
        self.dialogs.keys().collect()
    }
}
