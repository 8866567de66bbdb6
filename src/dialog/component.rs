//! Component dialogs: a nested stack behind a single dialog id
//!
//! A component owns its own registry (the waterfall and prompts it uses)
//! and keeps a complete nested dialog stack inside its single outer
//! frame. The parent only ever sees one frame regardless of inner depth;
//! when the inner stack empties, the inner result ends the outer frame.

use serde::{Deserialize, Serialize};

use super::error::{EngineError, Result};
use super::registry::DialogRegistry;
use super::stack::DialogStack;
use super::turn::DialogId;

/// A dialog wrapping an inner registry and stack as one reusable unit
#[derive(Debug, Clone)]
pub struct ComponentDialog {
    dialogs: DialogRegistry,
    initial: DialogId,
}

impl ComponentDialog {
    /// Package an inner registry behind a single dialog
    ///
    /// Fails at setup time if `initial` is not registered in `dialogs`.
    pub fn new(dialogs: DialogRegistry, initial: impl Into<DialogId>) -> Result<Self> {
        let initial = initial.into();
        if !dialogs.contains(&initial) {
            return Err(EngineError::UnknownDialog(initial.to_string()));
        }
        Ok(Self { dialogs, initial })
    }

    /// The component's private registry
    pub fn dialogs(&self) -> &DialogRegistry {
        &self.dialogs
    }

    /// The dialog begun when the component begins
    pub fn initial(&self) -> &DialogId {
        &self.initial
    }
}

/// Per-frame state of a component: the entire nested stack
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentState {
    /// Nested stack scoped to this one outer frame
    pub inner: DialogStack,
}
