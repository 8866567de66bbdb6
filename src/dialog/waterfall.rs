//! Waterfall dialogs: ordered step lists with a shared value bag
//!
//! A waterfall advances one step per resumption. The step index and the
//! value bag live in the frame state, so a waterfall can sit under an
//! arbitrary number of suspensions and still pick up at the right step.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::error::Result;
use super::prompt::PromptRequest;
use super::turn::{DialogId, Outbox};

/// Mutable scratch state threading answers between waterfall steps
///
/// Owned exclusively by one waterfall frame; destroyed when that frame
/// is popped.
pub type ValueBag = serde_json::Map<String, Value>;

/// What a step function decided to do next
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Push a child dialog; the waterfall resumes with its result
    BeginChild {
        /// Registered id of the child dialog
        dialog: DialogId,
        /// Opaque options handed to the child's begin
        options: Value,
    },

    /// End this waterfall, delivering a final result to the parent
    EndDialog(Value),
}

impl StepOutcome {
    /// Begin a child dialog with no options
    pub fn begin(dialog: impl Into<DialogId>) -> Self {
        Self::BeginChild {
            dialog: dialog.into(),
            options: Value::Null,
        }
    }

    /// Begin a prompt dialog with the given request
    pub fn prompt(dialog: impl Into<DialogId>, request: PromptRequest) -> Result<Self> {
        Ok(Self::BeginChild {
            dialog: dialog.into(),
            options: serde_json::to_value(&request)?,
        })
    }

    /// End the waterfall with a result value
    pub fn end<T: Serialize>(result: &T) -> Result<Self> {
        Ok(Self::EndDialog(serde_json::to_value(result)?))
    }

    /// End the waterfall with no result
    pub fn end_empty() -> Self {
        Self::EndDialog(Value::Null)
    }
}

/// Execution context handed to each step function
pub struct StepContext<'a> {
    pub(crate) values: &'a mut ValueBag,
    pub(crate) result: Option<&'a Value>,
    pub(crate) outbox: &'a mut Outbox,
}

impl StepContext<'_> {
    /// Result delivered by the previous child dialog (None on the first step)
    pub fn result(&self) -> Option<&Value> {
        self.result
    }

    /// Result of the previous child as a string slice, if it is one
    pub fn result_str(&self) -> Option<&str> {
        self.result.and_then(Value::as_str)
    }

    /// Result of the previous child as an integer, if it is one
    pub fn result_i64(&self) -> Option<i64> {
        self.result.and_then(Value::as_i64)
    }

    /// Store a value in the bag under `key`
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Read a value from the bag
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// The whole bag, for bulk conversion at the end of a flow
    pub fn values(&self) -> &ValueBag {
        self.values
    }

    /// Queue an outbound text message
    pub fn send(&mut self, text: impl Into<String>) {
        self.outbox.send_text(text);
    }
}

/// One unit of application logic for a waterfall position
pub type StepFn = Arc<dyn Fn(&mut StepContext<'_>) -> Result<StepOutcome> + Send + Sync>;

/// Wrap a closure as a step function
pub fn step<F>(f: F) -> StepFn
where
    F: Fn(&mut StepContext<'_>) -> Result<StepOutcome> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A dialog made of an ordered list of step functions
#[derive(Clone)]
pub struct Waterfall {
    steps: Vec<StepFn>,
}

impl Waterfall {
    /// Build a waterfall from its step list
    pub fn new(steps: impl IntoIterator<Item = StepFn>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the step list is empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Look up the step at `index`
    pub(crate) fn step_at(&self, index: usize) -> Option<&StepFn> {
        self.steps.get(index)
    }
}

impl fmt::Debug for Waterfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waterfall")
            .field("steps", &self.steps.len())
            .finish()
    }
}

/// Per-frame state of a waterfall
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaterfallState {
    /// Index of the step most recently run (None before the first step)
    pub step: Option<usize>,

    /// The value bag
    #[serde(default)]
    pub values: ValueBag,
}
