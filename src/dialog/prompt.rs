//! Prompt dialogs: typed value requests with recognition, validation, and retry
//!
//! A prompt sends its primary message and suspends. Each subsequent turn
//! is recognized into the target type and run through the validator; a
//! failed reply re-sends the retry message and leaves the frame waiting.
//! There is no retry ceiling: a prompt waits across turns indefinitely
//! (the attempts counter is bookkeeping, not a limit).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Pure predicate over a recognized value
///
/// Must be side-effect free and must not panic; a panicking validator is
/// a defect, not a rejection.
pub type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// The raw-value type a prompt recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Free text, trimmed of surrounding whitespace
    Text,

    /// A signed integer
    Integer,

    /// One of a closed set of options supplied per request
    Choice,
}

/// Immutable configuration for one prompt invocation
///
/// Created fresh each time a step issues a prompt; recorded in the prompt
/// frame's state so retries can reuse it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    /// Message sent when the prompt begins
    pub prompt: String,

    /// Message re-sent after a failed reply (primary message if absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<String>,

    /// Selectable options, for choice prompts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl PromptRequest {
    /// Build a request with just a primary message
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            retry: None,
            choices: Vec::new(),
        }
    }

    /// Set the retry message
    pub fn with_retry(mut self, retry: impl Into<String>) -> Self {
        self.retry = Some(retry.into());
        self
    }

    /// Set the selectable choices
    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// The message to send after a failed reply
    pub fn retry_message(&self) -> &str {
        self.retry.as_deref().unwrap_or(&self.prompt)
    }

    fn render(&self, text: &str) -> String {
        if self.choices.is_empty() {
            return text.to_string();
        }
        let options: Vec<String> = self
            .choices
            .iter()
            .enumerate()
            .map(|(i, label)| format!("  {}. {}", i + 1, label))
            .collect();
        format!("{text}\n{}", options.join("\n"))
    }

    /// The primary message with any choices rendered as a numbered list
    pub fn render_prompt(&self) -> String {
        self.render(&self.prompt)
    }

    /// The retry message with any choices rendered as a numbered list
    pub fn render_retry(&self) -> String {
        self.render(self.retry_message())
    }
}

/// A dialog that requests one typed value from the user
#[derive(Clone)]
pub struct PromptDialog {
    kind: PromptKind,
    validator: Option<Validator>,
}

impl PromptDialog {
    /// A free-text prompt
    pub fn text() -> Self {
        Self {
            kind: PromptKind::Text,
            validator: None,
        }
    }

    /// An integer prompt
    pub fn integer() -> Self {
        Self {
            kind: PromptKind::Integer,
            validator: None,
        }
    }

    /// A closed-choice prompt (options arrive in each request)
    pub fn choice() -> Self {
        Self {
            kind: PromptKind::Choice,
            validator: None,
        }
    }

    /// Attach a validator run on every recognized reply
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// The raw-value type this prompt recognizes
    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    /// Recognize a raw reply into the target type
    ///
    /// Choice replies match the configured labels exactly, or a 1-based
    /// ordinal. An unmatched reply is a recognition failure.
    pub fn recognize(&self, request: &PromptRequest, input: &str) -> Option<Value> {
        let input = input.trim();
        match self.kind {
            PromptKind::Text => Some(Value::from(input)),
            PromptKind::Integer => input.parse::<i64>().ok().map(Value::from),
            PromptKind::Choice => {
                if let Ok(ordinal) = input.parse::<usize>() {
                    if ordinal >= 1 {
                        if let Some(label) = request.choices.get(ordinal - 1) {
                            return Some(Value::from(label.as_str()));
                        }
                    }
                    return None;
                }
                request
                    .choices
                    .iter()
                    .find(|label| label.as_str() == input)
                    .map(|label| Value::from(label.as_str()))
            }
        }
    }

    /// Recognize and validate a reply; `None` drives the retry path
    pub fn accept(&self, request: &PromptRequest, input: &str) -> Option<Value> {
        let value = self.recognize(request, input)?;
        match &self.validator {
            Some(validator) if !validator(&value) => None,
            _ => Some(value),
        }
    }
}

impl fmt::Debug for PromptDialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptDialog")
            .field("kind", &self.kind)
            .field("validated", &self.validator.is_some())
            .finish()
    }
}

/// Per-frame state of a prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptState {
    /// The request this frame is servicing
    pub request: PromptRequest,

    /// Failed replies so far (bookkeeping only, never a limit)
    #[serde(default)]
    pub attempts: u32,
}

impl PromptState {
    /// State for a freshly begun prompt
    pub fn new(request: PromptRequest) -> Self {
        Self {
            request,
            attempts: 0,
        }
    }
}
