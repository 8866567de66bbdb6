//! Error types for the dialog engine
//!
//! Domain errors use thiserror; anyhow appears only at binary and
//! filesystem boundaries. Recognition and validation failures are not
//! errors at all: they drive the prompt retry path.

use thiserror::Error;

/// Top-level engine error
#[derive(Debug, Error)]
pub enum EngineError {
    /// A begin referenced a dialog id that was never registered.
    ///
    /// This is a configuration defect. Component dialogs validate their
    /// initial dialog at construction time, so in a well-formed registry
    /// this only fires for a bad top-level or step-supplied id.
    #[error("unknown dialog '{0}'")]
    UnknownDialog(String),

    /// A turn arrived for a conversation with an empty stack.
    ///
    /// Recoverable: the turn driver treats the input as a fresh top-level
    /// message instead.
    #[error("no active dialog for this conversation")]
    NoActiveDialog,

    /// A waterfall was resumed past its last step.
    ///
    /// Defensive invariant; unreachable for well-formed step lists.
    #[error("waterfall '{dialog}' overran: step {index} of {steps}")]
    WaterfallOverrun {
        /// Dialog id of the offending waterfall
        dialog: String,
        /// Step index that was requested
        index: usize,
        /// Number of registered steps
        steps: usize,
    },

    /// The persisted stack violates an engine invariant.
    #[error("corrupt dialog stack: {0}")]
    CorruptStack(String),

    /// Frame state failed to encode or decode.
    #[error("frame state codec error: {0}")]
    State(#[from] serde_json::Error),

    /// Persistence-layer error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Persistence errors surfaced by [`ConversationStore`](super::store::ConversationStore)
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic-concurrency check failed; the caller must re-load and retry.
    #[error("version conflict for conversation '{conversation}': expected {expected}, found {actual}")]
    VersionConflict {
        /// Conversation whose blob was contended
        conversation: String,
        /// Version the writer expected
        expected: u64,
        /// Version actually on record
        actual: u64,
    },

    /// Stack blob failed to encode or decode.
    #[error("stack blob codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Underlying filesystem error.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this error is a retriable optimistic-concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

/// Convenience result alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Convenience result alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
