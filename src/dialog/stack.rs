//! Frames and the dialog stack
//!
//! The stack is the sole unit of persisted conversation state. It is
//! mutated as a whole per turn (read-modify-write) and must round-trip
//! through serde exactly: "suspended" means "stack saved, awaiting the
//! next turn", never a live continuation.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::Result;
use super::turn::DialogId;

/// Execution status of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameStatus {
    /// The frame is mid-execution within the current turn
    Active,

    /// The frame is suspended until the next inbound turn
    WaitingForInput,
}

/// One entry on the dialog stack: an active (or suspended) dialog instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Which registered dialog owns this frame
    pub dialog_id: DialogId,

    /// Execution status
    pub status: FrameStatus,

    /// Private state of the owning dialog (opaque to the stack)
    pub state: Value,
}

impl Frame {
    /// Create an active frame with initial state
    pub fn new<T: Serialize>(dialog_id: DialogId, state: &T) -> Result<Self> {
        Ok(Self {
            dialog_id,
            status: FrameStatus::Active,
            state: serde_json::to_value(state)?,
        })
    }

    /// Create a frame already suspended on input
    pub fn waiting<T: Serialize>(dialog_id: DialogId, state: &T) -> Result<Self> {
        let mut frame = Self::new(dialog_id, state)?;
        frame.status = FrameStatus::WaitingForInput;
        Ok(frame)
    }

    /// Decode this frame's private state
    pub fn read_state<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.state.clone())?)
    }

    /// Encode and store this frame's private state
    pub fn write_state<T: Serialize>(&mut self, state: &T) -> Result<()> {
        self.state = serde_json::to_value(state)?;
        Ok(())
    }
}

/// Ordered collection of frames for one conversation (top = most recent)
///
/// Invariant: at most one frame is `WaitingForInput`, and it is the top.
/// An empty stack means no conversation is in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogStack {
    frames: Vec<Frame>,
}

impl DialogStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no dialog is in progress
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames on the stack
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Push a frame onto the stack
    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Pop the top frame
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// Borrow the top frame
    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Mutably borrow the top frame
    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// Whether the top frame is suspended awaiting input
    pub fn is_waiting(&self) -> bool {
        matches!(
            self.top(),
            Some(Frame {
                status: FrameStatus::WaitingForInput,
                ..
            })
        )
    }

    /// Pop every frame without delivering any result
    ///
    /// The conversation-reset primitive; unconditional and total.
    pub fn cancel_all(&mut self) {
        self.frames.clear();
    }

    /// Check the waiting-frame invariant
    ///
    /// Only the top frame may be `WaitingForInput`.
    pub fn check_invariant(&self) -> std::result::Result<(), String> {
        for (i, frame) in self.frames.iter().enumerate() {
            let is_top = i + 1 == self.frames.len();
            if frame.status == FrameStatus::WaitingForInput && !is_top {
                return Err(format!(
                    "frame {} ('{}') is waiting below the top of a {}-frame stack",
                    i,
                    frame.dialog_id,
                    self.frames.len()
                ));
            }
        }
        Ok(())
    }

    /// Iterate frames from bottom to top
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }
}
