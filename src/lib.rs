//! Parley – a resumable dialog stack engine for multi-turn conversations
//!
//! This crate drives question/answer conversations one inbound turn at a
//! time, with no in-memory continuation between turns:
//! - An in-progress conversation is a serializable stack of frames
//! - Execution suspends wherever user input is required and resumes from
//!   persisted state when the next turn arrives
//! - Waterfalls thread a value bag through ordered step functions
//! - Prompts recognize and validate typed replies, retrying across turns
//! - Component dialogs nest whole sub-conversations behind one frame
//!
//! The `emr` module is a complete application of the engine: a patient
//! record intake bot with intent routing and document generation.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Core engine: stacks, waterfalls, prompts, components, persistence
pub mod dialog;

/// The EMR intake bot built on the engine
pub mod emr;

// Re-export key types for convenience
pub use dialog::{Engine, EngineConfig};

/// Current version of the Parley engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
