//! Shared telemetry types and serialization for the tactics engine.
//!
//! This crate contains pure data structures with no simulation logic.
//! The engine produces these records; loggers, replay tools and tests
//! consume them.

pub mod event;
pub mod log;
pub mod state;

// Re-export event types
pub use event::{
    AgentEvent, AgentEventKind, Point, Reflex, ResetReason, TransitionCause,
};

// Re-export state kinds
pub use state::StateKind;

// Re-export the log writer
pub use log::EventLog;
