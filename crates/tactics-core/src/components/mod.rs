//! ECS Components
//!
//! Agent body and status components, plus the player snapshot resource.
//! Perception, planning and movement state live beside the code that owns it.

pub mod agent;
pub mod player;

pub use agent::*;
pub use player::*;
