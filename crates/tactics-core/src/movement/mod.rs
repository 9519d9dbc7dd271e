//! Tactical Movement
//!
//! Cover scoring, cover-to-cover stepping, flank targets, corner peeking,
//! wall avoidance and patrol routes. Everything here is a pure function of
//! level geometry and positions; the systems decide when to call it.

pub mod avoidance;
pub mod corner;
pub mod cover;
pub mod flank;
pub mod patrol;
pub mod route;

pub use cover::{find_best_cover, CoverPoint, CoverQuery};
pub use flank::{choose_side, flank_point, FlankChoice};
pub use patrol::{PatrolRoute, PatrolStep};
pub use route::{next_hop, Navigation, Step};
