//! Internal utilities.
//!
//! Intentionally minimal and dependency-free so that lab runs stay a
//! pure function of their seed.

pub mod arena;
pub mod det_rng;

pub use arena::{Arena, ArenaIndex};
pub use det_rng::DetRng;
