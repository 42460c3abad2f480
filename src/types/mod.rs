//! Core types for flowcx.
//!
//! - [`id`]: identifier and instant types (`TaskId`, `Time`)
//! - [`context`]: the ambient context value ([`AmbientContext`])

pub mod context;
pub mod id;

pub use context::{AmbientContext, REQUEST_ID_KEY, USER_KEY};
pub use id::{TaskId, Time};
