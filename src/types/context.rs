//! The ambient context value carried by a logical task.
//!
//! An [`AmbientContext`] is the request state a flow carries with it:
//! who the caller is, which request this is, and whatever metadata the
//! application attaches. The propagator treats it as opaque — it is
//! stored, snapshotted on branch, and discarded on completion as a
//! single value. Internally it is an ordered string map, so snapshots
//! are plain clones and equality is structural.

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Well-known key for the request identifier.
pub const REQUEST_ID_KEY: &str = "request.id";

/// Well-known key for the authenticated user identity.
pub const USER_KEY: &str = "user";

/// Request-scoped state owned by exactly one logical task at a time.
///
/// Cloning produces an independent copy; this is the copy-on-branch
/// operation child continuations rely on.
///
/// # Example
///
/// ```
/// use flowcx::AmbientContext;
///
/// let ctx = AmbientContext::for_request("req-7081")
///     .with(flowcx::types::USER_KEY, "userX")
///     .with("tenant", "acme");
/// assert_eq!(ctx.request_id(), Some("req-7081"));
/// assert_eq!(ctx.value("tenant"), Some("acme"));
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbientContext {
    entries: BTreeMap<String, String>,
}

impl AmbientContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context seeded with a request identifier.
    #[must_use]
    pub fn for_request(request_id: impl Into<String>) -> Self {
        Self::new().with(REQUEST_ID_KEY, request_id)
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Inserts an entry, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Looks up an entry by key.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Removes an entry, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Returns the request identifier, if present.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.value(REQUEST_ID_KEY)
    }

    /// Returns the user identity, if present.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.value(USER_KEY)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the context carries no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Debug for AmbientContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}
