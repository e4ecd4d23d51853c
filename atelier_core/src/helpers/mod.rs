//! Read-only helper functions layered on the client.
//!
//! Each helper makes one or a handful of synchronous API calls and folds
//! the answers into a single agent-friendly view. No waiting, no retries,
//! no state; the orchestration layer is [`crate::ops`].

pub mod export;
pub mod inspection;
pub mod search;
