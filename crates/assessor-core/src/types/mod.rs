//! Shared types for assessor.

mod insight;
mod message;

pub use insight::*;
pub use message::*;

/// Integer user identifier. Every store key is scoped by it.
pub type UserId = i64;
