//! Cross-cutting error taxonomy.
//!
//! Every service error in the crate maps onto one [`ErrorKind`] so callers
//! (HTTP layers, CLIs, tests) can branch on the category of a failure without
//! matching each context's concrete error enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The task, notification, or preference does not exist.
    NotFound,
    /// The actor lacks the relationship the operation requires.
    Forbidden,
    /// A field is malformed or out of range.
    InvalidArgument,
    /// A state-dependent business rule was violated.
    PreconditionFailed,
    /// A best-effort downstream call failed.
    Unavailable,
    /// Concurrent writers kept invalidating the read version.
    Conflict,
    /// Storage or infrastructure failure.
    Internal,
}

impl ErrorKind {
    /// Returns the canonical snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::InvalidArgument => "invalid_argument",
            Self::PreconditionFailed => "precondition_failed",
            Self::Unavailable => "unavailable",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
