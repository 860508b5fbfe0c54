//! Port for the external staff directory.

use crate::error::ErrorKind;
use crate::task::domain::{StaffId, StaffRole};
use async_trait::async_trait;
use thiserror::Error;

/// Directory record for one staff member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffProfile {
    /// Staff identifier.
    pub id: StaffId,
    /// Human-readable name used in notification text.
    pub display_name: String,
    /// Role used for status defaults and assignment checks.
    pub role: StaffRole,
    /// Department name.
    pub department: String,
}

/// Errors returned by staff directory lookups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    /// No staff member has the identifier.
    #[error("staff member {0} not found")]
    NotFound(StaffId),

    /// The directory could not be reached.
    #[error("staff directory unavailable: {0}")]
    Unavailable(String),
}

impl DirectoryError {
    /// Maps the error onto the cross-cutting taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unavailable(_) => ErrorKind::Unavailable,
        }
    }
}

/// Lookup of staff identity, name and role.
#[async_trait]
pub trait StaffDirectory: Send + Sync {
    /// Resolves a staff member.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NotFound`] for unknown identifiers and
    /// [`DirectoryError::Unavailable`] when the directory cannot answer.
    async fn lookup(&self, id: StaffId) -> Result<StaffProfile, DirectoryError>;
}
