//! In-memory staff directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{StaffId, StaffRole},
    ports::{DirectoryError, StaffDirectory, StaffProfile},
};

/// Thread-safe staff directory backed by a map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStaffDirectory {
    profiles: Arc<RwLock<HashMap<StaffId, StaffProfile>>>,
}

impl InMemoryStaffDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a profile.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Unavailable`] if the lock is poisoned.
    pub fn insert(&self, profile: StaffProfile) -> Result<(), DirectoryError> {
        let mut profiles = self
            .profiles
            .write()
            .map_err(|err| DirectoryError::Unavailable(err.to_string()))?;
        profiles.insert(profile.id, profile);
        Ok(())
    }

    /// Builder-style helper registering a member with the given name and
    /// role.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Unavailable`] if the lock is poisoned.
    pub fn with_member(
        self,
        id: StaffId,
        display_name: impl Into<String>,
        role: StaffRole,
    ) -> Result<Self, DirectoryError> {
        self.insert(StaffProfile {
            id,
            display_name: display_name.into(),
            role,
            department: String::new(),
        })?;
        Ok(self)
    }
}

#[async_trait]
impl StaffDirectory for InMemoryStaffDirectory {
    async fn lookup(&self, id: StaffId) -> Result<StaffProfile, DirectoryError> {
        let profiles = self
            .profiles
            .read()
            .map_err(|err| DirectoryError::Unavailable(err.to_string()))?;
        profiles.get(&id).cloned().ok_or(DirectoryError::NotFound(id))
    }
}
