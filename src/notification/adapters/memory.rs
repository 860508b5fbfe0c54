//! In-memory notification and preference stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::notification::{
    domain::{DedupKey, DedupLogEntry, Notification, NotificationId, NotificationPreference},
    ports::{
        DedupOutcome, NotificationRepository, NotificationStoreError, NotificationStoreResult,
        PreferenceRepository,
    },
};
use crate::task::domain::StaffId;

fn poisoned(err: impl std::fmt::Display) -> NotificationStoreError {
    NotificationStoreError::persistence(std::io::Error::other(err.to_string()))
}

/// Thread-safe in-memory notification store with its dedup log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationRepository {
    state: Arc<RwLock<NotificationState>>,
}

#[derive(Debug, Default)]
struct NotificationState {
    notifications: HashMap<NotificationId, Notification>,
    dedup_log: HashMap<DedupKey, DedupLogEntry>,
}

impl NotificationState {
    fn insert(&mut self, notification: &Notification) -> NotificationStoreResult<()> {
        if self.notifications.contains_key(&notification.id()) {
            return Err(NotificationStoreError::DuplicateNotification(
                notification.id(),
            ));
        }
        self.notifications
            .insert(notification.id(), notification.clone());
        Ok(())
    }
}

impl InMemoryNotificationRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> NotificationStoreResult<RwLockReadGuard<'_, NotificationState>> {
        self.state.read().map_err(poisoned)
    }

    fn write(&self) -> NotificationStoreResult<RwLockWriteGuard<'_, NotificationState>> {
        self.state.write().map_err(poisoned)
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn insert(&self, notification: &Notification) -> NotificationStoreResult<()> {
        self.write()?.insert(notification)
    }

    async fn insert_deduplicated(
        &self,
        notification: &Notification,
        key: &DedupKey,
    ) -> NotificationStoreResult<DedupOutcome> {
        let mut state = self.write()?;
        if state.dedup_log.contains_key(key) {
            return Ok(DedupOutcome::AlreadySent);
        }
        state.insert(notification)?;
        state.dedup_log.insert(
            *key,
            DedupLogEntry {
                key: *key,
                sent_at: notification.created_at(),
            },
        );
        Ok(DedupOutcome::Inserted)
    }

    async fn find_dedup(&self, key: &DedupKey) -> NotificationStoreResult<Option<DedupLogEntry>> {
        Ok(self.read()?.dedup_log.get(key).copied())
    }

    async fn find(&self, id: NotificationId) -> NotificationStoreResult<Option<Notification>> {
        Ok(self.read()?.notifications.get(&id).cloned())
    }

    async fn list_for(
        &self,
        recipient: StaffId,
        limit: usize,
    ) -> NotificationStoreResult<Vec<Notification>> {
        let state = self.read()?;
        let mut listed: Vec<Notification> = state
            .notifications
            .values()
            .filter(|notification| notification.recipient() == recipient)
            .cloned()
            .collect();
        listed.sort_by(|left, right| {
            right
                .created_at()
                .cmp(&left.created_at())
                .then_with(|| right.id().cmp(&left.id()))
        });
        listed.truncate(limit);
        Ok(listed)
    }

    async fn unread_count(&self, recipient: StaffId) -> NotificationStoreResult<u64> {
        let state = self.read()?;
        let unread = state
            .notifications
            .values()
            .filter(|notification| notification.recipient() == recipient && !notification.is_read())
            .count();
        u64::try_from(unread).map_err(NotificationStoreError::persistence)
    }

    async fn save_read_state(&self, notification: &Notification) -> NotificationStoreResult<()> {
        let mut state = self.write()?;
        let stored = state
            .notifications
            .get_mut(&notification.id())
            .ok_or(NotificationStoreError::NotFound(notification.id()))?;
        *stored = notification.clone();
        Ok(())
    }

    async fn mark_all_read(
        &self,
        recipient: StaffId,
        read_at: DateTime<Utc>,
    ) -> NotificationStoreResult<u64> {
        let mut state = self.write()?;
        let mut updated: u64 = 0;
        for notification in state
            .notifications
            .values_mut()
            .filter(|notification| notification.recipient() == recipient)
        {
            if notification.mark_read_at(read_at) {
                updated += 1;
            }
        }
        Ok(updated)
    }
}

/// Thread-safe in-memory preference store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPreferenceRepository {
    preferences: Arc<RwLock<HashMap<StaffId, NotificationPreference>>>,
}

impl InMemoryPreferenceRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceRepository for InMemoryPreferenceRepository {
    async fn load_or_default(
        &self,
        staff_id: StaffId,
    ) -> NotificationStoreResult<NotificationPreference> {
        let mut preferences = self.preferences.write().map_err(poisoned)?;
        Ok(preferences
            .entry(staff_id)
            .or_insert_with(|| NotificationPreference::defaults_for(staff_id))
            .clone())
    }

    async fn upsert(&self, preference: &NotificationPreference) -> NotificationStoreResult<()> {
        let mut preferences = self.preferences.write().map_err(poisoned)?;
        preferences.insert(preference.staff_id, preference.clone());
        Ok(())
    }
}
