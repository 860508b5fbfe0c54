//! Read surface for notifications and preference management.

use super::error::{NotificationServiceError, NotificationServiceResult};
use crate::config::EngineConfig;
use crate::notification::{
    domain::{Notification, NotificationId, NotificationPreference, PreferencePatch},
    ports::{NotificationRepository, PreferenceRepository},
};
use crate::task::domain::StaffId;
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info};

/// Per-recipient inbox over stored notifications and preferences.
#[derive(Clone)]
pub struct NotificationInbox<N, P, C>
where
    N: NotificationRepository,
    P: PreferenceRepository,
    C: Clock + Send + Sync,
{
    notifications: Arc<N>,
    preferences: Arc<P>,
    clock: Arc<C>,
    default_page_size: usize,
}

impl<N, P, C> NotificationInbox<N, P, C>
where
    N: NotificationRepository,
    P: PreferenceRepository,
    C: Clock + Send + Sync,
{
    /// Creates an inbox using the default page size.
    #[must_use]
    pub fn new(notifications: Arc<N>, preferences: Arc<P>, clock: Arc<C>) -> Self {
        Self {
            notifications,
            preferences,
            clock,
            default_page_size: EngineConfig::default().default_page_size,
        }
    }

    /// Replaces the page size used when a listing does not name one.
    #[must_use]
    pub const fn with_default_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size;
        self
    }

    /// Returns the preferences of `staff_id`, creating defaults on first
    /// access.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationServiceError::Store`] when storage fails.
    pub async fn preferences(
        &self,
        staff_id: StaffId,
    ) -> NotificationServiceResult<NotificationPreference> {
        Ok(self.preferences.load_or_default(staff_id).await?)
    }

    /// Applies `patch` to the preferences of `staff_id`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationServiceError::Store`] when storage fails.
    pub async fn update_preferences(
        &self,
        staff_id: StaffId,
        patch: PreferencePatch,
    ) -> NotificationServiceResult<NotificationPreference> {
        let mut preference = self.preferences.load_or_default(staff_id).await?;
        patch.apply_to(&mut preference);
        self.preferences.upsert(&preference).await?;
        info!(staff_id = %staff_id, "notification preferences updated");
        Ok(preference)
    }

    /// Lists the newest notifications of `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationServiceError::Store`] when storage fails.
    pub async fn list(
        &self,
        recipient: StaffId,
        page_size: Option<usize>,
    ) -> NotificationServiceResult<Vec<Notification>> {
        let limit = page_size
            .filter(|size| *size > 0)
            .unwrap_or(self.default_page_size);
        Ok(self.notifications.list_for(recipient, limit).await?)
    }

    /// Counts unread notifications of `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationServiceError::Store`] when storage fails.
    pub async fn unread_count(&self, recipient: StaffId) -> NotificationServiceResult<u64> {
        Ok(self.notifications.unread_count(recipient).await?)
    }

    /// Marks one of `recipient`'s notifications read. Marking an already
    /// read notification succeeds without changing its read timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationServiceError::NotFound`] when the notification
    /// does not exist or belongs to someone else.
    pub async fn mark_read(
        &self,
        id: NotificationId,
        recipient: StaffId,
    ) -> NotificationServiceResult<Notification> {
        let mut notification = self.owned(id, recipient).await?;
        if notification.mark_read(&*self.clock) {
            self.notifications.save_read_state(&notification).await?;
            debug!(notification_id = %id, %recipient, "notification marked read");
        }
        Ok(notification)
    }

    /// Marks one of `recipient`'s notifications unread.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationServiceError::NotFound`] when the notification
    /// does not exist or belongs to someone else.
    pub async fn mark_unread(
        &self,
        id: NotificationId,
        recipient: StaffId,
    ) -> NotificationServiceResult<Notification> {
        let mut notification = self.owned(id, recipient).await?;
        if notification.mark_unread() {
            self.notifications.save_read_state(&notification).await?;
            debug!(notification_id = %id, %recipient, "notification marked unread");
        }
        Ok(notification)
    }

    /// Marks every unread notification of `recipient` read and returns how
    /// many changed.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationServiceError::Store`] when storage fails.
    pub async fn mark_all_read(&self, recipient: StaffId) -> NotificationServiceResult<u64> {
        let updated = self
            .notifications
            .mark_all_read(recipient, self.clock.utc())
            .await?;
        debug!(%recipient, updated, "notifications marked read");
        Ok(updated)
    }

    async fn owned(
        &self,
        id: NotificationId,
        recipient: StaffId,
    ) -> NotificationServiceResult<Notification> {
        self.notifications
            .find(id)
            .await?
            .filter(|notification| notification.recipient() == recipient)
            .ok_or(NotificationServiceError::NotFound(id))
    }
}
