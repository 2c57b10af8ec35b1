//! Notification emitter and read side

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::domain::{Notification, NotificationCategory};
use crate::ports::LedgerStore;

#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
    pub transaction_id: Option<Uuid>,
    /// Back-dated entries pass the transaction's effective time; `None` is now
    pub effective_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationEmitter;

impl NotificationEmitter {
    pub fn new() -> Self {
        Self
    }

    /// Append an unread notification
    pub fn notify(
        &self,
        store: &dyn LedgerStore,
        draft: NotificationDraft,
    ) -> Result<Notification> {
        let notification = Notification {
            id: Uuid::now_v7(),
            user_id: draft.user_id,
            title: draft.title,
            message: draft.message,
            category: draft.category,
            transaction_id: draft.transaction_id,
            is_read: false,
            effective_at: draft.effective_at.unwrap_or_else(Utc::now),
        };
        store.append_notification(&notification)?;
        Ok(notification)
    }
}

/// Queries and the read flag
pub struct NotificationService {
    repository: Arc<DuckDbRepository>,
}

impl NotificationService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Newest first
    pub fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        self.repository.get_notifications_for_user(user_id)
    }

    pub fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        self.repository.count_unread_notifications(user_id)
    }

    pub fn mark_read(&self, notification_id: Uuid) -> Result<()> {
        if !self.repository.mark_notification_read(notification_id)? {
            return Err(Error::not_found(format!("notification {}", notification_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn service() -> (Arc<DuckDbRepository>, NotificationService) {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        repo.ensure_schema().unwrap();
        (Arc::clone(&repo), NotificationService::new(repo))
    }

    fn draft(user_id: Uuid, effective_at: Option<DateTime<Utc>>) -> NotificationDraft {
        NotificationDraft {
            user_id,
            title: "Deposit Received".to_string(),
            message: "Deposit: $5.00".to_string(),
            category: NotificationCategory::Credit,
            transaction_id: None,
            effective_at,
        }
    }

    #[test]
    fn test_notify_keeps_effective_timestamp() {
        let (repo, service) = service();
        let user_id = Uuid::now_v7();
        let back_dated = Utc.with_ymd_and_hms(2023, 12, 24, 20, 0, 0).unwrap();

        let created = repo
            .write(|store| NotificationEmitter::new().notify(store, draft(user_id, Some(back_dated))))
            .unwrap();

        assert!(!created.is_read);
        let listed = service.list_for_user(user_id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].effective_at, back_dated);
    }

    #[test]
    fn test_list_is_newest_first_and_read_flag_counts() {
        let (repo, service) = service();
        let user_id = Uuid::now_v7();
        let older = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        repo.write(|store| {
            NotificationEmitter::new().notify(store, draft(user_id, Some(older)))?;
            NotificationEmitter::new().notify(store, draft(user_id, None))
        })
        .unwrap();

        let listed = service.list_for_user(user_id).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].effective_at > listed[1].effective_at);
        assert_eq!(service.unread_count(user_id).unwrap(), 2);

        service.mark_read(listed[0].id).unwrap();
        assert_eq!(service.unread_count(user_id).unwrap(), 1);
    }

    #[test]
    fn test_mark_read_unknown_is_not_found() {
        let (_repo, service) = service();
        let err = service.mark_read(Uuid::now_v7()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
