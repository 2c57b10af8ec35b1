//! Notification domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Credit,
    Debit,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Credit => "credit",
            NotificationCategory::Debit => "debit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credit" => Some(NotificationCategory::Credit),
            "debit" => Some(NotificationCategory::Debit),
            _ => None,
        }
    }
}

/// A user-facing alert derived from a completed transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub category: NotificationCategory,
    pub transaction_id: Option<Uuid>,
    pub is_read: bool,
    /// Matches the effective timestamp of the linked transaction
    #[serde(rename = "timestamp")]
    pub effective_at: DateTime<Utc>,
}
