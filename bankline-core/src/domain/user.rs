//! User domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Suspended,
    Frozen,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Suspended => "suspended",
            UserStatus::Frozen => "frozen",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(UserStatus::Active),
            "suspended" => Some(UserStatus::Suspended),
            "frozen" => Some(UserStatus::Frozen),
            _ => None,
        }
    }
}

/// Optional step-up challenge shown to the user before sensitive actions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepUpAuth {
    pub enabled: bool,
    pub challenge_name: String,
    pub challenge_code: String,
}

/// A registered bank customer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    /// Stored lowercased; unique across users
    pub email: String,
    pub phone: Option<String>,
    /// Argon2 PHC string, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub status: UserStatus,
    pub step_up: StepUpAuth,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        first_name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            first_name: first_name.into(),
            last_name: None,
            email: Self::normalize_email(&email.into()),
            phone: None,
            password_hash: password_hash.into(),
            status: UserStatus::Active,
            step_up: StepUpAuth::default(),
            admin_note: None,
            created_at: Utc::now(),
        }
    }

    /// Emails compare case-insensitively
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.trim().is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}
