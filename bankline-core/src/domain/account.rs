//! Account domain model

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::amount::max_value;
use crate::domain::result::{Error, Result};

/// Number of digits in an externally addressable account number
pub const ACCOUNT_NUMBER_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Frozen,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Frozen => "frozen",
            AccountStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AccountStatus::Active),
            "frozen" => Some(AccountStatus::Frozen),
            "closed" => Some(AccountStatus::Closed),
            _ => None,
        }
    }
}

/// A deposit account owned by a user
///
/// `available_balance` mirrors `balance`; there are no holds. Both fields are
/// only ever changed together by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_number: String,
    pub name: String,
    pub balance: Decimal,
    pub available_balance: Decimal,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create an empty account with a freshly generated number
    pub fn open(user_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            account_number: Self::generate_number(),
            name: name.into(),
            balance: Decimal::ZERO,
            available_balance: Decimal::ZERO,
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Random ten digit number that never starts with zero
    pub fn generate_number() -> String {
        let n: u64 = rand::thread_rng().gen_range(1_000_000_000..10_000_000_000);
        n.to_string()
    }

    pub fn is_valid_number(number: &str) -> bool {
        number.len() == ACCOUNT_NUMBER_LEN && number.chars().all(|c| c.is_ascii_digit())
    }

    /// Last four digits, for notifications and confirmation screens
    pub fn masked_number(&self) -> String {
        let tail = &self.account_number[self.account_number.len().saturating_sub(4)..];
        format!("****{}", tail)
    }

    /// Apply a signed delta to both balance fields.
    ///
    /// Fails without touching the account when either balance would leave
    /// the range a money column can store.
    pub fn apply_delta(&mut self, delta: Decimal) -> Result<()> {
        let shift = |current: Decimal| {
            current
                .checked_add(delta)
                .filter(|next| next.abs() <= max_value())
                .ok_or_else(|| Error::invalid_input("balance would exceed the supported range"))
        };
        let balance = shift(self.balance)?;
        let available_balance = shift(self.available_balance)?;
        self.balance = balance;
        self.available_balance = available_balance;
        self.updated_at = Utc::now();
        Ok(())
    }
}
