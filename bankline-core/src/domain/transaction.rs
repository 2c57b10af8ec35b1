//! Transaction domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Account;

/// Kind of ledger movement recorded on a transaction
///
/// The serialized names match what existing clients send and display
/// (`internal`, `admin-funding`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionType {
    #[serde(alias = "internal-transfer")]
    Internal,
    #[serde(alias = "external-transfer")]
    External,
    Wire,
    Deposit,
    Withdrawal,
    AdminFunding,
    AdminDebit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Internal => "internal",
            TransactionType::External => "external",
            TransactionType::Wire => "wire",
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::AdminFunding => "admin-funding",
            TransactionType::AdminDebit => "admin-debit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "internal" | "internal-transfer" => Some(TransactionType::Internal),
            "external" | "external-transfer" => Some(TransactionType::External),
            "wire" => Some(TransactionType::Wire),
            "deposit" => Some(TransactionType::Deposit),
            "withdrawal" => Some(TransactionType::Withdrawal),
            "admin-funding" => Some(TransactionType::AdminFunding),
            "admin-debit" => Some(TransactionType::AdminDebit),
            _ => None,
        }
    }

    /// True for the kinds a customer may initiate through a transfer
    pub fn is_customer_transfer(&self) -> bool {
        matches!(
            self,
            TransactionType::Internal | TransactionType::External | TransactionType::Wire
        )
    }
}

/// Only completed transactions exist; failures never produce a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
        }
    }
}

/// One side of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Counterparty {
    /// An account held at this bank
    #[serde(rename_all = "camelCase")]
    Account { account_id: Uuid, user_id: Uuid },
    /// The bank's administrator (funding, fees, corrections)
    Administrator,
    /// Anyone outside the bank
    External { name: String },
}

impl Counterparty {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Counterparty::Account { .. } => "account",
            Counterparty::Administrator => "administrator",
            Counterparty::External { .. } => "external",
        }
    }

    pub fn account_id(&self) -> Option<Uuid> {
        match self {
            Counterparty::Account { account_id, .. } => Some(*account_id),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Counterparty::Account { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }

    pub fn external_name(&self) -> Option<&str> {
        match self {
            Counterparty::External { name } => Some(name),
            _ => None,
        }
    }
}

impl From<&Account> for Counterparty {
    fn from(account: &Account) -> Self {
        Counterparty::Account {
            account_id: account.id,
            user_id: account.user_id,
        }
    }
}

/// An immutable record of a completed ledger movement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub from: Counterparty,
    pub to: Counterparty,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub description: String,
    pub recipient_name: Option<String>,
    pub status: TransactionStatus,
    /// When the movement is considered to have happened (may be back-dated)
    #[serde(rename = "timestamp")]
    pub effective_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn from_user_id(&self) -> Option<Uuid> {
        self.from.user_id()
    }

    pub fn to_user_id(&self) -> Option<Uuid> {
        self.to.user_id()
    }

    /// Signed amount from the perspective of one user: negative when money
    /// left them, positive when it arrived. Transfers between a user's own
    /// accounts net to zero.
    pub fn signed_amount_for(&self, user_id: Uuid) -> Decimal {
        let mut net = Decimal::ZERO;
        if self.from_user_id() == Some(user_id) {
            net -= self.amount;
        }
        if self.to_user_id() == Some(user_id) {
            net += self.amount;
        }
        net
    }
}
