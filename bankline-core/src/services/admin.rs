//! Admin override path
//!
//! Privileged balance adjustments. Unlike customer transfers these skip the
//! funds check, always have the administrator on the other side, and may be
//! back-dated through the [`DateNormalizer`].

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, Amount, Counterparty, Notification, NotificationCategory, Transaction,
    TransactionType,
};
use crate::services::{
    DateNormalizer, NotificationDraft, NotificationEmitter, TransactionDraft, TransactionRecorder,
};

const ADMIN_RECIPIENT: &str = "Admin Transaction";
const SERVICE_CHARGE: &str = "Service Charge";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "credit" => Some(Direction::Credit),
            "debit" => Some(Direction::Debit),
            _ => None,
        }
    }

    fn signed(&self, amount: Amount) -> Decimal {
        match self {
            Direction::Credit => amount.value(),
            Direction::Debit => -amount.value(),
        }
    }

    fn notification_title(&self) -> &'static str {
        match self {
            Direction::Credit => "Deposit Received",
            Direction::Debit => "Transaction Alert",
        }
    }

    fn category(&self) -> NotificationCategory {
        match self {
            Direction::Credit => NotificationCategory::Credit,
            Direction::Debit => NotificationCategory::Debit,
        }
    }
}

/// A fully specified admin adjustment
#[derive(Debug, Clone)]
pub struct Adjustment {
    pub account_number: String,
    pub amount: Amount,
    pub direction: Direction,
    pub kind: TransactionType,
    pub description: String,
    pub recipient_name: String,
    /// Raw date input; resolved by the normalizer
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentReceipt {
    pub account: Account,
    pub transaction: Transaction,
    pub notification: Notification,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsSummary {
    pub total_balance: Decimal,
    pub account_count: usize,
    pub user_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountWithHolder {
    #[serde(flatten)]
    pub account: Account,
    pub holder_name: Option<String>,
}

pub struct AdminService {
    repository: Arc<DuckDbRepository>,
    normalizer: DateNormalizer,
    bank_name: String,
    recorder: TransactionRecorder,
    emitter: NotificationEmitter,
}

impl AdminService {
    pub fn new(
        repository: Arc<DuckDbRepository>,
        normalizer: DateNormalizer,
        bank_name: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            normalizer,
            bank_name: bank_name.into(),
            recorder: TransactionRecorder::new(),
            emitter: NotificationEmitter::new(),
        }
    }

    /// Credit an account as a bank deposit
    pub fn fund_account(
        &self,
        account_number: &str,
        amount: Amount,
        description: Option<&str>,
        date: Option<&str>,
    ) -> Result<AdjustmentReceipt> {
        self.adjust_balance(Adjustment {
            account_number: account_number.to_string(),
            amount,
            direction: Direction::Credit,
            kind: TransactionType::AdminFunding,
            description: non_blank(description).unwrap_or("Deposit").to_string(),
            recipient_name: self.bank_name.clone(),
            date: date.map(str::to_string),
        })
    }

    /// Debit an account as a service charge; may overdraw
    pub fn debit_account(
        &self,
        account_number: &str,
        amount: Amount,
        note: Option<&str>,
        date: Option<&str>,
    ) -> Result<AdjustmentReceipt> {
        self.adjust_balance(Adjustment {
            account_number: account_number.to_string(),
            amount,
            direction: Direction::Debit,
            kind: TransactionType::AdminDebit,
            description: non_blank(note).unwrap_or("Withdrawal").to_string(),
            recipient_name: SERVICE_CHARGE.to_string(),
            date: date.map(str::to_string),
        })
    }

    /// Post a deposit or withdrawal that looks like ordinary card activity
    pub fn custom_transaction(
        &self,
        account_number: &str,
        amount: Amount,
        direction: Direction,
        merchant: Option<&str>,
        date: Option<&str>,
    ) -> Result<AdjustmentReceipt> {
        let merchant = non_blank(merchant);
        let (kind, fallback) = match direction {
            Direction::Credit => (TransactionType::Deposit, "Deposit"),
            Direction::Debit => (TransactionType::Withdrawal, "Withdrawal"),
        };
        self.adjust_balance(Adjustment {
            account_number: account_number.to_string(),
            amount,
            direction,
            kind,
            description: merchant.unwrap_or(fallback).to_string(),
            recipient_name: merchant.unwrap_or(ADMIN_RECIPIENT).to_string(),
            date: date.map(str::to_string),
        })
    }

    /// Apply an adjustment, record it and notify the account holder.
    ///
    /// No funds check. The transaction and the notification share the
    /// normalized effective timestamp.
    pub fn adjust_balance(&self, adjustment: Adjustment) -> Result<AdjustmentReceipt> {
        let effective_at = self.normalizer.resolve(adjustment.date.as_deref());
        let number = adjustment.account_number.trim();

        let receipt = self.repository.write(|store| {
            let mut account = store
                .find_account_by_number(number)?
                .ok_or_else(|| Error::not_found(format!("account number {}", number)))?;

            account.apply_delta(adjustment.direction.signed(adjustment.amount))?;
            store.save_balance(&account)?;

            let account_side = Counterparty::from(&account);
            let (from, to) = match adjustment.direction {
                Direction::Credit => (Counterparty::Administrator, account_side),
                Direction::Debit => (account_side, Counterparty::Administrator),
            };

            let transaction = self.recorder.record(
                store,
                TransactionDraft {
                    from,
                    to,
                    amount: adjustment.amount,
                    kind: adjustment.kind,
                    description: adjustment.description.clone(),
                    recipient_name: Some(adjustment.recipient_name.clone()),
                    effective_at,
                },
            )?;

            let notification = self.emitter.notify(
                store,
                NotificationDraft {
                    user_id: account.user_id,
                    title: adjustment.direction.notification_title().to_string(),
                    message: format!("{}: ${}", adjustment.description, adjustment.amount),
                    category: adjustment.direction.category(),
                    transaction_id: Some(transaction.id),
                    effective_at: Some(effective_at),
                },
            )?;

            Ok(AdjustmentReceipt {
                account,
                transaction,
                notification,
            })
        })?;

        if receipt.account.balance < Decimal::ZERO {
            tracing::warn!(
                account_id = %receipt.account.id,
                "admin adjustment left account with a negative balance"
            );
        }
        tracing::info!(
            transaction_id = %receipt.transaction.id,
            kind = receipt.transaction.kind.as_str(),
            "admin adjustment committed"
        );
        Ok(receipt)
    }

    /// Totals across every account
    pub fn accounts_summary(&self) -> Result<AccountsSummary> {
        let accounts = self.repository.get_accounts()?;
        let counts = self.repository.get_counts()?;
        Ok(AccountsSummary {
            total_balance: accounts.iter().map(|a| a.balance).sum(),
            account_count: accounts.len(),
            user_count: counts.users,
        })
    }

    pub fn list_accounts(&self) -> Result<Vec<AccountWithHolder>> {
        Ok(self
            .repository
            .get_accounts_with_holders()?
            .into_iter()
            .map(|(account, holder_name)| AccountWithHolder {
                account,
                holder_name,
            })
            .collect())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
