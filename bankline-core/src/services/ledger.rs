//! Account ledger - customer transfers

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, Amount, Counterparty, Notification, NotificationCategory, Transaction,
    TransactionType,
};
use crate::services::{NotificationDraft, NotificationEmitter, TransactionDraft, TransactionRecorder};

const DEFAULT_DESCRIPTION: &str = "Transfer";
const EXTERNAL_RECIPIENT: &str = "External";

/// A customer-initiated transfer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_account_id: Uuid,
    #[serde(default)]
    pub to_account_number: Option<String>,
    pub amount: Amount,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recipient_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub transaction: Transaction,
    pub source: Account,
    /// Present when the destination number resolved to an account
    pub destination: Option<Account>,
    pub notifications: Vec<Notification>,
}

pub struct LedgerService {
    repository: Arc<DuckDbRepository>,
    recorder: TransactionRecorder,
    emitter: NotificationEmitter,
}

impl LedgerService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self {
            repository,
            recorder: TransactionRecorder::new(),
            emitter: NotificationEmitter::new(),
        }
    }

    /// Move money out of an account, and into another one if the destination
    /// number belongs to this bank.
    ///
    /// The funds check, both balance updates, the record and its notifications
    /// run as one unit of work: a concurrent transfer from the same account
    /// either sees all of it or none of it.
    pub fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt> {
        if !request.kind.is_customer_transfer() {
            return Err(Error::invalid_input(format!(
                "transfer type must be internal, external or wire, got {}",
                request.kind.as_str()
            )));
        }
        let amount = request.amount;
        let destination_number = request
            .to_account_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let receipt = self.repository.write(|store| {
            let mut source = store
                .find_account(request.from_account_id)?
                .ok_or_else(|| Error::not_found(format!("account {}", request.from_account_id)))?;

            if amount.value() > source.balance {
                return Err(Error::InsufficientFunds {
                    requested: amount.value(),
                    available: source.balance,
                });
            }

            let mut destination = match destination_number.as_deref() {
                Some(number) => store.find_account_by_number(number)?,
                None => None,
            };
            if destination.as_ref().is_some_and(|d| d.id == source.id) {
                return Err(Error::invalid_input("cannot transfer to the source account"));
            }

            source.apply_delta(-amount.value())?;
            store.save_balance(&source)?;
            if let Some(dest) = destination.as_mut() {
                dest.apply_delta(amount.value())?;
                store.save_balance(dest)?;
            }

            let to = match destination.as_ref() {
                Some(dest) => Counterparty::from(dest),
                None => Counterparty::External {
                    name: request
                        .recipient_name
                        .clone()
                        .filter(|n| !n.trim().is_empty())
                        .unwrap_or_else(|| EXTERNAL_RECIPIENT.to_string()),
                },
            };
            let recipient_name = match &to {
                Counterparty::External { name } => Some(name.clone()),
                _ => None,
            };
            let effective_at = Utc::now();

            let transaction = self.recorder.record(
                store,
                TransactionDraft {
                    from: Counterparty::from(&source),
                    to,
                    amount,
                    kind: request.kind,
                    description: request
                        .description
                        .clone()
                        .filter(|d| !d.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
                    recipient_name,
                    effective_at,
                },
            )?;

            let mut notifications = vec![self.emitter.notify(
                store,
                NotificationDraft {
                    user_id: source.user_id,
                    title: "Money Sent".to_string(),
                    message: format!("You sent ${} via {}", amount, request.kind.as_str()),
                    category: NotificationCategory::Debit,
                    transaction_id: Some(transaction.id),
                    effective_at: Some(effective_at),
                },
            )?];
            if let Some(dest) = destination.as_ref() {
                notifications.push(self.emitter.notify(
                    store,
                    NotificationDraft {
                        user_id: dest.user_id,
                        title: "Money Received".to_string(),
                        message: format!("You received ${}", amount),
                        category: NotificationCategory::Credit,
                        transaction_id: Some(transaction.id),
                        effective_at: Some(effective_at),
                    },
                )?);
            }

            Ok(TransferReceipt {
                transaction,
                source,
                destination,
                notifications,
            })
        })?;

        tracing::info!(
            transaction_id = %receipt.transaction.id,
            kind = receipt.transaction.kind.as_str(),
            internal = receipt.destination.is_some(),
            "transfer committed"
        );
        Ok(receipt)
    }

    /// Transactions where the user is either side, newest first
    pub fn transactions_for_user(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        self.repository.get_transactions_for_user(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::LedgerStore;
    use rust_decimal::Decimal;

    fn setup() -> (Arc<DuckDbRepository>, LedgerService) {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        repo.ensure_schema().unwrap();
        (Arc::clone(&repo), LedgerService::new(repo))
    }

    fn funded_account(repo: &DuckDbRepository, cents: i64) -> Account {
        let mut account = Account::open(Uuid::now_v7(), "Checking");
        account.apply_delta(Decimal::new(cents, 2)).unwrap();
        repo.write(|store| store.insert_account(&account)).unwrap();
        account
    }

    fn request(from: &Account, to: Option<&str>, cents: i64, kind: TransactionType) -> TransferRequest {
        TransferRequest {
            from_account_id: from.id,
            to_account_number: to.map(str::to_string),
            amount: Amount::from_cents(cents).unwrap(),
            kind,
            description: None,
            recipient_name: None,
        }
    }

    #[test]
    fn test_self_transfer_is_rejected() {
        let (repo, ledger) = setup();
        let a = funded_account(&repo, 10_000);

        let err = ledger
            .transfer(request(&a, Some(&a.account_number), 100, TransactionType::Internal))
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        let stored = repo.get_account(a.id).unwrap().unwrap();
        assert_eq!(stored.balance, Decimal::new(10_000, 2));
    }

    #[test]
    fn test_admin_kinds_are_not_transfers() {
        let (repo, ledger) = setup();
        let a = funded_account(&repo, 10_000);

        let err = ledger
            .transfer(request(&a, None, 100, TransactionType::AdminFunding))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_unknown_source_is_not_found() {
        let (_repo, ledger) = setup();
        let ghost = Account::open(Uuid::now_v7(), "Checking");

        let err = ledger
            .transfer(request(&ghost, None, 100, TransactionType::External))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_external_transfer_defaults() {
        let (repo, ledger) = setup();
        let a = funded_account(&repo, 10_000);

        let receipt = ledger
            .transfer(request(&a, Some("9999999999"), 2_550, TransactionType::Wire))
            .unwrap();

        assert_eq!(receipt.source.balance, Decimal::new(7_450, 2));
        assert!(receipt.destination.is_none());
        assert_eq!(receipt.transaction.description, "Transfer");
        assert_eq!(receipt.transaction.recipient_name.as_deref(), Some("External"));
        assert_eq!(receipt.notifications.len(), 1);
        assert_eq!(receipt.notifications[0].message, "You sent $25.50 via wire");
    }

    #[test]
    fn test_exact_balance_can_be_sent() {
        let (repo, ledger) = setup();
        let a = funded_account(&repo, 1_000);

        let receipt = ledger
            .transfer(request(&a, None, 1_000, TransactionType::External))
            .unwrap();
        assert_eq!(receipt.source.balance, Decimal::ZERO);
    }
}
