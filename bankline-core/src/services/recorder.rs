//! Transaction recorder - builds and appends immutable transaction records

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Amount, Counterparty, Transaction, TransactionStatus, TransactionType};
use crate::ports::LedgerStore;

/// Everything the ledger knows about a movement before it gets an identity
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub from: Counterparty,
    pub to: Counterparty,
    pub amount: Amount,
    pub kind: TransactionType,
    pub description: String,
    pub recipient_name: Option<String>,
    pub effective_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionRecorder;

impl TransactionRecorder {
    pub fn new() -> Self {
        Self
    }

    /// Assign an id and append the record.
    ///
    /// Ids are UUIDv7, so they are unique within the process and sort in
    /// creation order. The record is never touched again after this call.
    pub fn record(&self, store: &dyn LedgerStore, draft: TransactionDraft) -> Result<Transaction> {
        let tx = Transaction {
            id: Uuid::now_v7(),
            from: draft.from,
            to: draft.to,
            amount: draft.amount.value(),
            kind: draft.kind,
            description: draft.description,
            recipient_name: draft.recipient_name,
            status: TransactionStatus::Completed,
            effective_at: draft.effective_at,
            created_at: Utc::now(),
        };
        store.append_transaction(&tx)?;
        Ok(tx)
    }
}
