//! Repository port - the unit of work the ledger writes through

use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Account, Notification, Transaction, User};

/// Operations available inside one atomic store transaction.
///
/// An implementation is only ever handed out while the store's write lock is
/// held, so a read followed by a write through the same `LedgerStore` cannot
/// interleave with another writer. Everything written through it commits or
/// rolls back together.
pub trait LedgerStore {
    // === Users ===

    fn insert_user(&self, user: &User) -> Result<()>;

    fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    // === Accounts ===

    fn insert_account(&self, account: &Account) -> Result<()>;

    fn find_account(&self, id: Uuid) -> Result<Option<Account>>;

    fn find_account_by_number(&self, account_number: &str) -> Result<Option<Account>>;

    /// Persist `balance`, `available_balance` and `updated_at` of an account
    fn save_balance(&self, account: &Account) -> Result<()>;

    // === Transactions (append-only) ===

    fn append_transaction(&self, tx: &Transaction) -> Result<()>;

    // === Notifications ===

    fn append_notification(&self, notification: &Notification) -> Result<()>;
}
