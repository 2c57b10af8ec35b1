//! DuckDB repository implementation

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::{params, Connection};
use fs2::FileExt;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, AccountStatus, Counterparty, Notification, NotificationCategory, StepUpAuth,
    Transaction, TransactionStatus, TransactionType, User, UserStatus,
};
use crate::ports::LedgerStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when the store is held by another process
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("could not set lock")
        || lower.contains("file is already open")
        // fs2 contention on the sidecar lock file
        || lower.contains("store busy")
}

/// Summary counts over the whole store
#[derive(Debug, Clone, Default)]
pub struct StoreCounts {
    pub users: i64,
    pub accounts: i64,
    pub transactions: i64,
    pub notifications: i64,
}

/// DuckDB repository implementation
///
/// Owns the only connection to the store. Every ledger mutation goes through
/// [`DuckDbRepository::write`], which holds the connection mutex for the whole
/// unit of work and wraps it in a DuckDB transaction. A file-backed repository
/// additionally holds an exclusive advisory lock on `<db>.lock`, so a second
/// process cannot write the same store concurrently.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
    _lock_file: Option<File>,
}

impl DuckDbRepository {
    /// Open (or create) a file-backed store
    ///
    /// Retries with exponential backoff while another process holds the store.
    pub fn new(db_path: &Path) -> anyhow::Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open(db_path) {
                Ok((conn, lock_file)) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                        _lock_file: Some(lock_file),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            "store busy, retrying: {}",
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open store after {} retries", MAX_RETRIES)))
    }

    /// Open a throwaway in-memory store (no file lock)
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
            _lock_file: None,
        })
    }

    fn try_open(db_path: &Path) -> anyhow::Result<(Connection, File)> {
        let lock_path = db_path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {:?}", lock_path))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|e| anyhow!("store busy: {} ({})", lock_path.display(), e))?;

        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)?;
        Ok((conn, lock_file))
    }

    /// Path of the backing file, `None` for in-memory stores
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> anyhow::Result<MigrationResult> {
        let conn = self.lock()?;
        let migration_service = MigrationService::new(&conn);
        migration_service.run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> anyhow::Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Run `f` as one atomic unit of work.
    ///
    /// The connection mutex is held from the first read to the commit, so no
    /// other writer in this process can observe or modify intermediate state.
    /// If `f` fails the DuckDB transaction is rolled back and nothing it wrote
    /// is kept.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn LedgerStore) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let result = f(&DuckDbUnit { conn: &tx });
        match result {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!("rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    // === Users ===

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let conn = self.lock()?;
        select_user(&conn, "WHERE user_id = ?", &id.to_string())
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        select_user(&conn, "WHERE email = ?", &User::normalize_email(email))
    }

    pub fn get_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let rows = query_rows(
            &conn,
            &format!("{} ORDER BY created_at, email", USER_SELECT),
            [],
            user_row,
        )?;
        rows.into_iter().map(User::try_from).collect()
    }

    // === Accounts ===

    pub fn get_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.lock()?;
        let rows = query_rows(
            &conn,
            &format!("{} ORDER BY created_at, account_number", ACCOUNT_SELECT),
            [],
            account_row,
        )?;
        rows.into_iter().map(Account::try_from).collect()
    }

    pub fn get_accounts_for_user(&self, user_id: Uuid) -> Result<Vec<Account>> {
        let conn = self.lock()?;
        let rows = query_rows(
            &conn,
            &format!(
                "{} WHERE user_id = ? ORDER BY created_at, account_number",
                ACCOUNT_SELECT
            ),
            [user_id.to_string()],
            account_row,
        )?;
        rows.into_iter().map(Account::try_from).collect()
    }

    pub fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        let conn = self.lock()?;
        select_account(&conn, "WHERE account_id = ?", &id.to_string())
    }

    pub fn get_account_by_number(&self, account_number: &str) -> Result<Option<Account>> {
        let conn = self.lock()?;
        select_account(&conn, "WHERE account_number = ?", account_number)
    }

    /// All accounts joined with the first name of their holder
    pub fn get_accounts_with_holders(&self) -> Result<Vec<(Account, Option<String>)>> {
        let conn = self.lock()?;
        let sql = "SELECT a.account_id, a.user_id, a.account_number, a.name,
                          a.balance::VARCHAR, a.available_balance::VARCHAR, a.status,
                          a.created_at::VARCHAR, a.updated_at::VARCHAR, u.first_name
                   FROM accounts a LEFT JOIN users u ON u.user_id = a.user_id
                   ORDER BY a.created_at, a.account_number";
        let rows = query_rows(&conn, sql, [], |row| {
            Ok((account_row(row)?, row.get::<_, Option<String>>(9)?))
        })?;
        rows.into_iter()
            .map(|(row, holder)| Ok((Account::try_from(row)?, holder)))
            .collect()
    }

    /// Sum of all ledger balances
    pub fn total_balance(&self) -> Result<Decimal> {
        let conn = self.lock()?;
        let total: String = conn.query_row(
            "SELECT COALESCE(SUM(balance), 0)::VARCHAR FROM accounts",
            [],
            |row| row.get(0),
        )?;
        parse_decimal(&total)
    }

    // === Transactions ===

    /// Transactions where the user is on either side, newest first
    pub fn get_transactions_for_user(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        let conn = self.lock()?;
        let id = user_id.to_string();
        let rows = query_rows(
            &conn,
            &format!(
                "{} WHERE from_user_id = ? OR to_user_id = ?
                 ORDER BY effective_at DESC, created_at DESC, transaction_id DESC",
                TRANSACTION_SELECT
            ),
            [id.as_str(), id.as_str()],
            transaction_row,
        )?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    pub fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>> {
        let conn = self.lock()?;
        let rows = query_rows(
            &conn,
            &format!("{} WHERE transaction_id = ?", TRANSACTION_SELECT),
            [id.to_string()],
            transaction_row,
        )?;
        rows.into_iter().next().map(Transaction::try_from).transpose()
    }

    // === Notifications ===

    /// Notifications for a user, newest first
    pub fn get_notifications_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let conn = self.lock()?;
        let rows = query_rows(
            &conn,
            &format!(
                "{} WHERE user_id = ? ORDER BY effective_at DESC, notification_id DESC",
                NOTIFICATION_SELECT
            ),
            [user_id.to_string()],
            notification_row,
        )?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    pub fn count_unread_notifications(&self, user_id: Uuid) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND NOT is_read",
            [user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Set the read flag; returns false if no such notification exists
    pub fn mark_notification_read(&self, id: Uuid) -> Result<bool> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE notifications SET is_read = TRUE WHERE notification_id = ?",
            [id.to_string()],
        )?;
        Ok(updated > 0)
    }

    // === Maintenance ===

    pub fn get_counts(&self) -> Result<StoreCounts> {
        let conn = self.lock()?;
        let count = |table: &str| -> Result<i64> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            Ok(n)
        };
        Ok(StoreCounts {
            users: count("users")?,
            accounts: count("accounts")?,
            transactions: count("transactions")?,
            notifications: count("notifications")?,
        })
    }
}

/// The store as seen from inside [`DuckDbRepository::write`]
struct DuckDbUnit<'a> {
    conn: &'a Connection,
}

impl LedgerStore for DuckDbUnit<'_> {
    fn insert_user(&self, user: &User) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (user_id, first_name, last_name, email, phone, password_hash,
                                status, step_up_enabled, step_up_name, step_up_code,
                                admin_note, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))",
            params![
                user.id.to_string(),
                user.first_name,
                user.last_name,
                user.email,
                user.phone,
                user.password_hash,
                user.status.as_str(),
                user.step_up.enabled,
                user.step_up.challenge_name,
                user.step_up.challenge_code,
                user.admin_note,
                format_timestamp(&user.created_at),
            ],
        )?;
        Ok(())
    }

    fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        select_user(self.conn, "WHERE user_id = ?", &id.to_string())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        select_user(self.conn, "WHERE email = ?", &User::normalize_email(email))
    }

    fn insert_account(&self, account: &Account) -> Result<()> {
        self.conn.execute(
            "INSERT INTO accounts (account_id, user_id, account_number, name, balance,
                                   available_balance, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, CAST(? AS DECIMAL(18, 2)), CAST(? AS DECIMAL(18, 2)), ?,
                     CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))",
            params![
                account.id.to_string(),
                account.user_id.to_string(),
                account.account_number,
                account.name,
                account.balance.to_string(),
                account.available_balance.to_string(),
                account.status.as_str(),
                format_timestamp(&account.created_at),
                format_timestamp(&account.updated_at),
            ],
        )?;
        Ok(())
    }

    fn find_account(&self, id: Uuid) -> Result<Option<Account>> {
        select_account(self.conn, "WHERE account_id = ?", &id.to_string())
    }

    fn find_account_by_number(&self, account_number: &str) -> Result<Option<Account>> {
        select_account(self.conn, "WHERE account_number = ?", account_number)
    }

    fn save_balance(&self, account: &Account) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE accounts
             SET balance = CAST(? AS DECIMAL(18, 2)),
                 available_balance = CAST(? AS DECIMAL(18, 2)),
                 updated_at = CAST(? AS TIMESTAMP)
             WHERE account_id = ?",
            params![
                account.balance.to_string(),
                account.available_balance.to_string(),
                format_timestamp(&account.updated_at),
                account.id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(Error::not_found(format!("account {}", account.id)));
        }
        Ok(())
    }

    fn append_transaction(&self, tx: &Transaction) -> Result<()> {
        self.conn.execute(
            "INSERT INTO transactions (transaction_id,
                                       from_kind, from_account_id, from_user_id, from_name,
                                       to_kind, to_account_id, to_user_id, to_name,
                                       amount, transaction_type, description, recipient_name,
                                       status, effective_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS DECIMAL(18, 2)), ?, ?, ?, ?,
                     CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))",
            params![
                tx.id.to_string(),
                tx.from.kind_str(),
                tx.from.account_id().map(|id| id.to_string()),
                tx.from.user_id().map(|id| id.to_string()),
                tx.from.external_name(),
                tx.to.kind_str(),
                tx.to.account_id().map(|id| id.to_string()),
                tx.to.user_id().map(|id| id.to_string()),
                tx.to.external_name(),
                tx.amount.to_string(),
                tx.kind.as_str(),
                tx.description,
                tx.recipient_name,
                tx.status.as_str(),
                format_timestamp(&tx.effective_at),
                format_timestamp(&tx.created_at),
            ],
        )?;
        Ok(())
    }

    fn append_notification(&self, notification: &Notification) -> Result<()> {
        self.conn.execute(
            "INSERT INTO notifications (notification_id, user_id, title, message, category,
                                        transaction_id, is_read, effective_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))",
            params![
                notification.id.to_string(),
                notification.user_id.to_string(),
                notification.title,
                notification.message,
                notification.category.as_str(),
                notification.transaction_id.map(|id| id.to_string()),
                notification.is_read,
                format_timestamp(&notification.effective_at),
            ],
        )?;
        Ok(())
    }
}

// === Row decoding ===
//
// Rows are first pulled out as plain strings (money and timestamps are cast to
// VARCHAR in SQL so no float round trip happens), then converted to domain
// types outside the duckdb callback where our own error type is available.

const USER_SELECT: &str = "SELECT user_id, first_name, last_name, email, phone, password_hash,
                                  status, step_up_enabled, step_up_name, step_up_code,
                                  admin_note, created_at::VARCHAR
                           FROM users";

const ACCOUNT_SELECT: &str = "SELECT account_id, user_id, account_number, name,
                                     balance::VARCHAR, available_balance::VARCHAR, status,
                                     created_at::VARCHAR, updated_at::VARCHAR
                              FROM accounts";

const TRANSACTION_SELECT: &str = "SELECT transaction_id,
                                         from_kind, from_account_id, from_user_id, from_name,
                                         to_kind, to_account_id, to_user_id, to_name,
                                         amount::VARCHAR, transaction_type, description,
                                         recipient_name, status,
                                         effective_at::VARCHAR, created_at::VARCHAR
                                  FROM transactions";

const NOTIFICATION_SELECT: &str = "SELECT notification_id, user_id, title, message, category,
                                          transaction_id, is_read, effective_at::VARCHAR
                                   FROM notifications";

struct UserRow {
    id: String,
    first_name: String,
    last_name: Option<String>,
    email: String,
    phone: Option<String>,
    password_hash: String,
    status: String,
    step_up_enabled: bool,
    step_up_name: String,
    step_up_code: String,
    admin_note: Option<String>,
    created_at: String,
}

fn user_row(row: &duckdb::Row) -> duckdb::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        password_hash: row.get(5)?,
        status: row.get(6)?,
        step_up_enabled: row.get(7)?,
        step_up_name: row.get(8)?,
        step_up_code: row.get(9)?,
        admin_note: row.get(10)?,
        created_at: row.get(11)?,
    })
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: parse_uuid(&row.id)?,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            password_hash: row.password_hash,
            status: UserStatus::parse(&row.status)
                .ok_or_else(|| Error::store(format!("unknown user status {}", row.status)))?,
            step_up: StepUpAuth {
                enabled: row.step_up_enabled,
                challenge_name: row.step_up_name,
                challenge_code: row.step_up_code,
            },
            admin_note: row.admin_note,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

struct AccountRow {
    id: String,
    user_id: String,
    account_number: String,
    name: String,
    balance: String,
    available_balance: String,
    status: String,
    created_at: String,
    updated_at: String,
}

fn account_row(row: &duckdb::Row) -> duckdb::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        account_number: row.get(2)?,
        name: row.get(3)?,
        balance: row.get(4)?,
        available_balance: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

impl TryFrom<AccountRow> for Account {
    type Error = Error;

    fn try_from(row: AccountRow) -> Result<Self> {
        Ok(Account {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            account_number: row.account_number,
            name: row.name,
            balance: parse_decimal(&row.balance)?,
            available_balance: parse_decimal(&row.available_balance)?,
            status: AccountStatus::parse(&row.status)
                .ok_or_else(|| Error::store(format!("unknown account status {}", row.status)))?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

struct CounterpartyColumns {
    kind: String,
    account_id: Option<String>,
    user_id: Option<String>,
    name: Option<String>,
}

impl TryFrom<CounterpartyColumns> for Counterparty {
    type Error = Error;

    fn try_from(cols: CounterpartyColumns) -> Result<Self> {
        match cols.kind.as_str() {
            "account" => {
                let (Some(account_id), Some(user_id)) = (cols.account_id, cols.user_id) else {
                    return Err(Error::store("account counterparty without ids"));
                };
                Ok(Counterparty::Account {
                    account_id: parse_uuid(&account_id)?,
                    user_id: parse_uuid(&user_id)?,
                })
            }
            "administrator" => Ok(Counterparty::Administrator),
            "external" => Ok(Counterparty::External {
                name: cols.name.unwrap_or_else(|| "External".to_string()),
            }),
            other => Err(Error::store(format!("unknown counterparty kind {}", other))),
        }
    }
}

struct TransactionRow {
    id: String,
    from: CounterpartyColumns,
    to: CounterpartyColumns,
    amount: String,
    kind: String,
    description: String,
    recipient_name: Option<String>,
    status: String,
    effective_at: String,
    created_at: String,
}

fn transaction_row(row: &duckdb::Row) -> duckdb::Result<TransactionRow> {
    Ok(TransactionRow {
        id: row.get(0)?,
        from: CounterpartyColumns {
            kind: row.get(1)?,
            account_id: row.get(2)?,
            user_id: row.get(3)?,
            name: row.get(4)?,
        },
        to: CounterpartyColumns {
            kind: row.get(5)?,
            account_id: row.get(6)?,
            user_id: row.get(7)?,
            name: row.get(8)?,
        },
        amount: row.get(9)?,
        kind: row.get(10)?,
        description: row.get(11)?,
        recipient_name: row.get(12)?,
        status: row.get(13)?,
        effective_at: row.get(14)?,
        created_at: row.get(15)?,
    })
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = Error;

    fn try_from(row: TransactionRow) -> Result<Self> {
        if row.status != TransactionStatus::Completed.as_str() {
            return Err(Error::store(format!("unknown transaction status {}", row.status)));
        }
        Ok(Transaction {
            id: parse_uuid(&row.id)?,
            from: Counterparty::try_from(row.from)?,
            to: Counterparty::try_from(row.to)?,
            amount: parse_decimal(&row.amount)?,
            kind: TransactionType::parse(&row.kind)
                .ok_or_else(|| Error::store(format!("unknown transaction type {}", row.kind)))?,
            description: row.description,
            recipient_name: row.recipient_name,
            status: TransactionStatus::Completed,
            effective_at: parse_timestamp(&row.effective_at)?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

struct NotificationRow {
    id: String,
    user_id: String,
    title: String,
    message: String,
    category: String,
    transaction_id: Option<String>,
    is_read: bool,
    effective_at: String,
}

fn notification_row(row: &duckdb::Row) -> duckdb::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        category: row.get(4)?,
        transaction_id: row.get(5)?,
        is_read: row.get(6)?,
        effective_at: row.get(7)?,
    })
}

impl TryFrom<NotificationRow> for Notification {
    type Error = Error;

    fn try_from(row: NotificationRow) -> Result<Self> {
        Ok(Notification {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            title: row.title,
            message: row.message,
            category: NotificationCategory::parse(&row.category).ok_or_else(|| {
                Error::store(format!("unknown notification category {}", row.category))
            })?,
            transaction_id: row.transaction_id.as_deref().map(parse_uuid).transpose()?,
            is_read: row.is_read,
            effective_at: parse_timestamp(&row.effective_at)?,
        })
    }
}

fn query_rows<R, P, F>(conn: &Connection, sql: &str, params: P, map: F) -> Result<Vec<R>>
where
    P: duckdb::Params,
    F: FnMut(&duckdb::Row<'_>) -> duckdb::Result<R>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn select_user(conn: &Connection, filter: &str, value: &str) -> Result<Option<User>> {
    let rows = query_rows(
        conn,
        &format!("{} {}", USER_SELECT, filter),
        [value],
        user_row,
    )?;
    rows.into_iter().next().map(User::try_from).transpose()
}

fn select_account(conn: &Connection, filter: &str, value: &str) -> Result<Option<Account>> {
    let rows = query_rows(
        conn,
        &format!("{} {}", ACCOUNT_SELECT, filter),
        [value],
        account_row,
    )?;
    rows.into_iter().next().map(Account::try_from).transpose()
}

// Helper functions

/// TIMESTAMP columns hold naive UTC; this is the literal DuckDB casts from
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::store(format!("corrupt timestamp {}", s)))
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s).map_err(|_| Error::store(format!("corrupt decimal {}", s)))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|_| Error::store(format!("corrupt id {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn repo() -> DuckDbRepository {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    #[test]
    fn test_timestamp_round_trip_keeps_microseconds() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 20, 0, 0).unwrap()
            + chrono::Duration::microseconds(123_456);
        assert_eq!(parse_timestamp(&format_timestamp(&dt)).unwrap(), dt);
        assert_eq!(
            parse_timestamp("2024-01-15 20:00:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 20, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_account_balance_is_exact() {
        let repo = repo();
        let mut account = Account::open(Uuid::now_v7(), "Checking");
        account.apply_delta(Decimal::new(1, 2)).unwrap();
        repo.write(|store| store.insert_account(&account)).unwrap();

        repo.write(|store| {
            let mut stored = store.find_account(account.id)?.unwrap();
            stored.apply_delta(Decimal::new(2, 2))?;
            store.save_balance(&stored)
        })
        .unwrap();

        let stored = repo.get_account_by_number(&account.account_number).unwrap().unwrap();
        assert_eq!(stored.balance, Decimal::new(3, 2));
        assert_eq!(stored.available_balance, Decimal::new(3, 2));
    }

    #[test]
    fn test_failed_unit_of_work_rolls_back() {
        let repo = repo();
        let account = Account::open(Uuid::now_v7(), "Checking");

        let result: Result<()> = repo.write(|store| {
            store.insert_account(&account)?;
            Err(Error::invalid_input("abort"))
        });

        assert!(result.is_err());
        assert!(repo.get_account(account.id).unwrap().is_none());
    }

    #[test]
    fn test_counterparty_columns_round_trip() {
        let repo = repo();
        let user_id = Uuid::now_v7();
        let tx = Transaction {
            id: Uuid::now_v7(),
            from: Counterparty::Administrator,
            to: Counterparty::Account {
                account_id: Uuid::now_v7(),
                user_id,
            },
            amount: Decimal::new(50000, 2),
            kind: TransactionType::AdminFunding,
            description: "Deposit".to_string(),
            recipient_name: Some("Bankline".to_string()),
            status: TransactionStatus::Completed,
            effective_at: Utc.with_ymd_and_hms(2024, 1, 15, 20, 0, 0).unwrap(),
            created_at: Utc::now(),
        };
        repo.write(|store| store.append_transaction(&tx)).unwrap();

        let stored = repo.get_transaction(tx.id).unwrap().unwrap();
        assert_eq!(stored.from, Counterparty::Administrator);
        assert_eq!(stored.to, tx.to);
        assert_eq!(stored.amount, tx.amount);
        assert_eq!(stored.effective_at, tx.effective_at);
        assert_eq!(repo.get_transactions_for_user(user_id).unwrap().len(), 1);
    }

    #[test]
    fn test_second_process_lock_is_refused() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("bankline.duckdb");
        let _first = DuckDbRepository::new(&db_path).unwrap();

        // A second handle to the same store cannot take the lock
        let err = DuckDbRepository::try_open(&db_path).err().unwrap();
        assert!(is_retryable_error(&err.to_string()));
    }
}
