//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod amount;
mod notification;
pub mod result;
mod transaction;
mod user;

pub use account::{Account, AccountStatus, ACCOUNT_NUMBER_LEN};
pub use amount::Amount;
pub use notification::{Notification, NotificationCategory};
pub use transaction::{Counterparty, Transaction, TransactionStatus, TransactionType};
pub use user::{StepUpAuth, User, UserStatus};
