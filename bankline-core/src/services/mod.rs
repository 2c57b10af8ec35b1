//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod admin;
mod effective_date;
mod ledger;
pub mod logging;
pub mod migration;
mod notification;
mod recorder;
mod status;
mod user;

pub use admin::{
    AccountWithHolder, AccountsSummary, Adjustment, AdjustmentReceipt, AdminService, Direction,
};
pub use effective_date::{DateMode, DateNormalizer};
pub use ledger::{LedgerService, TransferReceipt, TransferRequest};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use notification::{NotificationDraft, NotificationEmitter, NotificationService};
pub use recorder::{TransactionDraft, TransactionRecorder};
pub use status::{StatusService, StatusSummary};
pub use user::{AccountVerification, RegisterRequest, Registration, UserService};
