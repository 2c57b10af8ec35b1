//! Bankline Core - ledger and transaction engine for a demo bank
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (User, Account, Transaction, Notification)
//! - **ports**: Trait definitions for external dependencies (`LedgerStore`)
//! - **services**: Business logic orchestration (ledger, admin path, users)
//! - **adapters**: Concrete implementations (DuckDB)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use services::{EntryPoint, LogEvent, LoggingService};
pub use domain::{
    Account, Amount, Counterparty, Notification, NotificationCategory, Transaction,
    TransactionType, User,
};

/// File name of the ledger store inside the data directory
pub const DB_FILENAME: &str = "bankline.duckdb";

/// Main context for Bankline operations
///
/// Holds the configuration, the single store handle and every service built
/// on it. Services share the repository, so all of them go through the same
/// write lock.
pub struct BanklineContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub ledger_service: LedgerService,
    pub admin_service: AdminService,
    pub user_service: UserService,
    pub notification_service: NotificationService,
    pub status_service: StatusService,
}

impl BanklineContext {
    /// Open the store in `bankline_dir`, creating and migrating it if needed
    pub fn new(bankline_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(bankline_dir)
            .with_context(|| format!("Failed to create {:?}", bankline_dir))?;
        let config = Config::load(bankline_dir)?;
        let db_path = bankline_dir.join(DB_FILENAME);
        let repository = Arc::new(
            DuckDbRepository::new(&db_path)
                .with_context(|| format!("Failed to open {:?}", db_path))?,
        );
        Self::with_repository(config, repository)
    }

    /// Build a context around an existing repository (e.g. an in-memory one)
    pub fn with_repository(config: Config, repository: Arc<DuckDbRepository>) -> Result<Self> {
        repository.ensure_schema()?;

        let normalizer = DateNormalizer::new(config.date_mode);
        Ok(Self {
            ledger_service: LedgerService::new(Arc::clone(&repository)),
            admin_service: AdminService::new(
                Arc::clone(&repository),
                normalizer,
                config.bank_name.clone(),
            ),
            user_service: UserService::new(Arc::clone(&repository)),
            notification_service: NotificationService::new(Arc::clone(&repository)),
            status_service: StatusService::new(Arc::clone(&repository)),
            config,
            repository,
        })
    }
}
