//! Status service - store-wide counts and totals

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Result;

pub struct StatusService {
    repository: Arc<DuckDbRepository>,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn get_status(&self) -> Result<StatusSummary> {
        let counts = self.repository.get_counts()?;
        Ok(StatusSummary {
            total_users: counts.users,
            total_accounts: counts.accounts,
            total_transactions: counts.transactions,
            total_notifications: counts.notifications,
            total_balance: self.repository.total_balance()?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_users: i64,
    pub total_accounts: i64,
    pub total_transactions: i64,
    pub total_notifications: i64,
    pub total_balance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store() {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        repo.ensure_schema().unwrap();

        let status = StatusService::new(repo).get_status().unwrap();
        assert_eq!(status.total_users, 0);
        assert_eq!(status.total_accounts, 0);
        assert_eq!(status.total_balance, Decimal::ZERO);
    }
}
