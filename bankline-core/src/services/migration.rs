//! Schema migrations for the ledger store and the event log
//!
//! Both databases carry a `sys_migrations` table created by their
//! `000_migrations.sql`. The set of embedded scripts is passed in, so the same
//! runner serves `bankline.duckdb` and `logs.duckdb`.

use anyhow::{Context, Result};
use duckdb::Connection;

use crate::migrations::MIGRATIONS;

const BOOTSTRAP: &str = "000_migrations.sql";

/// Outcome of a migration run
#[derive(Debug, Default)]
pub struct MigrationResult {
    pub applied: Vec<String>,
    pub already_applied: usize,
}

pub struct MigrationService<'a> {
    conn: &'a Connection,
    scripts: &'static [(&'static str, &'static str)],
}

impl<'a> MigrationService<'a> {
    /// Runner for the ledger schema
    pub fn new(conn: &'a Connection) -> Self {
        Self::with_scripts(conn, MIGRATIONS)
    }

    pub fn with_scripts(
        conn: &'a Connection,
        scripts: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { conn, scripts }
    }

    /// Apply every script not yet recorded in `sys_migrations`, in order
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let mut result = MigrationResult::default();

        if !self.bootstrapped()? {
            if let Some((name, sql)) = self.scripts.iter().find(|(n, _)| *n == BOOTSTRAP) {
                self.apply(name, sql)?;
                result.applied.push(name.to_string());
            }
        }

        let recorded = self.get_applied()?;
        for (name, sql) in self.scripts.iter() {
            if recorded.iter().any(|r| r == name) {
                if *name != BOOTSTRAP || result.applied.is_empty() {
                    result.already_applied += 1;
                }
                continue;
            }
            self.apply(name, sql)?;
            result.applied.push(name.to_string());
        }

        if !result.applied.is_empty() {
            tracing::info!(applied = ?result.applied, "schema migrated");
        }
        Ok(result)
    }

    fn apply(&self, name: &str, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .with_context(|| format!("migration {} failed", name))?;
        self.conn.execute(
            "INSERT INTO sys_migrations (migration_name) VALUES (?)",
            [name],
        )?;
        Ok(())
    }

    fn bootstrapped(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);
        Ok(count > 0)
    }

    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for name in names {
            out.push(name?);
        }
        Ok(out)
    }

    pub fn get_pending(&self) -> Result<Vec<String>> {
        let applied = if self.bootstrapped()? {
            self.get_applied()?
        } else {
            Vec::new()
        };
        Ok(self
            .scripts
            .iter()
            .filter(|(name, _)| !applied.iter().any(|a| a == name))
            .map(|(name, _)| name.to_string())
            .collect())
    }
}
