//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the `LedgerStore` port and the read side of every service

pub mod duckdb;
