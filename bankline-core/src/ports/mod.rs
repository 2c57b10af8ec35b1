//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The ledger services
//! depend only on these traits, not on the concrete store.

mod repository;

pub use repository::LedgerStore;
