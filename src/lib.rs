//! Campus Events
//!
//! Event capacity and registration lifecycle manager for a multi-tenant
//! campus event platform. This library provides the event catalog, the
//! registration ledger, the attendance processor and the feedback gate,
//! backed by PostgreSQL or an in-process store.

pub mod config;
pub mod services;
pub mod models;
pub mod database;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{CampusError, ConflictReason, Entity, Result};

// Re-export main components for easy access
pub use database::{CampusStore, DatabaseService, MemoryStore};
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
