//! Meritrack Common Library
//!
//! Shared code for Meritrack services including:
//! - Store clients (Postgres pool, MongoDB client)
//! - Error types and handling
//! - Configuration management
//! - Telemetry setup

pub mod config;
pub mod db;
pub mod errors;
pub mod telemetry;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, MongoClient};
pub use errors::{AppError, Result, StoreKind};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the document collection holding achievement content
pub const ACHIEVEMENTS_COLLECTION: &str = "achievements";
