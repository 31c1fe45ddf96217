//! Store clients for Meritrack
//!
//! Provides:
//! - Relational (Postgres) connection pool via SeaORM
//! - Document store (MongoDB) client wrapper
//! - Embedded schema migrations for the relational side

pub mod mongo;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// Embedded relational migrations (see `migrations/` at the workspace root)
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Relational connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to Postgres...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(true);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::Connection {
                message: format!("Failed to connect to Postgres: {}", e),
            })?;

        let pool = Self { conn };

        if config.run_migrations {
            pool.migrate().await?;
        }

        info!("Postgres connection established");

        Ok(pool)
    }

    /// Get the underlying connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Run embedded migrations against the pool
    pub async fn migrate(&self) -> Result<()> {
        info!("Running relational migrations...");

        MIGRATOR
            .run(self.conn.get_postgres_connection_pool())
            .await
            .map_err(|e| AppError::Connection {
                message: format!("Migration failed: {}", e),
            })?;

        Ok(())
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;

        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::Connection {
                message: format!("Postgres ping failed: {}", e),
            })?;

        Ok(())
    }
}
