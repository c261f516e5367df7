//! PostgreSQL database service
//!
//! Centralized database management:
//! - Connection pooling with min/max bounds
//! - Idle connection cleanup and connection lifetime cycling
//! - Statement timeout protection
//! - Startup migrations
//!
//! All schema definitions and migrations are managed here.

pub mod error;
mod migrations;
pub mod repositories;
mod schema;
mod session;

pub use error::PostgresError;
pub use session::DbSession;
pub use sqlx::PgPool;

use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::log::LevelFilter;

use crate::core::config::PostgresConfig;
use crate::core::constants::{
    POSTGRES_ACQUIRE_TIMEOUT_SECS, POSTGRES_IDLE_TIMEOUT_SECS, POSTGRES_MAX_CONNECTIONS,
    POSTGRES_MAX_LIFETIME_SECS, POSTGRES_MIN_CONNECTIONS, POSTGRES_STATEMENT_TIMEOUT_SECS,
};

/// PostgreSQL database service
///
/// Handles database initialization, connection pooling, and migrations.
/// Created once at server startup and shared across all modules.
pub struct PostgresService {
    pool: PgPool,
}

impl PostgresService {
    /// Initialize the database service from configuration
    ///
    /// Creates the connection pool, then runs pending migrations before
    /// anything else touches the database.
    pub async fn init(config: &PostgresConfig) -> Result<Self, PostgresError> {
        let url = config.url();

        let mut options: PgConnectOptions = url
            .parse()
            .map_err(|e| PostgresError::Config(format!("Invalid PostgreSQL URL: {}", e)))?;

        options = options.log_statements(if config.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Trace
        });

        // Statement timeout at connection level for runaway query protection
        options = options.options([(
            "statement_timeout",
            format!("{}s", POSTGRES_STATEMENT_TIMEOUT_SECS),
        )]);

        let pool = PgPoolOptions::new()
            .max_connections(POSTGRES_MAX_CONNECTIONS)
            .min_connections(POSTGRES_MIN_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(POSTGRES_ACQUIRE_TIMEOUT_SECS))
            .idle_timeout(Duration::from_secs(POSTGRES_IDLE_TIMEOUT_SECS))
            .max_lifetime(Duration::from_secs(POSTGRES_MAX_LIFETIME_SECS))
            .connect_with(options)
            .await?;

        migrations::run_migrations(&pool).await?;

        tracing::debug!(
            max_connections = POSTGRES_MAX_CONNECTIONS,
            min_connections = POSTGRES_MIN_CONNECTIONS,
            acquire_timeout_secs = POSTGRES_ACQUIRE_TIMEOUT_SECS,
            idle_timeout_secs = POSTGRES_IDLE_TIMEOUT_SECS,
            max_lifetime_secs = POSTGRES_MAX_LIFETIME_SECS,
            statement_timeout_secs = POSTGRES_STATEMENT_TIMEOUT_SECS,
            "PostgresService initialized"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close the connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("PostgreSQL pool closed");
    }
}

#[cfg(test)]
mod tests {
    // PostgreSQL tests require a running PostgreSQL instance
    // and are typically run as integration tests
}
