//! Per-request database session
//!
//! Each incoming request gets exactly one pooled connection for its lifetime,
//! so all queries in a request observe the same connection state. The
//! connection goes back to the pool when the session drops.

use sqlx::PgPool;
use sqlx::pool::PoolConnection;
use tokio::sync::{Mutex, MutexGuard};

use super::error::PostgresError;

/// One pooled connection scoped to a single request
///
/// The async mutex serializes resolver access to the connection; sqlx
/// connections are not usable concurrently.
pub struct DbSession {
    conn: Mutex<PoolConnection<sqlx::Postgres>>,
}

impl DbSession {
    /// Acquire a connection from the pool for this session
    pub async fn acquire(pool: &PgPool) -> Result<Self, PostgresError> {
        let conn = pool.acquire().await?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the session connection for a sequence of queries
    pub async fn lock(&self) -> MutexGuard<'_, PoolConnection<sqlx::Postgres>> {
        self.conn.lock().await
    }
}
