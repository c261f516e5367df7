//! PostgreSQL repositories
//!
//! Free functions over a borrowed connection, so callers can run them either
//! on a per-request session connection or on one freshly acquired from the
//! pool.

pub mod emergency;
pub mod user;
