//! Data layer
//!
//! Postgres store, cache, and pub/sub topics.

pub mod cache;
pub mod files;
pub mod postgres;
pub mod topics;
pub mod types;
