//! Shared data types for the Postgres store
//!
//! Row structs are serde-serializable so they can be cached as MessagePack.

use serde::{Deserialize, Serialize};

/// User row from database
///
/// `subject_id` is the identity provider's user id and the key the gateway
/// looks users up by. `external_auth_id` is the composite
/// `"{provider}|{provider_user_id}"` for third-party accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub subject_id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub external_auth_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Emergency row from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyRow {
    pub id: String,
    pub reporter_subject_id: String,
    pub category: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    /// Object-storage key of an attached photo, if any
    pub photo_key: Option<String>,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}
