//! Type-safe cache key builder with versioning

use crate::core::constants::CACHE_KEY_VERSION;

/// Type-safe cache key builder
///
/// All keys are prefixed with a version (e.g., "v1:") to allow
/// invalidating all cached data on schema changes.
pub struct CacheKey;

impl CacheKey {
    /// Cache key for user by identity subject id
    pub fn user(subject_id: &str) -> String {
        format!("{}:user:{}", CACHE_KEY_VERSION, subject_id)
    }

    /// Cache key for negative user lookup (not found)
    pub fn user_negative(subject_id: &str) -> String {
        format!("{}:user:neg:{}", CACHE_KEY_VERSION, subject_id)
    }

    /// Cache key for a GraphQL response, keyed by content hash and viewer
    pub fn graphql_response(content_hash: &str, session_discriminator: &str) -> String {
        format!(
            "{}:gql:{}:{}",
            CACHE_KEY_VERSION, content_hash, session_discriminator
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_versioned() {
        assert!(CacheKey::user("abc").starts_with("v1:"));
        assert!(CacheKey::user_negative("abc").starts_with("v1:"));
        assert!(CacheKey::graphql_response("deadbeef", "anon").starts_with("v1:"));
    }

    #[test]
    fn test_response_key_separates_viewers() {
        let anon = CacheKey::graphql_response("deadbeef", "anon");
        let user = CacheKey::graphql_response("deadbeef", "u:42");
        assert_ne!(anon, user);
    }
}
