//! User repository for PostgreSQL operations
//!
//! Read operations support optional caching. Pass `Some(cache)` to enable
//! caching, or `None` to bypass it. Mutations invalidate the relevant keys.

use std::time::Duration;

use sqlx::PgConnection;

use crate::core::constants::{CACHE_TTL_NEGATIVE, CACHE_TTL_USER};
use crate::data::cache::{CacheKey, CacheService};
use crate::data::postgres::PostgresError;
use crate::data::types::UserRow;

type UserTuple = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    i64,
    i64,
);

fn from_tuple(t: UserTuple) -> UserRow {
    UserRow {
        id: t.0,
        subject_id: t.1,
        email: t.2,
        username: t.3,
        external_auth_id: t.4,
        created_at: t.5,
        updated_at: t.6,
    }
}

/// Ensure a domain user row exists for an identity subject
///
/// Idempotent: a concurrent or repeated call for the same subject leaves a
/// single row in place and returns it. The insert never overwrites an
/// existing row, so a replayed sign-up cannot clobber a later username edit.
pub async fn ensure_user_exists(
    conn: &mut PgConnection,
    cache: Option<&CacheService>,
    subject_id: &str,
    email: Option<&str>,
    external_auth_id: Option<&str>,
) -> Result<UserRow, PostgresError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO users (id, subject_id, email, username, external_auth_id, created_at, updated_at)
         VALUES ($1, $2, $3, NULL, $4, $5, $5)
         ON CONFLICT (subject_id) DO NOTHING",
    )
    .bind(&id)
    .bind(subject_id)
    .bind(email)
    .bind(external_auth_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    // Read back whichever row won
    let row = get_user_from_db(conn, subject_id)
        .await?
        .ok_or_else(|| PostgresError::Config(format!("user row missing for {subject_id}")))?;

    if let Some(cache) = cache {
        cache
            .invalidate_key(&CacheKey::user_negative(subject_id))
            .await;
    }

    Ok(row)
}

/// Get a user by identity subject id (with optional caching)
pub async fn get_user_by_subject_id(
    conn: &mut PgConnection,
    cache: Option<&CacheService>,
    subject_id: &str,
) -> Result<Option<UserRow>, PostgresError> {
    if let Some(cache) = cache {
        let key = CacheKey::user(subject_id);
        let neg_key = CacheKey::user_negative(subject_id);

        // Try cache first
        match cache.get::<UserRow>(&key).await {
            Ok(Some(user)) => {
                tracing::trace!(%subject_id, "User cache hit");
                return Ok(Some(user));
            }
            Err(e) => tracing::warn!(%subject_id, error = %e, "Cache get error"),
            Ok(None) => {}
        }

        // Check negative cache (known not-found)
        if cache.exists(&neg_key).await.unwrap_or(false) {
            tracing::trace!(%subject_id, "User negative cache hit");
            return Ok(None);
        }

        let result = get_user_from_db(conn, subject_id).await?;

        match &result {
            Some(u) => {
                if let Err(e) = cache
                    .set(&key, u, Some(Duration::from_secs(CACHE_TTL_USER)))
                    .await
                {
                    tracing::warn!(%subject_id, error = %e, "Cache set error");
                }
            }
            None => {
                if let Err(e) = cache
                    .set_raw(
                        &neg_key,
                        vec![],
                        Some(Duration::from_secs(CACHE_TTL_NEGATIVE)),
                    )
                    .await
                {
                    tracing::warn!(%subject_id, error = %e, "Cache set (negative) error");
                }
            }
        }

        Ok(result)
    } else {
        get_user_from_db(conn, subject_id).await
    }
}

/// Get a user by email (no caching; used for collision checks before sign-up)
pub async fn get_user_by_email(
    conn: &mut PgConnection,
    email: &str,
) -> Result<Option<UserRow>, PostgresError> {
    let row = sqlx::query_as::<_, UserTuple>(
        "SELECT id, subject_id, email, username, external_auth_id, created_at, updated_at
         FROM users WHERE lower(email) = lower($1)",
    )
    .bind(email)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(from_tuple))
}

/// Update a user's username, invalidating the cached row
pub async fn update_username(
    conn: &mut PgConnection,
    cache: Option<&CacheService>,
    subject_id: &str,
    username: &str,
) -> Result<Option<UserRow>, PostgresError> {
    let now = chrono::Utc::now().timestamp();

    let row = sqlx::query_as::<_, UserTuple>(
        "UPDATE users SET username = $1, updated_at = $2 WHERE subject_id = $3
         RETURNING id, subject_id, email, username, external_auth_id, created_at, updated_at",
    )
    .bind(username)
    .bind(now)
    .bind(subject_id)
    .fetch_optional(conn)
    .await?;

    if let Some(cache) = cache {
        cache.invalidate_key(&CacheKey::user(subject_id)).await;
    }

    Ok(row.map(from_tuple))
}

/// Get a user by subject id directly from database (no caching)
async fn get_user_from_db(
    conn: &mut PgConnection,
    subject_id: &str,
) -> Result<Option<UserRow>, PostgresError> {
    let row = sqlx::query_as::<_, UserTuple>(
        "SELECT id, subject_id, email, username, external_auth_id, created_at, updated_at
         FROM users WHERE subject_id = $1",
    )
    .bind(subject_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(from_tuple))
}
