//! Per-request GraphQL context
//!
//! Built once per HTTP request from the inbound headers and the shared
//! process services, then attached to the GraphQL request as data. Holds
//! the request id, negotiated locale, the verified session (if any), and
//! exactly one pooled database connection for the whole request.

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::core::constants::REQUEST_ID_HEADER;
use crate::data::cache::CacheService;
use crate::data::postgres::{DbSession, PgPool, PostgresError};
use crate::data::topics::TopicService;
use crate::graphql::locale::negotiate_locale;
use crate::identity::{IdentityVerifier, SessionPayload};
use crate::utils::request_id::resolve_request_id;

/// Request-scoped context available to every resolver
///
/// Dropped at the end of the request, which returns the database
/// connection to the pool.
pub struct RequestContext {
    pub request_id: String,
    pub locale: &'static str,
    /// Verified session payload; `None` for anonymous requests
    pub identity: Option<SessionPayload>,
    pub db: DbSession,
    pub cache: Arc<CacheService>,
    pub topics: Arc<TopicService>,
}

impl RequestContext {
    /// Build the context for one request
    ///
    /// Fails only when no database connection can be acquired; identity
    /// verification never fails, it just yields an anonymous context.
    pub async fn build(
        headers: &HeaderMap,
        verifier: &IdentityVerifier,
        pool: &PgPool,
        cache: Arc<CacheService>,
        topics: Arc<TopicService>,
    ) -> Result<Self, PostgresError> {
        let request_id = resolve_request_id(
            headers
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok()),
        );

        let locale = negotiate_locale(
            headers
                .get(axum::http::header::ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok()),
        );

        let identity = verifier.verify(headers);
        let db = DbSession::acquire(pool).await?;

        Ok(Self {
            request_id,
            locale,
            identity,
            db,
            cache,
            topics,
        })
    }

    /// The viewer's subject id, if the request is authenticated
    pub fn subject_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|p| p.subject_id.as_str())
    }
}
