//! Session token handling
//!
//! The gateway issues and verifies its own HS256 session tokens, signed with
//! the configured encryption secret. Verification is strict internally
//! (`Result` with a precise error) and lenient at the request boundary: any
//! failure there simply yields an anonymous request.

use std::fmt;

use anyhow::{Result, anyhow};
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::constants::{SESSION_COOKIE_NAME, SESSION_PAYLOAD_VERSION, SESSION_TTL_DAYS};

/// Session verification error
#[derive(Debug)]
pub enum VerificationError {
    /// No token present in the request
    Missing,
    /// Token signature has expired
    Expired,
    /// Token signature is invalid
    InvalidSignature,
    /// Token decoded but the payload shape is wrong
    MalformedPayload(String),
    /// Other validation error
    Invalid(String),
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "No session token present"),
            Self::Expired => write!(f, "Session token has expired"),
            Self::InvalidSignature => write!(f, "Invalid session token signature"),
            Self::MalformedPayload(msg) => write!(f, "Malformed session payload: {}", msg),
            Self::Invalid(msg) => write!(f, "Invalid session token: {}", msg),
        }
    }
}

impl std::error::Error for VerificationError {}

/// Verified session payload
///
/// `external_id` is the composite `"{provider}|{provider_user_id}"` for
/// third-party accounts, absent for email/password accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPayload {
    pub subject_id: String,
    pub external_id: Option<String>,
    pub email: String,
    pub username: Option<String>,
}

/// JWT claims for session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    iat: i64,
    exp: i64,
    jti: String,
    /// Payload schema version, must be the literal "1"
    #[serde(rename = "version")]
    version: String,
    #[serde(rename = "externalId", skip_serializing_if = "Option::is_none")]
    external_id: Option<String>,
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

/// Create a signed session token for a verified identity
pub fn issue_session_token(signing_key: &[u8], payload: &SessionPayload) -> Result<String> {
    let now = Utc::now();
    let exp = now + Duration::days(SESSION_TTL_DAYS as i64);

    let claims = SessionClaims {
        sub: payload.subject_id.clone(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        jti: Uuid::new_v4().to_string(),
        version: SESSION_PAYLOAD_VERSION.to_string(),
        external_id: payload.external_id.clone(),
        email: payload.email.clone(),
        username: payload.username.clone(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .map_err(|e| anyhow!("Failed to create session token: {}", e))
}

/// Validate and decode a session token
pub fn verify_session_token(
    token: &str,
    signing_key: &[u8],
) -> Result<SessionPayload, VerificationError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data =
        decode::<SessionClaims>(token, &DecodingKey::from_secret(signing_key), &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => VerificationError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    VerificationError::InvalidSignature
                }
                jsonwebtoken::errors::ErrorKind::Json(je) => {
                    VerificationError::MalformedPayload(je.to_string())
                }
                _ => VerificationError::Invalid(e.to_string()),
            })?;

    let claims = token_data.claims;
    if claims.version != SESSION_PAYLOAD_VERSION {
        return Err(VerificationError::MalformedPayload(format!(
            "unsupported payload version '{}'",
            claims.version
        )));
    }

    Ok(SessionPayload {
        subject_id: claims.sub,
        external_id: claims.external_id,
        email: claims.email,
        username: claims.username,
    })
}

/// Session verifier bound to the process signing key
#[derive(Clone)]
pub struct IdentityVerifier {
    signing_key: Vec<u8>,
}

impl IdentityVerifier {
    pub fn new(signing_key: &[u8]) -> Self {
        Self {
            signing_key: signing_key.to_vec(),
        }
    }

    /// Verify the session carried by a request, if any
    ///
    /// Looks for the session cookie first, then `Authorization: Bearer`.
    /// Every failure mode (missing, expired, bad signature, malformed)
    /// yields `None`: an unauthenticated request is anonymous, never an
    /// error.
    pub fn verify(&self, headers: &HeaderMap) -> Option<SessionPayload> {
        let token = match extract_token(headers) {
            Some(t) => t,
            None => return None,
        };

        match verify_session_token(&token, &self.signing_key) {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::debug!(error = %e, "Session verification failed, treating as anonymous");
                None
            }
        }
    }
}

/// Pull the session token out of request headers
fn extract_token(headers: &HeaderMap) -> Option<String> {
    // Cookie takes precedence over the Authorization header
    if let Some(cookie_header) = headers.get(axum::http::header::COOKIE)
        && let Ok(cookies) = cookie_header.to_str()
    {
        for part in cookies.split(';') {
            let part = part.trim();
            if let Some(value) = part.strip_prefix(SESSION_COOKIE_NAME)
                && let Some(value) = value.strip_prefix('=')
                && !value.is_empty()
            {
                return Some(value.to_string());
            }
        }
    }

    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION)
        && let Ok(auth) = auth.to_str()
        && let Some(token) = auth.strip_prefix("Bearer ")
        && !token.is_empty()
    {
        return Some(token.to_string());
    }

    None
}
