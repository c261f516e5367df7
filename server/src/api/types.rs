//! Shared API types
//!
//! Error responses for the non-GraphQL routes share one JSON shape:
//! `{ "error": <type>, "code": <CODE>, "message": <text> }`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::identity::IdentityError;

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    Unauthorized { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn from_store(e: anyhow::Error) -> Self {
        tracing::error!(error = %e, "User store error");
        Self::Internal {
            message: "Database operation failed".to_string(),
        }
    }

    pub fn from_identity(e: IdentityError) -> Self {
        tracing::error!(error = %e, "Identity core error");
        Self::Internal {
            message: "Identity operation failed".to_string(),
        }
    }

    pub fn from_dispatch(e: anyhow::Error) -> Self {
        tracing::error!(error = %e, "Auth event dispatch failed");
        Self::Internal {
            message: "Account provisioning failed".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, "unauthorized", code, message)
            }
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}
