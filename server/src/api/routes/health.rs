//! Health check endpoint

use axum::http::StatusCode;

/// Liveness probe: 200 with an empty body
pub async fn health() -> StatusCode {
    StatusCode::OK
}
