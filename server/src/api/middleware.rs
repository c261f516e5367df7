//! HTTP middleware (CORS, 404 handler)

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::IntoResponse;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::core::config::IdentityConfig;
use crate::core::constants::{APP_DEEP_LINK_SCHEME, REQUEST_ID_HEADER};

/// Allowed origins configuration
#[derive(Debug, Clone)]
pub struct AllowedOrigins {
    origins: Vec<String>,
}

impl AllowedOrigins {
    /// Assemble allowed origins from the configured domains plus the
    /// mobile app's deep-link scheme
    pub fn new(identity: &IdentityConfig) -> Self {
        let mut origins = vec![
            identity.website_domain.trim_end_matches('/').to_string(),
            identity.api_domain.trim_end_matches('/').to_string(),
        ];
        origins.push(format!("{APP_DEEP_LINK_SCHEME}://"));
        origins.push(format!("{APP_DEEP_LINK_SCHEME}://auth"));
        origins.dedup();

        Self { origins }
    }

    /// Check if an origin is allowed
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o == origin)
    }

    /// Get origins as HeaderValues for CORS
    fn as_header_values(&self) -> Vec<HeaderValue> {
        self.origins.iter().filter_map(|o| o.parse().ok()).collect()
    }
}

/// Create CORS layer
pub fn cors(allowed: &AllowedOrigins) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed.as_header_values()))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::COOKIE,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-language"),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .allow_credentials(true)
}

/// Handle 404 Not Found with logging
pub async fn handle_404(req: Request) -> impl IntoResponse {
    tracing::debug!(method = %req.method(), uri = %req.uri(), "[404]");
    StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_config() -> IdentityConfig {
        IdentityConfig {
            connection_uri: "http://localhost:3567".to_string(),
            api_key: "key".to_string(),
            api_domain: "https://api.example.com".to_string(),
            website_domain: "https://app.example.com/".to_string(),
            app_name: "Beacon".to_string(),
        }
    }

    #[test]
    fn test_configured_domains_allowed() {
        let allowed = AllowedOrigins::new(&identity_config());
        assert!(allowed.is_allowed("https://app.example.com"));
        assert!(allowed.is_allowed("https://api.example.com"));
        assert!(!allowed.is_allowed("https://evil.example.com"));
    }

    #[test]
    fn test_app_scheme_allowed() {
        let allowed = AllowedOrigins::new(&identity_config());
        assert!(allowed.is_allowed("beacon://"));
    }
}
