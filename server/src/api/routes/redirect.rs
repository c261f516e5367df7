//! Deep-link redirect endpoint
//!
//! Email links and OAuth callbacks land here in a browser; the endpoint
//! bounces them into the mobile app through its registered scheme.

use std::collections::HashMap;

use axum::extract::Query;
use axum::response::Redirect;

use crate::core::constants::APP_DEEP_LINK_SCHEME;

/// Redirect into the app based on the query parameters present
pub async fn redirect(Query(params): Query<HashMap<String, String>>) -> Redirect {
    Redirect::temporary(&redirect_target(&params))
}

/// Compute the deep-link target
///
/// `?token=` goes to the password-reset screen, `?provider=&code=` to the
/// OAuth callback screen, anything else to the app root. Values with
/// characters that are not URL-safe fall back to the app root rather than
/// being forwarded.
fn redirect_target(params: &HashMap<String, String>) -> String {
    let root = format!("{APP_DEEP_LINK_SCHEME}://");

    if let Some(token) = params.get("token") {
        if is_url_safe(token) {
            return format!("{APP_DEEP_LINK_SCHEME}://auth/reset-password?token={token}");
        }
        return root;
    }

    if let (Some(provider), Some(code)) = (params.get("provider"), params.get("code")) {
        if is_url_safe(provider) && is_url_safe(code) {
            return format!("{APP_DEEP_LINK_SCHEME}://auth/callback/{provider}?code={code}");
        }
        return root;
    }

    root
}

fn is_url_safe(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_reset_token_redirect() {
        let target = redirect_target(&params(&[("token", "abc123")]));
        assert_eq!(target, "beacon://auth/reset-password?token=abc123");
    }

    #[test]
    fn test_oauth_callback_redirect() {
        let target = redirect_target(&params(&[("provider", "github"), ("code", "xyz-9")]));
        assert_eq!(target, "beacon://auth/callback/github?code=xyz-9");
    }

    #[test]
    fn test_no_params_goes_to_root() {
        assert_eq!(redirect_target(&params(&[])), "beacon://");
    }

    #[test]
    fn test_unsafe_values_go_to_root() {
        assert_eq!(
            redirect_target(&params(&[("token", "a b?c=1")])),
            "beacon://"
        );
        assert_eq!(
            redirect_target(&params(&[("provider", "git/hub"), ("code", "ok")])),
            "beacon://"
        );
    }

    #[test]
    fn test_provider_without_code_goes_to_root() {
        assert_eq!(
            redirect_target(&params(&[("provider", "github")])),
            "beacon://"
        );
    }
}
