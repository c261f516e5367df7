//! Request-id sanitation and generation
//!
//! Caller-supplied `x-request-id` values are echoed into responses and
//! stamped on log lines, so they must be cleaned before use: header
//! injection through CR/LF or unbounded values would corrupt both.

use uuid::Uuid;

use crate::core::constants::REQUEST_ID_MAX_LEN;

/// Sanitize a caller-supplied request id.
///
/// Keeps the leading run of printable ASCII and truncates it to
/// [`REQUEST_ID_MAX_LEN`]. Returns `None` when nothing usable remains.
pub fn clean_request_id(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .take_while(|c| c.is_ascii_graphic())
        .take(REQUEST_ID_MAX_LEN)
        .collect();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Generate a fresh request id
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Resolve the request id for an inbound request: sanitized header value
/// when present and usable, otherwise a generated one.
pub fn resolve_request_id(header: Option<&str>) -> String {
    header
        .and_then(clean_request_id)
        .unwrap_or_else(generate_request_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_passthrough() {
        assert_eq!(clean_request_id("abc-123").as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_clean_stops_at_crlf() {
        // Injection attempt: everything from the control character on is dropped
        assert_eq!(
            clean_request_id("abc\r\nx-evil: 1").as_deref(),
            Some("abc")
        );
        assert_eq!(clean_request_id("\r\n"), None);
    }

    #[test]
    fn test_clean_truncates() {
        let long = "a".repeat(REQUEST_ID_MAX_LEN + 50);
        let cleaned = clean_request_id(&long).unwrap();
        assert_eq!(cleaned.len(), REQUEST_ID_MAX_LEN);
    }

    #[test]
    fn test_clean_empty() {
        assert_eq!(clean_request_id(""), None);
        assert_eq!(clean_request_id(" leading-space"), None);
    }

    #[test]
    fn test_resolve_echoes_header() {
        assert_eq!(resolve_request_id(Some("req-1")), "req-1");
    }

    #[test]
    fn test_resolve_generates_when_absent() {
        let id = resolve_request_id(None);
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_resolve_generates_when_unusable() {
        let id = resolve_request_id(Some("\r\n"));
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
