//! Locale negotiation from the `accept-language` header
//!
//! Matches q-weighted language tags against the fixed supported set. Exact
//! tag matches win; a bare primary language falls back to the first
//! supported tag with that primary. Anything unusable yields the default.

use crate::core::constants::{DEFAULT_LOCALE, SUPPORTED_LOCALES};

/// Pick the best supported locale for an `accept-language` header value
pub fn negotiate_locale(header: Option<&str>) -> &'static str {
    let header = match header {
        Some(h) if !h.trim().is_empty() => h,
        _ => return DEFAULT_LOCALE,
    };

    let mut candidates: Vec<(String, f32)> = Vec::new();
    for entry in header.split(',') {
        let mut parts = entry.trim().split(';');
        let tag = match parts.next() {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => continue,
        };
        let mut q = 1.0f32;
        for param in parts {
            let param = param.trim();
            if let Some(value) = param.strip_prefix("q=")
                && let Ok(parsed) = value.parse::<f32>()
            {
                q = parsed.clamp(0.0, 1.0);
            }
        }
        if q > 0.0 {
            candidates.push((tag, q));
        }
    }

    // Stable sort keeps header order among equal weights
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    for (tag, _) in &candidates {
        if tag == "*" {
            return DEFAULT_LOCALE;
        }
        if let Some(supported) = match_tag(tag) {
            return supported;
        }
    }

    DEFAULT_LOCALE
}

fn match_tag(tag: &str) -> Option<&'static str> {
    // Exact match, case-insensitive
    for supported in SUPPORTED_LOCALES {
        if supported.eq_ignore_ascii_case(tag) {
            return Some(supported);
        }
    }

    // Primary-language fallback: "tr" or "tr-XX" matches "tr-TR"
    let primary = tag.split('-').next()?;
    for supported in SUPPORTED_LOCALES {
        let supported_primary = supported.split('-').next().unwrap_or(supported);
        if supported_primary.eq_ignore_ascii_case(primary) {
            return Some(supported);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_header_defaults() {
        assert_eq!(negotiate_locale(None), "en-US");
        assert_eq!(negotiate_locale(Some("")), "en-US");
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(negotiate_locale(Some("tr-TR")), "tr-TR");
        assert_eq!(negotiate_locale(Some("en-US")), "en-US");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(negotiate_locale(Some("TR-tr")), "tr-TR");
    }

    #[test]
    fn test_q_weight_ordering() {
        assert_eq!(negotiate_locale(Some("en-US;q=0.5, tr-TR;q=0.9")), "tr-TR");
        assert_eq!(negotiate_locale(Some("tr-TR;q=0.2, en-US;q=0.8")), "en-US");
    }

    #[test]
    fn test_primary_language_fallback() {
        assert_eq!(negotiate_locale(Some("tr")), "tr-TR");
        assert_eq!(negotiate_locale(Some("tr-CY")), "tr-TR");
    }

    #[test]
    fn test_unsupported_falls_through_to_next_candidate() {
        assert_eq!(negotiate_locale(Some("de-DE, tr-TR;q=0.7")), "tr-TR");
    }

    #[test]
    fn test_zero_weight_excluded() {
        assert_eq!(negotiate_locale(Some("tr-TR;q=0, en-US;q=0.1")), "en-US");
    }

    #[test]
    fn test_wildcard_yields_default() {
        assert_eq!(negotiate_locale(Some("*")), "en-US");
    }

    #[test]
    fn test_garbage_yields_default() {
        assert_eq!(negotiate_locale(Some(";;;===,,,")), "en-US");
        assert_eq!(negotiate_locale(Some("xx-YY")), "en-US");
    }
}
