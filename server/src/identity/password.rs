//! Password policy
//!
//! Minimum 8 characters with at least one uppercase letter, one lowercase
//! letter, one digit, and one special character from a fixed set.

use std::sync::OnceLock;

use regex::Regex;

/// Special characters accepted by the policy
const SPECIAL_CHARS: &str = "!@#$%^&*()-_=+{};:,<.>";

fn special_char_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[!@#$%^&*()\-_=+\{\};:,<.>]").expect("valid regex"))
}

/// Check a candidate password against the policy
pub fn is_acceptable(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && special_char_regex().is_match(password)
}

/// Human-readable policy description, surfaced in rejection messages
pub fn policy_description() -> String {
    format!(
        "Password must be at least 8 characters and contain an uppercase letter, a lowercase letter, a digit, and one of {}",
        SPECIAL_CHARS
    )
}
