//! Sri Lankan mobile number validation and normalization.
//!
//! Accepted input forms (spaces and hyphens ignored):
//! - `+94762199100`
//! - `762199100`
//! - `0762199100`
//!
//! The canonical form is the ten-digit local number, `0762199100`.

use once_cell::sync::Lazy;
use regex::Regex;

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s-]").expect("valid regex"));

static MOBILE_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"^\+947\d{8}$").expect("valid regex"),
        Regex::new(r"^7\d{8}$").expect("valid regex"),
        Regex::new(r"^07\d{8}$").expect("valid regex"),
    ]
});

fn strip_separators(mobile: &str) -> String {
    SEPARATORS.replace_all(mobile, "").into_owned()
}

/// Returns `true` if `mobile` is a Sri Lankan mobile number in a supported form.
#[must_use]
pub fn validate_sri_lankan_mobile(mobile: &str) -> bool {
    if mobile.is_empty() {
        return false;
    }
    let cleaned = strip_separators(mobile);
    MOBILE_PATTERNS.iter().any(|p| p.is_match(&cleaned))
}

/// Convert to the `0XXXXXXXXX` form.
///
/// Input that matches no known form is returned with separators removed.
#[must_use]
pub fn normalize_mobile_number(mobile: &str) -> String {
    let cleaned = strip_separators(mobile);
    if let Some(rest) = cleaned.strip_prefix("+94") {
        format!("0{rest}")
    } else if cleaned.len() == 9 && cleaned.starts_with('7') {
        format!("0{cleaned}")
    } else {
        cleaned
    }
}

/// Format for display as `076 219 9100`; other input is returned unchanged.
#[must_use]
pub fn format_mobile_number(mobile: &str) -> String {
    let normalized = normalize_mobile_number(mobile);
    if normalized.len() == 10 && normalized.is_ascii() {
        format!(
            "{} {} {}",
            &normalized[..3],
            &normalized[3..6],
            &normalized[6..]
        )
    } else {
        mobile.to_string()
    }
}
