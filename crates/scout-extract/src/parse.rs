//! Text helpers for values scraped from profile pages: abbreviated counts,
//! contact emails, and handles embedded in URLs.

use std::sync::LazyLock;

use regex::Regex;
use scout_core::Platform;

static HUMAN_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)\s*([kmb])?\b").expect("valid regex")
});
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid regex")
});
static EMAIL_EXACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("valid regex")
});
static INSTAGRAM_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)instagram\.com/@?([^/?#]+)").expect("valid regex")
});
static LINKEDIN_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)linkedin\.com/in/([^/?#]+)").expect("valid regex")
});
static INSTAGRAM_HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._]{1,30}$").expect("valid regex"));
static LINKEDIN_HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]{3,100}$").expect("valid regex"));

/// Parses abbreviated counts as shown on profile pages.
///
/// `"1.2M"` → 1 200 000, `"5.4k"` → 5 400, `"1,234"` → 1 234. Trailing words
/// (`"12.5K followers"`) are ignored. Returns `None` for anything without a
/// leading number.
#[must_use]
pub fn parse_human_number(text: &str) -> Option<i64> {
    let cleaned = text.replace(',', "").trim().to_ascii_lowercase();
    let caps = HUMAN_NUMBER_RE.captures(&cleaned)?;
    let number: f64 = caps.get(1)?.as_str().parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str()) {
        Some("k") => 1_000.0,
        Some("m") => 1_000_000.0,
        Some("b") => 1_000_000_000.0,
        _ => 1.0,
    };

    let value = (number * multiplier).round();
    if !value.is_finite() || value > i64::MAX as f64 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(value as i64)
}

/// First email address found in free text such as a bio.
#[must_use]
pub fn extract_email(text: &str) -> Option<String> {
    EMAIL_RE.find(text).map(|m| m.as_str().to_string())
}

/// Whether `candidate` is a single well-formed email address.
#[must_use]
pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_EXACT_RE.is_match(candidate.trim())
}

/// Extracts a handle from a profile URL, an `@handle`, or a bare handle.
///
/// URLs for the other platform are rejected.
#[must_use]
pub fn parse_handle(platform: Platform, url_or_handle: &str) -> Option<String> {
    let input = url_or_handle.trim();
    if input.is_empty() {
        return None;
    }

    let (url_re, handle_re) = match platform {
        Platform::Instagram => (&*INSTAGRAM_URL_RE, &*INSTAGRAM_HANDLE_RE),
        Platform::Linkedin => (&*LINKEDIN_URL_RE, &*LINKEDIN_HANDLE_RE),
    };

    let handle = if input.contains("://") || input.contains(".com/") {
        url_re.captures(input)?.get(1)?.as_str()
    } else {
        input.trim_start_matches('@')
    };

    handle_re.is_match(handle).then(|| handle.to_string())
}
