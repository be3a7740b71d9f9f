//! String helpers for log output and the email digest.
//!
//! All truncation here counts `char`s, never bytes, so multi-byte keywords
//! and post bodies (Korean, emoji) are never split mid-character.

/// Marker appended to content previews that were cut short.
pub const TRUNCATION_MARKER: &str = "...";

/// Truncate a string for logging purposes.
///
/// Strings longer than `max` characters are cut and suffixed with an
/// ellipsis and the number of bytes dropped.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Shorten `s` to its first `max` characters followed by [`TRUNCATION_MARKER`].
///
/// Strings of `max` characters or fewer are returned unchanged, without a
/// marker.
pub fn preview(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}{}", &s[..cut], TRUNCATION_MARKER),
    }
}

/// Render a secret for startup logs: first few characters plus its length.
pub fn redact(secret: &str) -> String {
    if secret.is_empty() {
        return "<not set>".to_string();
    }
    let shown: String = secret.chars().take(3).collect();
    format!("{}...({} chars)", shown, secret.chars().count())
}
