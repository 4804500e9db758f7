//! Percent-encoding for URL path components.
//!
//! GitHub tree and compare URLs require branch and tag names to be encoded
//! byte-for-byte, including the slashes inside names like
//! `feature/my-branch`. The encoder here mirrors standard URL-component
//! escaping: ASCII alphanumerics and `-`, `_`, `.`, `~` pass through,
//! everything else becomes `%XX`, with non-ASCII characters encoded as
//! their UTF-8 byte sequences.

use std::fmt::Write;

/// Percent-encode `s` for embedding in a GitHub URL path segment.
///
/// Characters listed in `safe` are exempted in addition to the unreserved
/// set. Pass `"/"` when encoding a path whose slashes must stay literal.
///
/// # Examples
///
/// ```
/// use bb2gh::encode_url_component;
///
/// assert_eq!(encode_url_component("feature/my-branch", ""), "feature%2Fmy-branch");
/// assert_eq!(encode_url_component("path/to/file.py", "/"), "path/to/file.py");
/// assert_eq!(encode_url_component("café", ""), "caf%C3%A9");
/// ```
#[must_use]
pub fn encode_url_component(s: &str, safe: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &byte in s.as_bytes() {
        if byte.is_ascii_alphanumeric()
            || matches!(byte, b'-' | b'_' | b'.' | b'~')
            || (byte.is_ascii() && safe.contains(byte as char))
        {
            out.push(byte as char);
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}
