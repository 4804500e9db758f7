//! Boundary-aware URL detection.
//!
//! Finds candidate `http`, `https`, and `ftp` URLs in free text while
//! refusing to match inside constructs that other passes own: a URL that
//! begins immediately after an unescaped `(`, `<`, or quote is the
//! destination half of a markdown link, an autolink, or an HTML attribute
//! value, and is skipped here. The boundary rules are deliberately those of
//! the migration tool's test corpus rather than a formal URL grammar, so
//! adjacent punctuation behaves the way issue prose expects.

use std::{ops::Range, sync::LazyLock};

use regex::Regex;

use crate::lazy_regex;

static URL_RE: LazyLock<Regex> = lazy_regex!(
    r"(?i)\b(?:https?|ftp)://[A-Za-z0-9\-._~/%?=&+:@#]+",
    "URL pattern regex should compile",
);

/// A URL located within a text slice.
#[derive(Debug, PartialEq, Eq)]
pub struct UrlMatch<'a> {
    /// Byte range of the (trimmed) match in the scanned text.
    pub range: Range<usize>,
    /// The matched URL.
    pub url: &'a str,
}

fn preceded_by_odd_backslashes(bytes: &[u8], mut idx: usize) -> bool {
    let mut count = 0;
    while idx > 0 && bytes[idx - 1] == b'\\' {
        idx -= 1;
        count += 1;
    }
    count % 2 == 1
}

/// Trim sentence punctuation that greedy matching swallowed.
///
/// A trailing `.` or `:` terminates a sentence rather than a path, but a
/// dot followed by more path characters (file extensions) is retained
/// because it never ends up trailing.
fn trim_trailing_punctuation(url: &str) -> &str {
    url.trim_end_matches(['.', ':'])
}

/// Locate URLs in `text`, honouring the boundary rules.
///
/// `prev` supplies the character immediately before `text` when the slice
/// is a fragment of a larger document; `None` means the fragment boundary
/// imposes no context.
#[must_use]
pub fn find_urls<'a>(text: &'a str, prev: Option<char>) -> Vec<UrlMatch<'a>> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    for m in URL_RE.find_iter(text) {
        let before = if m.start() == 0 {
            prev
        } else {
            text[..m.start()].chars().next_back()
        };
        if let Some(c) = before {
            let escaped = m.start() > 0
                && preceded_by_odd_backslashes(bytes, m.start() - c.len_utf8());
            if matches!(c, '(' | '<' | '"' | '\'') && !escaped {
                continue;
            }
        }
        let trimmed = trim_trailing_punctuation(m.as_str());
        // A scheme with nothing after "://" is not a URL.
        let host = trimmed.find("://").map_or("", |pos| &trimmed[pos + 3..]);
        if host.is_empty() {
            continue;
        }
        out.push(UrlMatch {
            range: m.start()..m.start() + trimmed.len(),
            url: trimmed,
        });
    }
    out
}

/// Extract the URLs from `text`, deduplicated in first-seen order.
///
/// # Examples
///
/// ```
/// use bb2gh::extract_urls;
///
/// let urls = extract_urls("Visit https://example.com and https://example.com again");
/// assert_eq!(urls, vec!["https://example.com".to_string()]);
/// ```
#[must_use]
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for m in find_urls(text, None) {
        if !seen.iter().any(|u| u == m.url) {
            seen.push(m.url.to_string());
        }
    }
    seen
}
