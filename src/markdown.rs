//! Markdown structure analysis.
//!
//! The rewriter must know where markdown constructs begin and end before it
//! touches anything: replacing the destination of `[text](url)` must yield
//! exactly one construct, never a bracket pair glued onto another, and a
//! URL inside link text must be swapped without disturbing the structure
//! around it. The scanners here find inline links and images (balancing
//! nested `[...]` in the label and nested parens in the destination),
//! reference definitions, escaped bracket sequences, inline code spans, and
//! existing annotation spans. Angle-bracket content that is not an autolink
//! is defensively wrapped in an inline code span so downstream renderers
//! cannot mistake it for HTML.

use std::{ops::Range, sync::LazyLock};

use regex::Regex;

use crate::{
    lazy_regex,
    tokenize::{Token, push_original_token, tokenize_markdown},
};

static EMAIL_RE: LazyLock<Regex> = lazy_regex!(
    r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$",
    "email pattern should compile",
);

static REF_DEF_RE: LazyLock<Regex> = lazy_regex!(
    r"(?m)^[ \t]{0,3}\[([^\]\n]+)\]:[ \t]*(\S+)",
    "reference definition pattern should compile",
);

/// An inline markdown link or image located in a text fragment.
#[derive(Debug, PartialEq, Eq)]
pub struct InlineLink<'a> {
    /// Byte range of the whole construct, `!` included for images.
    pub range: Range<usize>,
    pub is_image: bool,
    /// The label between the brackets, nested brackets included.
    pub label: &'a str,
    /// The destination between the parens.
    pub dest: &'a str,
}

/// A reference definition `[ref]: url` located in a text fragment.
#[derive(Debug, PartialEq, Eq)]
pub struct RefDef<'a> {
    /// Byte range of the whole definition.
    pub range: Range<usize>,
    /// Byte range of the destination within the fragment.
    pub dest_range: Range<usize>,
    pub dest: &'a str,
}

/// Locate structurally complete inline links and images.
///
/// The label scan balances nested brackets, so
/// `[Issue with [nested] brackets](url)` is one construct. Constructs do
/// not span lines; a missing closing paren simply fails to match and the
/// raw text is left for other passes.
#[must_use]
pub fn find_inline_links(text: &str) -> Vec<InlineLink<'_>> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'[' {
            i += 1;
            continue;
        }
        let start = if i > 0 && bytes[i - 1] == b'!' { i - 1 } else { i };
        let mut depth = 1usize;
        let mut j = i + 1;
        let mut label_end = None;
        while j < bytes.len() {
            match bytes[j] {
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        label_end = Some(j);
                        break;
                    }
                }
                b'\n' => break,
                _ => {}
            }
            j += 1;
        }
        let Some(label_end) = label_end else {
            i += 1;
            continue;
        };
        if label_end + 1 >= bytes.len() || bytes[label_end + 1] != b'(' {
            // Reference uses `[text][ref]` land here and stay untouched.
            i = label_end + 1;
            continue;
        }
        let mut pdepth = 1usize;
        let mut k = label_end + 2;
        let mut dest_end = None;
        while k < bytes.len() {
            match bytes[k] {
                b'(' => pdepth += 1,
                b')' => {
                    pdepth -= 1;
                    if pdepth == 0 {
                        dest_end = Some(k);
                        break;
                    }
                }
                b'\n' => break,
                _ => {}
            }
            k += 1;
        }
        let Some(dest_end) = dest_end else {
            i = label_end + 1;
            continue;
        };
        out.push(InlineLink {
            range: start..dest_end + 1,
            is_image: start < i,
            label: &text[i + 1..label_end],
            dest: &text[label_end + 2..dest_end],
        });
        i = dest_end + 1;
    }
    out
}

/// Locate reference definitions.
///
/// `at_line_start` tells the scanner whether offset zero of the fragment
/// begins a line; definitions are only recognised at line starts.
#[must_use]
pub fn find_ref_defs(text: &str, at_line_start: bool) -> Vec<RefDef<'_>> {
    REF_DEF_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if whole.start() == 0 && !at_line_start {
                return None;
            }
            let dest = caps.get(2)?;
            Some(RefDef {
                range: whole.range(),
                dest_range: dest.range(),
                dest: dest.as_str(),
            })
        })
        .collect()
}

/// Byte ranges of `\[`, `\]`, `\(`, `\)` sequences.
///
/// Escaped markdown is passed through byte-for-byte and contributes nothing
/// to link counts; other backslash escapes are skipped over so an escaped
/// backslash cannot masquerade as an escaping one.
#[must_use]
pub fn escaped_marker_spans(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'\\' {
            if matches!(bytes[i + 1], b'[' | b']' | b'(' | b')') {
                out.push(i..i + 2);
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    out
}

/// Byte ranges of annotation spans `*(` … `)*` within single lines.
///
/// Rewritten links carry their provenance in this shape; treating the spans
/// as opaque keeps a second rewrite pass from re-annotating them.
#[must_use]
pub fn annotation_spans(text: &str) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(open) = text[from..].find("*(") {
        let open = from + open;
        let line_end = text[open..]
            .find('\n')
            .map_or(text.len(), |pos| open + pos);
        match text[open + 2..line_end].find(")*") {
            Some(close) => {
                let end = open + 2 + close + 2;
                out.push(open..end);
                from = end;
            }
            None => from = open + 2,
        }
    }
    out
}

/// Byte ranges of single-backtick inline code spans within single lines.
#[must_use]
pub fn inline_code_spans(text: &str) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(open) = text[from..].find('`') {
        let open = from + open;
        let line_end = text[open..]
            .find('\n')
            .map_or(text.len(), |pos| open + pos);
        match text[open + 1..line_end].find('`') {
            Some(close) => {
                let end = open + 1 + close + 1;
                out.push(open..end);
                from = end;
            }
            None => from = open + 1,
        }
    }
    out
}

fn is_autolink(inner: &str) -> bool {
    let lower = inner.to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("mailto:")
        || EMAIL_RE.is_match(inner)
}

fn escape_angle_text(text: &str, out: &mut String) {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'<' {
            let next = bytes[i + 1..]
                .iter()
                .position(|&b| b == b'<')
                .map_or(bytes.len(), |pos| i + 1 + pos);
            out.push_str(&text[i..next]);
            i = next;
            continue;
        }
        // Balance nested angle brackets so `<std::map<K,V>>` is one unit.
        let mut depth = 1usize;
        let mut j = i + 1;
        let mut close = None;
        while j < bytes.len() {
            match bytes[j] {
                b'<' => depth += 1,
                b'>' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(j);
                        break;
                    }
                }
                _ => {}
            }
            j += 1;
        }
        let Some(close) = close else {
            out.push('<');
            i += 1;
            continue;
        };
        let unit = &text[i..=close];
        if is_autolink(&text[i + 1..close]) {
            out.push_str(unit);
        } else {
            out.push('`');
            out.push_str(unit);
            out.push('`');
        }
        i = close + 1;
    }
}

/// Wrap non-URL angle-bracket content in inline code spans.
///
/// Autolinks (`<https://…>`, `<mailto:…>`, bare email addresses) pass
/// through verbatim; everything else between angle brackets reads as HTML
/// to a markdown renderer and is fenced off in backticks. Fenced blocks and
/// existing inline code are never touched, which also makes the
/// transformation idempotent.
#[must_use]
pub fn escape_angle_brackets(text: &str) -> String {
    let trailing_newlines = text.len() - text.trim_end_matches('\n').len();
    let mut out = String::with_capacity(text.len());
    for token in tokenize_markdown(text) {
        match token {
            Token::Text(t) => escape_angle_text(t, &mut out),
            other => push_original_token(&other, &mut out),
        }
    }
    let have = out.len() - out.trim_end_matches('\n').len();
    for _ in have..trailing_newlines {
        out.push('\n');
    }
    out
}
