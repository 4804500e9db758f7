//! Markdown tokenization for code-aware rewriting.
//!
//! Link rewriting must leave fenced blocks and inline code spans exactly as
//! written: a Bitbucket URL quoted inside backticks is documentation, not a
//! link to migrate, and a rewritten `` `<std::vector<int>>` `` span must not
//! be wrapped a second time on a rerun. The tokenizer splits input into
//! fence, code, and text tokens so transformation passes can operate on the
//! text tokens alone.

use std::sync::LazyLock;

use regex::Regex;

use crate::lazy_regex;

static FENCE_RE: LazyLock<Regex> =
    lazy_regex!(r"^\s*(```|~~~).*", "fence pattern regex should compile");

/// Markdown token emitted by [`tokenize_markdown`].
#[derive(Debug, PartialEq)]
pub enum Token<'a> {
    /// Line within a fenced code block, including the fence itself.
    Fence(&'a str),
    /// Inline code span without surrounding backticks.
    Code(&'a str),
    /// Plain text outside code regions.
    Text(&'a str),
    /// Line break separating tokens.
    Newline,
}

/// Append a token to an output buffer without modification.
///
/// Reconstructs the token's original markdown text so passes can forward
/// tokens they do not transform.
#[inline]
pub fn push_original_token(token: &Token<'_>, out: &mut String) {
    match token {
        Token::Text(t) => out.push_str(t),
        Token::Code(c) => {
            out.push('`');
            out.push_str(c);
            out.push('`');
        }
        Token::Fence(f) => out.push_str(f),
        Token::Newline => out.push('\n'),
    }
}

/// Split the input into [`Token`]s by line, tracking fence state and
/// single-backtick inline code spans.
#[must_use]
pub fn tokenize_markdown(input: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut in_fence = false;
    for line in input.split_inclusive('\n') {
        let trimmed = line.trim_end_matches('\n');
        if FENCE_RE.is_match(trimmed) {
            out.push(Token::Fence(trimmed));
            out.push(Token::Newline);
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            out.push(Token::Fence(trimmed));
            out.push(Token::Newline);
            continue;
        }
        let mut rest = trimmed;
        while let Some(pos) = rest.find('`') {
            if pos > 0 {
                out.push(Token::Text(&rest[..pos]));
            }
            if let Some(end) = rest[pos + 1..].find('`') {
                out.push(Token::Code(&rest[pos + 1..pos + 1 + end]));
                rest = &rest[pos + end + 2..];
            } else {
                out.push(Token::Text(&rest[pos..]));
                rest = "";
                break;
            }
        }
        if !rest.is_empty() {
            out.push(Token::Text(rest));
        }
        out.push(Token::Newline);
    }
    out.pop();
    out
}

/// Whether `line` opens or closes a fenced code block.
#[must_use]
pub fn is_fence(line: &str) -> bool {
    FENCE_RE.is_match(line)
}
