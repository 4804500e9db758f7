//! Short references and user mentions in prose.
//!
//! These scanners work on plain text rather than URLs: `#123` only fires
//! when the number is a known key in the issue mapping (an unfamiliar
//! number is just prose), `PR #45` resolves through the pull request
//! mapping, and `@name` resolves through the user map. The scanners report
//! match ranges so the orchestrator can splice rewrites into the
//! surrounding text without touching anything else.

use std::{
    collections::BTreeMap,
    ops::Range,
    sync::{Arc, LazyLock},
};

use regex::Regex;

use super::{Rewrite, RewriteReason, Route};
use crate::{config::{LinkRewriteConfig, UserMap}, lazy_regex};

static SHORT_REF_RE: LazyLock<Regex> =
    lazy_regex!(r"#(\d+)", "short issue reference pattern should compile");

static PR_REF_RE: LazyLock<Regex> = lazy_regex!(
    r"(?i)(?:PR|pull request)\s*#(\d+)",
    "PR reference pattern should compile",
);

static MENTION_RE: LazyLock<Regex> = lazy_regex!(
    r"@(\{[^}\n]+\}|[A-Za-z0-9_][A-Za-z0-9_-]*)",
    "mention pattern should compile",
);

fn char_before(text: &str, index: usize, prev: Option<char>) -> Option<char> {
    if index == 0 {
        prev
    } else {
        text[..index].chars().next_back()
    }
}

/// Rewrites bare `#123` references through the issue mapping.
#[derive(Debug)]
pub struct ShortIssueRefHandler {
    route: Arc<Route>,
    issues: Arc<BTreeMap<u64, u64>>,
    config: Arc<LinkRewriteConfig>,
}

impl ShortIssueRefHandler {
    pub const PRIORITY: u8 = 20;

    #[must_use]
    pub fn new(
        route: Arc<Route>,
        issues: Arc<BTreeMap<u64, u64>>,
        config: Arc<LinkRewriteConfig>,
    ) -> Self {
        Self { route, issues, config }
    }

    /// Locate mapped short references in `text`. `prev` is the character
    /// immediately before the fragment, if any.
    #[must_use]
    pub fn find(&self, text: &str, prev: Option<char>) -> Vec<(Range<usize>, Rewrite)> {
        let mut out = Vec::new();
        for caps in SHORT_REF_RE.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            // Not inside an existing `[#n]` link, not inside a note.
            if char_before(text, whole.start(), prev) == Some('[')
                || text[..whole.start()].ends_with("BB ")
                || text[whole.end()..].starts_with(']')
            {
                continue;
            }
            let Ok(bb_num) = caps[1].parse::<u64>() else { continue };
            let Some(&gh_num) = self.issues.get(&bb_num) else { continue };
            let gh_url = format!("{}/issues/{gh_num}", self.route.github_root());
            let bb = bb_num.to_string();
            let gh = gh_num.to_string();
            let note = self.config.format_note(
                "short_issue_ref",
                &[("bb_num", bb.as_str()), ("gh_num", gh.as_str()), ("gh_url", gh_url.as_str())],
            );
            let rewritten = format!("[#{gh_num}]({gh_url}){note}");
            out.push((
                whole.range(),
                Rewrite::new(whole.as_str(), rewritten, "short_issue_ref", RewriteReason::Mapped),
            ));
        }
        out
    }
}

/// Rewrites `PR #45` / `pull request #45` through the PR mapping.
#[derive(Debug)]
pub struct PrRefHandler {
    route: Arc<Route>,
    pull_requests: Arc<BTreeMap<u64, u64>>,
    config: Arc<LinkRewriteConfig>,
}

impl PrRefHandler {
    pub const PRIORITY: u8 = 21;

    #[must_use]
    pub fn new(
        route: Arc<Route>,
        pull_requests: Arc<BTreeMap<u64, u64>>,
        config: Arc<LinkRewriteConfig>,
    ) -> Self {
        Self { route, pull_requests, config }
    }

    #[must_use]
    pub fn find(&self, text: &str) -> Vec<(Range<usize>, Rewrite)> {
        let mut out = Vec::new();
        for caps in PR_REF_RE.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let Ok(bb_num) = caps[1].parse::<u64>() else { continue };
            let Some(&gh_num) = self.pull_requests.get(&bb_num) else { continue };
            let gh_url = format!("{}/issues/{gh_num}", self.route.github_root());
            let bb = bb_num.to_string();
            let gh = gh_num.to_string();
            let note = self.config.format_note(
                "pr_ref",
                &[("bb_num", bb.as_str()), ("gh_num", gh.as_str()), ("gh_url", gh_url.as_str())],
            );
            let rewritten = format!("[#{gh_num}]({gh_url}){note}");
            out.push((
                whole.range(),
                Rewrite::new(whole.as_str(), rewritten, "pr_ref", RewriteReason::Mapped),
            ));
        }
        out
    }
}

/// Result of examining one `@mention`.
#[derive(Debug)]
pub enum MentionOutcome {
    /// The identifier resolved to a GitHub login.
    Mapped(Rewrite),
    /// No mapping; the mention stays verbatim and is tallied.
    Unmapped(String),
}

/// Resolves `@name` and `@{display name}` mentions through the user map.
#[derive(Debug)]
pub struct MentionHandler {
    users: Arc<UserMap>,
    config: Arc<LinkRewriteConfig>,
}

impl MentionHandler {
    pub const PRIORITY: u8 = 22;

    #[must_use]
    pub fn new(users: Arc<UserMap>, config: Arc<LinkRewriteConfig>) -> Self {
        Self { users, config }
    }

    #[must_use]
    pub fn find(&self, text: &str, prev: Option<char>) -> Vec<(Range<usize>, MentionOutcome)> {
        let mut out = Vec::new();
        for caps in MENTION_RE.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            // An alphanumeric (or dot) lead-in means an email address or a
            // word containing `@`, not a mention.
            if char_before(text, whole.start(), prev)
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
            {
                continue;
            }
            let raw = &caps[1];
            let identifier = raw
                .strip_prefix('{')
                .and_then(|inner| inner.strip_suffix('}'))
                .unwrap_or(raw);
            let outcome = match self.users.map_mention(identifier) {
                Some(login) => {
                    let note = self.config.format_note(
                        "mention",
                        &[("bb_user", identifier), ("gh_user", login)],
                    );
                    MentionOutcome::Mapped(Rewrite::new(
                        whole.as_str(),
                        format!("@{login}{note}"),
                        "mention",
                        RewriteReason::Mapped,
                    ))
                }
                None => MentionOutcome::Unmapped(identifier.to_string()),
            };
            out.push((whole.range(), outcome));
        }
        out
    }
}
