//! Link rewriting orchestrator.
//!
//! A rewrite call walks the text through a fixed sequence of passes. The
//! order is part of the contract, not a style choice: angle-bracket content
//! is normalised first, markdown constructs claim their destinations before
//! the plain URL scan can see them, and the reference scans run last over
//! whatever prose remains.
//!
//! Rewritten and structurally recognised spans become *locked* segments
//! that later passes skip. Locking is what makes the whole transformation
//! idempotent: a second run finds GitHub URLs (which no handler claims),
//! annotation spans, and code spans, and leaves all of them alone.

use std::{
    collections::BTreeMap,
    mem::take,
    ops::Range,
    sync::{Arc, LazyLock},
};

use rayon::prelude::*;
use regex::Regex;

use crate::{
    config::{LinkRewriteConfig, MigrationConfig, RepoMap, UserMap},
    detect::find_urls,
    handlers::{
        ChainParts, HandlerChain, LinkContext, LinkDetail, MentionHandler, MentionOutcome,
        PrRefHandler, Rewrite, Route, ShortIssueRefHandler,
    },
    lazy_regex,
    markdown::{
        annotation_spans, escape_angle_brackets, escaped_marker_spans, find_inline_links,
        find_ref_defs, inline_code_spans,
    },
    tokenize::is_fence,
};

static BITBUCKET_URL_RE: LazyLock<Regex> = lazy_regex!(
    r"(?i)^https?://(?:www\.)?bitbucket\.org/",
    "bitbucket host pattern should compile",
);

fn is_bitbucket_url(url: &str) -> bool {
    BITBUCKET_URL_RE.is_match(url)
}

/// Construction parameters for [`LinkRewriter`].
#[derive(Debug, Clone, Default)]
pub struct RewriterSettings {
    pub bb_workspace: String,
    pub bb_repo: String,
    pub gh_owner: String,
    pub gh_repo: String,
    pub issues: BTreeMap<u64, u64>,
    pub pull_requests: BTreeMap<u64, u64>,
    pub repositories: BTreeMap<String, String>,
    pub users: BTreeMap<String, String>,
    /// `None` means the migration supplied no template section: rewriting
    /// proceeds, notes are off.
    pub config: Option<LinkRewriteConfig>,
}

impl From<&MigrationConfig> for RewriterSettings {
    fn from(config: &MigrationConfig) -> Self {
        Self {
            bb_workspace: config.bitbucket.workspace.clone(),
            bb_repo: config.bitbucket.repo.clone(),
            gh_owner: config.github.owner.clone(),
            gh_repo: config.github.repo.clone(),
            issues: config.issues.clone(),
            pull_requests: config.pull_requests.clone(),
            repositories: config.repositories.clone(),
            users: config.users.clone(),
            config: Some(config.link_rewriting.clone()),
        }
    }
}

/// Everything one rewrite call reports back.
#[derive(Debug, Clone, Default)]
pub struct RewriteOutcome {
    /// The rewritten text.
    pub text: String,
    /// Spans rewritten by some handler, mapped mentions included.
    pub links_found: usize,
    /// Bitbucket URLs the handler chain declined; left verbatim in `text`.
    pub unhandled_links: Vec<String>,
    /// Audit record per rewritten link.
    pub details: Vec<LinkDetail>,
    pub mentions_mapped: usize,
    pub mentions_unmapped: usize,
    pub unmapped_mentions: Vec<String>,
}

impl RewriteOutcome {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }
}

/// Working representation of partially rewritten text.
#[derive(Debug)]
enum Seg {
    /// Still eligible for later passes.
    Text(String),
    /// Rewritten or structurally recognised; later passes skip it.
    Locked(String),
}

impl Seg {
    fn content(&self) -> &str {
        match self {
            Self::Text(s) | Self::Locked(s) => s,
        }
    }
}

/// Lock `ranges` (sorted, non-overlapping) of `text` verbatim.
fn lock_ranges(text: &str, ranges: &[Range<usize>]) -> Vec<Seg> {
    let mut segs = Vec::new();
    let mut cursor = 0;
    for range in ranges {
        if range.start > cursor {
            segs.push(Seg::Text(text[cursor..range.start].to_string()));
        }
        segs.push(Seg::Locked(text[range.clone()].to_string()));
        cursor = range.end;
    }
    if cursor < text.len() {
        segs.push(Seg::Text(text[cursor..].to_string()));
    }
    segs
}

/// Replace `repls` (sorted, non-overlapping) with locked content, keeping
/// the rest as text.
fn splice(text: &str, repls: Vec<(Range<usize>, String)>) -> Vec<Seg> {
    let mut segs = Vec::new();
    let mut cursor = 0;
    for (range, replacement) in repls {
        if range.start > cursor {
            segs.push(Seg::Text(text[cursor..range.start].to_string()));
        }
        segs.push(Seg::Locked(replacement));
        cursor = range.end;
    }
    if cursor < text.len() {
        segs.push(Seg::Text(text[cursor..].to_string()));
    }
    segs
}

/// Run one pass over the text segments. The callback receives each text
/// segment together with the rendered content of whatever precedes it, for
/// boundary decisions at segment edges.
fn transform_text_segs<F>(segs: Vec<Seg>, mut f: F) -> Vec<Seg>
where
    F: FnMut(&str, Option<&str>) -> Vec<Seg>,
{
    let mut out: Vec<Seg> = Vec::new();
    for seg in segs {
        match seg {
            Seg::Locked(s) => out.push(Seg::Locked(s)),
            Seg::Text(s) => {
                let replaced = {
                    let prev = out.last().map(Seg::content);
                    f(&s, prev)
                };
                out.extend(replaced);
            }
        }
    }
    out
}

/// Split fenced code blocks into locked segments.
fn lock_fences(text: &str) -> Vec<Seg> {
    let mut segs = Vec::new();
    let mut buf = String::new();
    let mut fenced = String::new();
    let mut in_fence = false;
    for line in text.split_inclusive('\n') {
        if is_fence(line.trim_end_matches('\n')) {
            if in_fence {
                fenced.push_str(line);
                segs.push(Seg::Locked(take(&mut fenced)));
                in_fence = false;
            } else {
                if !buf.is_empty() {
                    segs.push(Seg::Text(take(&mut buf)));
                }
                fenced.push_str(line);
                in_fence = true;
            }
        } else if in_fence {
            fenced.push_str(line);
        } else {
            buf.push_str(line);
        }
    }
    if !fenced.is_empty() {
        segs.push(Seg::Locked(fenced));
    }
    if !buf.is_empty() {
        segs.push(Seg::Text(buf));
    }
    segs
}

fn last_char(prev: Option<&str>) -> Option<char> {
    prev.and_then(|s| s.chars().next_back())
}

/// Boundary character for URL detection. An escaped `(`, `<`, or quote is
/// literal text and does not open a construct, so it imposes no boundary.
fn url_boundary_char(prev: Option<&str>) -> Option<char> {
    let s = prev?;
    let c = s.chars().next_back()?;
    if matches!(c, '(' | '<' | '"' | '\'') {
        let before = &s[..s.len() - c.len_utf8()];
        let backslashes = before.chars().rev().take_while(|&b| b == '\\').count();
        if backslashes % 2 == 1 {
            return None;
        }
    }
    Some(c)
}

fn at_line_start(prev: Option<&str>) -> bool {
    prev.is_none_or(|s| s.ends_with('\n'))
}

/// Rewrites Bitbucket references in one text blob at a time.
///
/// Construction wires the handler chain and the reference scanners to the
/// read-only mapping tables; every rewrite call accumulates its own counts,
/// so one rewriter can serve many bodies concurrently.
pub struct LinkRewriter {
    chain: HandlerChain,
    short_issue: ShortIssueRefHandler,
    pr_ref: PrRefHandler,
    mention: MentionHandler,
    config: Arc<LinkRewriteConfig>,
}

impl LinkRewriter {
    #[must_use]
    pub fn new(settings: RewriterSettings) -> Self {
        let route = Arc::new(Route {
            bb_workspace: settings.bb_workspace,
            bb_repo: settings.bb_repo,
            gh_owner: settings.gh_owner,
            gh_repo: settings.gh_repo,
        });
        let config = Arc::new(settings.config.unwrap_or_else(LinkRewriteConfig::without_notes));
        let parts = ChainParts {
            repositories: Arc::new(RepoMap::new(settings.repositories, route.gh_owner.clone())),
            route: Arc::clone(&route),
            config: Arc::clone(&config),
            issues: Arc::new(settings.issues),
            pull_requests: Arc::new(settings.pull_requests),
        };
        let chain = HandlerChain::new(&parts);
        let short_issue = ShortIssueRefHandler::new(
            Arc::clone(&route),
            Arc::clone(&parts.issues),
            Arc::clone(&config),
        );
        let pr_ref = PrRefHandler::new(
            Arc::clone(&route),
            Arc::clone(&parts.pull_requests),
            Arc::clone(&config),
        );
        let mention = MentionHandler::new(Arc::new(UserMap::new(settings.users)), Arc::clone(&config));
        Self {
            chain,
            short_issue,
            pr_ref,
            mention,
            config,
        }
    }

    /// Rewrite every Bitbucket reference in `text`.
    #[must_use]
    pub fn rewrite_links(&self, text: &str) -> RewriteOutcome {
        if text.is_empty() || !self.config.enabled {
            return RewriteOutcome::unchanged(text);
        }
        let mut outcome = RewriteOutcome::default();
        let escaped = escape_angle_brackets(text);

        let mut segs = lock_fences(&escaped);
        segs = transform_text_segs(segs, |t, _| lock_ranges(t, &escaped_marker_spans(t)));
        segs = transform_text_segs(segs, |t, _| lock_ranges(t, &annotation_spans(t)));
        if self.config.enable_markdown_awareness {
            segs = transform_text_segs(segs, |t, prev| {
                self.rewrite_ref_defs(t, at_line_start(prev), &mut outcome)
            });
            segs = transform_text_segs(segs, |t, _| self.rewrite_inline_links(t, &mut outcome));
        }
        segs = transform_text_segs(segs, |t, _| lock_ranges(t, &inline_code_spans(t)));
        segs = transform_text_segs(segs, |t, prev| {
            self.rewrite_plain_urls(t, url_boundary_char(prev), &mut outcome)
        });
        segs = transform_text_segs(segs, |t, prev| {
            let finds = self.short_issue.find(t, last_char(prev));
            apply_rewrites(t, finds, &mut outcome)
        });
        segs = transform_text_segs(segs, |t, _| {
            apply_rewrites(t, self.pr_ref.find(t), &mut outcome)
        });
        segs = transform_text_segs(segs, |t, prev| {
            self.rewrite_mentions(t, last_char(prev), &mut outcome)
        });

        outcome.text = segs.iter().map(Seg::content).collect();
        outcome
    }

    /// Rewrite a batch of bodies in parallel, preserving order.
    #[must_use]
    pub fn rewrite_all(&self, bodies: &[String]) -> Vec<RewriteOutcome> {
        bodies.par_iter().map(|body| self.rewrite_links(body)).collect()
    }

    fn rewrite_ref_defs(
        &self,
        text: &str,
        at_start: bool,
        outcome: &mut RewriteOutcome,
    ) -> Vec<Seg> {
        let mut repls = Vec::new();
        for def in find_ref_defs(text, at_start) {
            let replacement = match self.chain.dispatch(def.dest, LinkContext::MarkdownDestination)
            {
                Some(rewrite) => {
                    outcome.links_found += 1;
                    let Rewrite { text: new_dest, detail } = rewrite;
                    outcome.details.push(detail);
                    format!("{}{new_dest}", &text[def.range.start..def.dest_range.start])
                }
                None => {
                    if is_bitbucket_url(def.dest) {
                        outcome.unhandled_links.push(def.dest.to_string());
                    }
                    text[def.range.clone()].to_string()
                }
            };
            repls.push((def.range, replacement));
        }
        splice(text, repls)
    }

    fn rewrite_inline_links(&self, text: &str, outcome: &mut RewriteOutcome) -> Vec<Seg> {
        let mut repls = Vec::new();
        for link in find_inline_links(text) {
            let mut changed = false;
            let new_dest = match self.chain.dispatch(link.dest, LinkContext::MarkdownDestination) {
                Some(rewrite) => {
                    changed = true;
                    outcome.links_found += 1;
                    let Rewrite { text: dest, detail } = rewrite;
                    outcome.details.push(detail);
                    dest
                }
                None => {
                    if is_bitbucket_url(link.dest) {
                        outcome.unhandled_links.push(link.dest.to_string());
                    }
                    link.dest.to_string()
                }
            };
            let new_label = self.rewrite_label_urls(link.label, outcome, &mut changed);
            // The whole construct becomes one new construct; a rewrite
            // never concatenates a second bracket pair onto the first.
            let replacement = if changed {
                let bang = if link.is_image { "!" } else { "" };
                format!("{bang}[{new_label}]({new_dest})")
            } else {
                text[link.range.clone()].to_string()
            };
            repls.push((link.range, replacement));
        }
        splice(text, repls)
    }

    /// Swap URLs that sit inside link text for their bare GitHub
    /// equivalents, leaving the enclosing structure alone.
    fn rewrite_label_urls(
        &self,
        label: &str,
        outcome: &mut RewriteOutcome,
        changed: &mut bool,
    ) -> String {
        let mut out = String::with_capacity(label.len());
        let mut cursor = 0;
        for m in find_urls(label, None) {
            match self.chain.dispatch(m.url, LinkContext::MarkdownDestination) {
                Some(rewrite) => {
                    *changed = true;
                    outcome.links_found += 1;
                    let Rewrite { text, detail } = rewrite;
                    outcome.details.push(detail);
                    out.push_str(&label[cursor..m.range.start]);
                    out.push_str(&text);
                    cursor = m.range.end;
                }
                None => {
                    if is_bitbucket_url(m.url) {
                        outcome.unhandled_links.push(m.url.to_string());
                    }
                }
            }
        }
        out.push_str(&label[cursor..]);
        out
    }

    fn rewrite_plain_urls(
        &self,
        text: &str,
        prev: Option<char>,
        outcome: &mut RewriteOutcome,
    ) -> Vec<Seg> {
        let mut repls = Vec::new();
        for m in find_urls(text, prev) {
            match self.chain.dispatch(m.url, LinkContext::Plain) {
                Some(rewrite) => {
                    outcome.links_found += 1;
                    let Rewrite { text: replacement, detail } = rewrite;
                    outcome.details.push(detail);
                    repls.push((m.range, replacement));
                }
                None => {
                    if is_bitbucket_url(m.url) {
                        outcome.unhandled_links.push(m.url.to_string());
                    }
                    // Locked either way so the reference scans cannot fire
                    // inside a query string.
                    repls.push((m.range.clone(), m.url.to_string()));
                }
            }
        }
        splice(text, repls)
    }

    fn rewrite_mentions(
        &self,
        text: &str,
        prev: Option<char>,
        outcome: &mut RewriteOutcome,
    ) -> Vec<Seg> {
        let mut repls = Vec::new();
        for (range, found) in self.mention.find(text, prev) {
            match found {
                MentionOutcome::Mapped(rewrite) => {
                    outcome.links_found += 1;
                    outcome.mentions_mapped += 1;
                    let Rewrite { text: replacement, detail } = rewrite;
                    outcome.details.push(detail);
                    repls.push((range, replacement));
                }
                MentionOutcome::Unmapped(identifier) => {
                    outcome.mentions_unmapped += 1;
                    outcome.unmapped_mentions.push(identifier);
                }
            }
        }
        splice(text, repls)
    }
}

fn apply_rewrites(
    text: &str,
    finds: Vec<(Range<usize>, Rewrite)>,
    outcome: &mut RewriteOutcome,
) -> Vec<Seg> {
    let mut repls = Vec::with_capacity(finds.len());
    for (range, rewrite) in finds {
        outcome.links_found += 1;
        let Rewrite { text: replacement, detail } = rewrite;
        outcome.details.push(detail);
        repls.push((range, replacement));
    }
    splice(text, repls)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> LinkRewriter {
        LinkRewriter::new(RewriterSettings {
            bb_workspace: "workspace".to_string(),
            bb_repo: "repo".to_string(),
            gh_owner: "owner".to_string(),
            gh_repo: "repo".to_string(),
            issues: BTreeMap::from([(123, 456)]),
            pull_requests: BTreeMap::from([(45, 200)]),
            config: Some(LinkRewriteConfig::default()),
            ..RewriterSettings::default()
        })
    }

    #[test]
    fn empty_text_is_unchanged() {
        let outcome = rewriter().rewrite_links("");
        assert_eq!(outcome.text, "");
        assert_eq!(outcome.links_found, 0);
    }

    #[test]
    fn disabled_config_passes_text_through() {
        let rewriter = LinkRewriter::new(RewriterSettings {
            bb_workspace: "workspace".to_string(),
            bb_repo: "repo".to_string(),
            gh_owner: "owner".to_string(),
            gh_repo: "repo".to_string(),
            issues: BTreeMap::from([(123, 456)]),
            config: Some(LinkRewriteConfig {
                enabled: false,
                ..LinkRewriteConfig::default()
            }),
            ..RewriterSettings::default()
        });
        let text = "https://bitbucket.org/workspace/repo/issues/123";
        let outcome = rewriter.rewrite_links(text);
        assert_eq!(outcome.text, text);
        assert_eq!(outcome.links_found, 0);
    }

    #[test]
    fn fenced_blocks_are_never_rewritten() {
        let text = "```\nhttps://bitbucket.org/workspace/repo/issues/123\n```\n";
        let outcome = rewriter().rewrite_links(text);
        assert_eq!(outcome.text, text);
        assert_eq!(outcome.links_found, 0);
    }

    #[test]
    fn inline_code_is_never_rewritten() {
        let text = "see `https://bitbucket.org/workspace/repo/issues/123` there";
        let outcome = rewriter().rewrite_links(text);
        assert_eq!(outcome.text, text);
        assert_eq!(outcome.links_found, 0);
    }

    #[test]
    fn plain_issue_url_gets_link_and_note() {
        let outcome =
            rewriter().rewrite_links("see https://bitbucket.org/workspace/repo/issues/123 now");
        assert!(outcome.text.contains("[#456](https://github.com/owner/repo/issues/456)"));
        assert!(outcome.text.contains("*(was [BB #123]"));
        assert_eq!(outcome.links_found, 1);
    }

    #[test]
    fn non_bitbucket_urls_are_silently_kept() {
        let outcome = rewriter().rewrite_links("Check out https://google.com");
        assert_eq!(outcome.text, "Check out https://google.com");
        assert_eq!(outcome.links_found, 0);
        assert!(outcome.unhandled_links.is_empty());
    }

    #[test]
    fn unhandled_bitbucket_urls_are_reported() {
        let outcome =
            rewriter().rewrite_links("see https://bitbucket.org/workspace/repo/wiki/Home");
        assert_eq!(outcome.links_found, 0);
        assert_eq!(
            outcome.unhandled_links,
            vec!["https://bitbucket.org/workspace/repo/wiki/Home".to_string()]
        );
        assert!(outcome.text.contains("https://bitbucket.org/workspace/repo/wiki/Home"));
    }
}
