//! Handler for Bitbucket compare links.
//!
//! Bitbucket separates the two refs with two dots, GitHub with three.

use std::sync::Arc;

use regex::Regex;

use super::{ChainParts, LinkContext, Rewrite, RewriteReason, Route, abbreviate};
use crate::{config::LinkRewriteConfig, encode::encode_url_component};

#[derive(Debug)]
pub struct CompareLinkHandler {
    sha_pattern: Regex,
    branches_pattern: Regex,
    route: Arc<Route>,
    config: Arc<LinkRewriteConfig>,
}

impl CompareLinkHandler {
    pub const PRIORITY: u8 = 5;

    /// # Panics
    /// Panics if the compare link patterns fail to compile, which cannot
    /// happen for escaped workspace and repository names.
    #[must_use]
    pub fn new(parts: &ChainParts) -> Self {
        let workspace = regex::escape(&parts.route.bb_workspace);
        let repo = regex::escape(&parts.route.bb_repo);
        // Legacy SHA-only form.
        let sha_pattern = Regex::new(&format!(
            r"^https://bitbucket\.org/{workspace}/{repo}/compare/([0-9a-f]{{6,40}})\.\.([0-9a-f]{{6,40}})$"
        ))
        .expect("compare link pattern should compile");
        // Newer form taking branch names as well as SHAs.
        let branches_pattern = Regex::new(&format!(
            r"^https://bitbucket\.org/{workspace}/{repo}/branches/compare/([^.]+)\.\.([^/\s)]+)$"
        ))
        .expect("branches-compare link pattern should compile");
        Self {
            sha_pattern,
            branches_pattern,
            route: Arc::clone(&parts.route),
            config: Arc::clone(&parts.config),
        }
    }

    #[must_use]
    pub fn can_handle(&self, url: &str) -> bool {
        self.sha_pattern.is_match(url) || self.branches_pattern.is_match(url)
    }

    #[must_use]
    pub fn handle(&self, url: &str, context: LinkContext) -> Option<Rewrite> {
        let caps = self
            .sha_pattern
            .captures(url)
            .or_else(|| self.branches_pattern.captures(url))?;
        let (first, second) = (&caps[1], &caps[2]);
        let gh_url = format!(
            "{}/compare/{}...{}",
            self.route.github_root(),
            encode_url_component(first, ""),
            encode_url_component(second, ""),
        );
        let text = if context == LinkContext::MarkdownDestination {
            gh_url
        } else {
            let note = self.config.format_note(
                "compare_link",
                &[
                    ("bb_url", url),
                    ("gh_url", gh_url.as_str()),
                    ("ref1", first),
                    ("ref2", second),
                ],
            );
            format!(
                "[compare `{}`...`{}`]({gh_url}){note}",
                abbreviate(first),
                abbreviate(second),
            )
        };
        Some(Rewrite::new(url, text, "compare_link", RewriteReason::Encoded))
    }
}
