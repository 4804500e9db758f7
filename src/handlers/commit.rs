//! Handler for Bitbucket commit links.

use std::sync::Arc;

use regex::Regex;

use super::{ChainParts, LinkContext, Rewrite, RewriteReason, Route, abbreviate};
use crate::config::LinkRewriteConfig;

#[derive(Debug)]
pub struct CommitLinkHandler {
    pattern: Regex,
    route: Arc<Route>,
    config: Arc<LinkRewriteConfig>,
}

impl CommitLinkHandler {
    pub const PRIORITY: u8 = 3;

    /// # Panics
    /// Panics if the commit link pattern fails to compile, which cannot
    /// happen for escaped workspace and repository names.
    #[must_use]
    pub fn new(parts: &ChainParts) -> Self {
        let pattern = Regex::new(&format!(
            r"^https://bitbucket\.org/{}/{}/commits/([0-9a-f]{{7,40}})",
            regex::escape(&parts.route.bb_workspace),
            regex::escape(&parts.route.bb_repo),
        ))
        .expect("commit link pattern should compile");
        Self {
            pattern,
            route: Arc::clone(&parts.route),
            config: Arc::clone(&parts.config),
        }
    }

    #[must_use]
    pub fn can_handle(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    #[must_use]
    pub fn handle(&self, url: &str, context: LinkContext) -> Option<Rewrite> {
        let caps = self.pattern.captures(url)?;
        let sha = &caps[1];
        let gh_url = format!("{}/commit/{sha}", self.route.github_root());
        let text = if context == LinkContext::MarkdownDestination {
            gh_url
        } else {
            let note = self.config.format_note(
                "commit_link",
                &[("bb_url", url), ("gh_url", gh_url.as_str()), ("commit_sha", sha)],
            );
            format!("[`{}`]({gh_url}){note}", abbreviate(sha))
        };
        Some(Rewrite::new(url, text, "commit_link", RewriteReason::Mapped))
    }
}
