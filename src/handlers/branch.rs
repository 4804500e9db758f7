//! Handler for Bitbucket branch links.
//!
//! Bitbucket exposes branches at both `/branch/{name}` and
//! `/commits/branch/{name}`; GitHub's equivalent browse page is
//! `/tree/{name}` with the branch name percent-encoded, slashes included.

use std::sync::Arc;

use regex::Regex;

use super::{ChainParts, LinkContext, Rewrite, RewriteReason, Route};
use crate::{config::LinkRewriteConfig, encode::encode_url_component};

#[derive(Debug)]
pub struct BranchLinkHandler {
    branch_pattern: Regex,
    commits_pattern: Regex,
    route: Arc<Route>,
    config: Arc<LinkRewriteConfig>,
}

impl BranchLinkHandler {
    pub const PRIORITY: u8 = 4;

    /// # Panics
    /// Panics if the branch link patterns fail to compile, which cannot
    /// happen for escaped workspace and repository names.
    #[must_use]
    pub fn new(parts: &ChainParts) -> Self {
        let workspace = regex::escape(&parts.route.bb_workspace);
        let repo = regex::escape(&parts.route.bb_repo);
        let branch_pattern =
            Regex::new(&format!(r"^https://bitbucket\.org/{workspace}/{repo}/branch/(.+)$"))
                .expect("branch link pattern should compile");
        let commits_pattern = Regex::new(&format!(
            r"^https://bitbucket\.org/{workspace}/{repo}/commits/branch/(.+)$"
        ))
        .expect("commits-branch link pattern should compile");
        Self {
            branch_pattern,
            commits_pattern,
            route: Arc::clone(&parts.route),
            config: Arc::clone(&parts.config),
        }
    }

    #[must_use]
    pub fn can_handle(&self, url: &str) -> bool {
        self.branch_pattern.is_match(url) || self.commits_pattern.is_match(url)
    }

    #[must_use]
    pub fn handle(&self, url: &str, context: LinkContext) -> Option<Rewrite> {
        let caps = self
            .commits_pattern
            .captures(url)
            .or_else(|| self.branch_pattern.captures(url))?;
        let name = &caps[1];
        let encoded = encode_url_component(name, "");
        let gh_url = format!("{}/tree/{encoded}", self.route.github_root());
        let text = if context == LinkContext::MarkdownDestination {
            gh_url
        } else {
            let note = self.config.format_note(
                "branch_link",
                &[("bb_url", url), ("gh_url", gh_url.as_str()), ("branch_name", name)],
            );
            format!("[commits on `{name}`]({gh_url}){note}")
        };
        Some(Rewrite::new(url, text, "branch_link", RewriteReason::Encoded))
    }
}
