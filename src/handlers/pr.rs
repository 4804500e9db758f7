//! Handler for Bitbucket pull request links.
//!
//! Pull requests are migrated as GitHub issues, so a PR URL rewrites to an
//! issue URL under the mapped number.

use std::{collections::BTreeMap, sync::Arc};

use regex::Regex;

use super::{ChainParts, LinkContext, Rewrite, RewriteReason, Route};
use crate::config::LinkRewriteConfig;

#[derive(Debug)]
pub struct PrLinkHandler {
    pattern: Regex,
    route: Arc<Route>,
    pull_requests: Arc<BTreeMap<u64, u64>>,
    config: Arc<LinkRewriteConfig>,
}

impl PrLinkHandler {
    pub const PRIORITY: u8 = 2;

    /// # Panics
    /// Panics if the PR link pattern fails to compile, which cannot happen
    /// for escaped workspace and repository names.
    #[must_use]
    pub fn new(parts: &ChainParts) -> Self {
        let pattern = Regex::new(&format!(
            r#"^https://bitbucket\.org/{}/{}/pull-requests/(\d+)(?:/[^/\s)"'>]*)?"#,
            regex::escape(&parts.route.bb_workspace),
            regex::escape(&parts.route.bb_repo),
        ))
        .expect("PR link pattern should compile");
        Self {
            pattern,
            route: Arc::clone(&parts.route),
            pull_requests: Arc::clone(&parts.pull_requests),
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
        let bb_num: u64 = caps[1].parse().ok()?;
        let gh_num = *self.pull_requests.get(&bb_num)?;
        let gh_url = format!("{}/issues/{gh_num}", self.route.github_root());
        let text = if context == LinkContext::MarkdownDestination {
            gh_url
        } else {
            let bb = bb_num.to_string();
            let gh = gh_num.to_string();
            let note = self.config.format_note(
                "pr_link",
                &[
                    ("bb_num", bb.as_str()),
                    ("bb_url", url),
                    ("gh_num", gh.as_str()),
                    ("gh_url", gh_url.as_str()),
                ],
            );
            format!("[#{gh_num}]({gh_url}){note}")
        };
        Some(Rewrite::new(url, text, "pr_link", RewriteReason::Mapped))
    }
}
