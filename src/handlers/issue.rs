//! Handler for Bitbucket issue links.

use std::{collections::BTreeMap, sync::Arc};

use regex::Regex;

use super::{ChainParts, LinkContext, Rewrite, RewriteReason, Route};
use crate::config::LinkRewriteConfig;

#[derive(Debug)]
pub struct IssueLinkHandler {
    pattern: Regex,
    route: Arc<Route>,
    issues: Arc<BTreeMap<u64, u64>>,
    config: Arc<LinkRewriteConfig>,
}

impl IssueLinkHandler {
    pub const PRIORITY: u8 = 1;

    /// # Panics
    /// Panics if the issue link pattern fails to compile, which cannot
    /// happen for escaped workspace and repository names.
    #[must_use]
    pub fn new(parts: &ChainParts) -> Self {
        let pattern = Regex::new(&format!(
            r#"^https://bitbucket\.org/{}/{}/issues/(\d+)(?:/[^/\s)"'>]*)?"#,
            regex::escape(&parts.route.bb_workspace),
            regex::escape(&parts.route.bb_repo),
        ))
        .expect("issue link pattern should compile");
        Self {
            pattern,
            route: Arc::clone(&parts.route),
            issues: Arc::clone(&parts.issues),
            config: Arc::clone(&parts.config),
        }
    }

    #[must_use]
    pub fn can_handle(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    /// Rewrite an issue URL whose number is present in the issue mapping.
    /// Unmapped numbers decline so the URL surfaces as unhandled.
    #[must_use]
    pub fn handle(&self, url: &str, context: LinkContext) -> Option<Rewrite> {
        let caps = self.pattern.captures(url)?;
        let bb_num: u64 = caps[1].parse().ok()?;
        let gh_num = *self.issues.get(&bb_num)?;
        let gh_url = format!("{}/issues/{gh_num}", self.route.github_root());
        let text = if context == LinkContext::MarkdownDestination {
            gh_url
        } else {
            let bb = bb_num.to_string();
            let gh = gh_num.to_string();
            let note = self.config.format_note(
                "issue_link",
                &[
                    ("bb_num", bb.as_str()),
                    ("bb_url", url),
                    ("gh_num", gh.as_str()),
                    ("gh_url", gh_url.as_str()),
                ],
            );
            format!("[#{gh_num}]({gh_url}){note}")
        };
        Some(Rewrite::new(url, text, "issue_link", RewriteReason::Mapped))
    }
}
