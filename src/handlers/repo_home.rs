//! Handler for bare repository root links.
//!
//! Runs late in the chain so every more specific shape gets first refusal.
//! The default note for repository roots is empty; a plain pointer at the
//! repository does not need provenance clutter.

use std::sync::Arc;

use regex::Regex;

use super::{ChainParts, LinkContext, Rewrite, RewriteReason, Route};
use crate::config::{LinkRewriteConfig, RepoMap};

#[derive(Debug)]
pub struct RepoHomeLinkHandler {
    pattern: Regex,
    route: Arc<Route>,
    repositories: Arc<RepoMap>,
    config: Arc<LinkRewriteConfig>,
}

impl RepoHomeLinkHandler {
    pub const PRIORITY: u8 = 10;

    /// # Panics
    /// Panics if the repository root pattern fails to compile; the pattern
    /// is a fixed literal.
    #[must_use]
    pub fn new(parts: &ChainParts) -> Self {
        let pattern =
            Regex::new(r#"^https://bitbucket\.org/([^/\s)"'>?#]+)/([^/\s)"'>?#]+)/?$"#)
                .expect("repo home pattern should compile");
        Self {
            pattern,
            route: Arc::clone(&parts.route),
            repositories: Arc::clone(&parts.repositories),
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
        let workspace = caps.get(1)?.as_str();
        let repo = caps.get(2)?.as_str();
        if self.route.is_own(workspace, repo) {
            let gh_url = self.route.github_root();
            let text = if context == LinkContext::MarkdownDestination {
                gh_url
            } else {
                let note = self.config.format_note(
                    "repo_home_link",
                    &[
                        ("bb_url", url),
                        ("gh_url", gh_url.as_str()),
                        ("gh_repo", self.route.gh_repo.as_str()),
                    ],
                );
                format!("[repository]({gh_url}){note}")
            };
            return Some(Rewrite::new(url, text, "repo_home_link", RewriteReason::Mapped));
        }
        let (gh_owner, gh_repo) = self.repositories.get_mapped_repository(workspace, repo)?;
        let gh_url = format!("https://github.com/{gh_owner}/{gh_repo}");
        let text = if context == LinkContext::MarkdownDestination {
            gh_url
        } else {
            let note = self.config.format_note(
                "repo_home_link",
                &[
                    ("bb_url", url),
                    ("gh_url", gh_url.as_str()),
                    ("gh_repo", gh_repo.as_str()),
                ],
            );
            format!("[{gh_repo}]({gh_url}){note}")
        };
        Some(Rewrite::new(url, text, "repo_home_link", RewriteReason::CrossRepo))
    }
}
