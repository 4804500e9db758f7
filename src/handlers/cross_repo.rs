//! Handler for links into other Bitbucket repositories, plus `src`/`raw`
//! file links of the repository being migrated.
//!
//! Issue, PR, and commit URLs of the migrating repository are owned by the
//! dedicated handlers earlier in the chain; this handler declines them so
//! an unmapped number still surfaces as unhandled rather than being
//! rewritten to a guessed target.

use std::sync::Arc;

use regex::Regex;

use super::{ChainParts, LinkContext, Rewrite, RewriteReason, Route, abbreviate};
use crate::{
    config::{LinkRewriteConfig, RepoMap},
    encode::encode_url_component,
};

fn is_commit_sha(candidate: &str) -> bool {
    (7..=40).contains(&candidate.len())
        && candidate
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

#[derive(Debug)]
pub struct CrossRepoLinkHandler {
    pattern: Regex,
    route: Arc<Route>,
    repositories: Arc<RepoMap>,
    config: Arc<LinkRewriteConfig>,
}

impl CrossRepoLinkHandler {
    pub const PRIORITY: u8 = 6;

    /// # Panics
    /// Panics if the cross-repository pattern fails to compile; the pattern
    /// is a fixed literal.
    #[must_use]
    pub fn new(parts: &ChainParts) -> Self {
        let pattern = Regex::new(
            r#"^https://bitbucket\.org/([^/]+)/([^/]+)/(issues|pull-requests|commits|src|raw)(/[^\s)"'>]+)"#,
        )
        .expect("cross-repo link pattern should compile");
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
        let resource = caps.get(3)?.as_str();
        let path = &caps.get(4)?.as_str()[1..];
        let own = self.route.is_own(workspace, repo);
        let (gh_owner, gh_repo) = if own {
            (self.route.gh_owner.clone(), self.route.gh_repo.clone())
        } else {
            self.repositories.get_mapped_repository(workspace, repo)?
        };
        match resource {
            "src" => self.rewrite_file(url, own, &gh_owner, &gh_repo, path, "blob", context),
            "raw" => self.rewrite_file(url, own, &gh_owner, &gh_repo, path, "raw", context),
            _ if own => None,
            "issues" => self.rewrite_numbered(url, &gh_owner, &gh_repo, path, false, context),
            "pull-requests" => self.rewrite_numbered(url, &gh_owner, &gh_repo, path, true, context),
            "commits" => self.rewrite_commit(url, &gh_owner, &gh_repo, path, context),
            _ => None,
        }
    }

    /// Rewrite `src` and `raw` file links. The ref segment is
    /// percent-encoded; the file path after it stays literal. Bitbucket's
    /// `#lines-N` fragment becomes GitHub's `#LN`.
    fn rewrite_file(
        &self,
        url: &str,
        own: bool,
        gh_owner: &str,
        gh_repo: &str,
        path: &str,
        kind: &str,
        context: LinkContext,
    ) -> Option<Rewrite> {
        let (reference, file_path) = path.split_once('/')?;
        let encoded_ref = encode_url_component(reference, "");
        let root = format!("https://github.com/{gh_owner}/{gh_repo}");
        let (bare_path, fragment) = match file_path.split_once("#lines-") {
            Some((fp, line)) => (fp, Some(line)),
            None => (file_path, None),
        };
        let gh_url = match (kind, fragment) {
            ("blob", Some(line)) => format!("{root}/blob/{encoded_ref}/{bare_path}#L{line}"),
            ("blob", None) => format!("{root}/blob/{encoded_ref}/{bare_path}"),
            _ => format!("{root}/raw/{encoded_ref}/{bare_path}"),
        };
        let filename = bare_path.rsplit('/').next().unwrap_or(bare_path);
        let text = if context == LinkContext::MarkdownDestination {
            gh_url
        } else {
            let note = self.config.format_note(
                "cross_repo_link",
                &[
                    ("bb_url", url),
                    ("gh_url", gh_url.as_str()),
                    ("gh_repo", gh_repo),
                    ("filename", filename),
                ],
            );
            if own {
                format!("[{filename}]({gh_url}){note}")
            } else {
                format!("[{gh_repo}/{filename}]({gh_url}){note}")
            }
        };
        let reason = if own { RewriteReason::Mapped } else { RewriteReason::CrossRepo };
        Some(Rewrite::new(url, text, "cross_repo_link", reason))
    }

    /// Rewrite issue and PR links of a mapped foreign repository. The
    /// foreign numbering is preserved; PRs point at issues, matching how
    /// migrated pull requests land on GitHub.
    fn rewrite_numbered(
        &self,
        url: &str,
        gh_owner: &str,
        gh_repo: &str,
        path: &str,
        is_pr: bool,
        context: LinkContext,
    ) -> Option<Rewrite> {
        let number: u64 = path.split('/').next().unwrap_or(path).parse().ok()?;
        let gh_url = format!("https://github.com/{gh_owner}/{gh_repo}/issues/{number}");
        let text = if context == LinkContext::MarkdownDestination {
            gh_url
        } else {
            let num = number.to_string();
            let note = self.config.format_note(
                "cross_repo_link",
                &[
                    ("bb_url", url),
                    ("gh_url", gh_url.as_str()),
                    ("gh_repo", gh_repo),
                    ("number", num.as_str()),
                ],
            );
            if is_pr {
                format!("[{gh_repo} PR #{number}]({gh_url}){note}")
            } else {
                format!("[{gh_repo} #{number}]({gh_url}){note}")
            }
        };
        Some(Rewrite::new(url, text, "cross_repo_link", RewriteReason::CrossRepo))
    }

    fn rewrite_commit(
        &self,
        url: &str,
        gh_owner: &str,
        gh_repo: &str,
        path: &str,
        context: LinkContext,
    ) -> Option<Rewrite> {
        let sha = path.split('/').next().unwrap_or(path);
        if !is_commit_sha(sha) {
            return None;
        }
        let gh_url = format!("https://github.com/{gh_owner}/{gh_repo}/commit/{sha}");
        let text = if context == LinkContext::MarkdownDestination {
            gh_url
        } else {
            let note = self.config.format_note(
                "cross_repo_link",
                &[("bb_url", url), ("gh_url", gh_url.as_str()), ("gh_repo", gh_repo)],
            );
            format!("[{gh_repo}@{}]({gh_url}){note}", abbreviate(sha))
        };
        Some(Rewrite::new(url, text, "cross_repo_link", RewriteReason::CrossRepo))
    }
}
