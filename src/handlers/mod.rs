//! Typed link handlers.
//!
//! Each Bitbucket link shape has one handler. Handlers form a closed set
//! dispatched through [`LinkHandler`]; the chain is sorted once by priority
//! at construction and tried in order until one produces a rewrite.
//! `can_handle` is a cheap pattern pre-check; `handle` may still decline
//! after a closer look (an unmapped issue number, say), which sends the URL
//! on to the next handler.

pub mod branch;
pub mod commit;
pub mod compare;
pub mod cross_repo;
pub mod issue;
pub mod pr;
pub mod refs;
pub mod repo_home;

use std::{collections::BTreeMap, sync::Arc};

pub use branch::BranchLinkHandler;
pub use commit::CommitLinkHandler;
pub use compare::CompareLinkHandler;
pub use cross_repo::CrossRepoLinkHandler;
pub use issue::IssueLinkHandler;
pub use pr::PrLinkHandler;
pub use refs::{MentionHandler, MentionOutcome, PrRefHandler, ShortIssueRefHandler};
pub use repo_home::RepoHomeLinkHandler;

use crate::config::{LinkRewriteConfig, RepoMap};

/// Bitbucket source and GitHub target coordinates shared by the handlers.
#[derive(Debug, Clone)]
pub struct Route {
    pub bb_workspace: String,
    pub bb_repo: String,
    pub gh_owner: String,
    pub gh_repo: String,
}

impl Route {
    /// Root URL of the target repository on GitHub.
    #[must_use]
    pub fn github_root(&self) -> String {
        format!("https://github.com/{}/{}", self.gh_owner, self.gh_repo)
    }

    /// Whether `workspace`/`repo` names the repository being migrated.
    #[must_use]
    pub fn is_own(&self, workspace: &str, repo: &str) -> bool {
        workspace == self.bb_workspace && repo == self.bb_repo
    }
}

/// Why a link could be rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteReason {
    /// Resolved through an issue/PR/repository mapping.
    Mapped,
    /// Rewritten structurally without a mapping entry for its number.
    Unmapped,
    /// Resolved through the cross-repository map.
    CrossRepo,
    /// Rewritten with percent-encoded ref components.
    Encoded,
}

/// Audit record for one successfully rewritten link.
#[derive(Debug, Clone)]
pub struct LinkDetail {
    pub original: String,
    pub rewritten: String,
    pub link_type: &'static str,
    pub reason: RewriteReason,
}

/// Where a candidate sits relative to markdown structure.
///
/// Inside a markdown destination the rewrite must be a bare URL: appending
/// a note there would render as part of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkContext {
    Plain,
    MarkdownDestination,
}

/// A successful rewrite plus its audit record.
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub text: String,
    pub detail: LinkDetail,
}

impl Rewrite {
    pub(crate) fn new(
        original: &str,
        text: String,
        link_type: &'static str,
        reason: RewriteReason,
    ) -> Self {
        Self {
            detail: LinkDetail {
                original: original.to_string(),
                rewritten: text.clone(),
                link_type,
                reason,
            },
            text,
        }
    }
}

/// Closed set of URL handlers.
#[derive(Debug)]
pub enum LinkHandler {
    Issue(IssueLinkHandler),
    Pr(PrLinkHandler),
    Commit(CommitLinkHandler),
    Branch(BranchLinkHandler),
    Compare(CompareLinkHandler),
    CrossRepo(CrossRepoLinkHandler),
    RepoHome(RepoHomeLinkHandler),
}

impl LinkHandler {
    /// Sort key; lower values are tried first.
    #[must_use]
    pub fn priority(&self) -> u8 {
        match self {
            Self::Issue(_) => IssueLinkHandler::PRIORITY,
            Self::Pr(_) => PrLinkHandler::PRIORITY,
            Self::Commit(_) => CommitLinkHandler::PRIORITY,
            Self::Branch(_) => BranchLinkHandler::PRIORITY,
            Self::Compare(_) => CompareLinkHandler::PRIORITY,
            Self::CrossRepo(_) => CrossRepoLinkHandler::PRIORITY,
            Self::RepoHome(_) => RepoHomeLinkHandler::PRIORITY,
        }
    }

    /// Cheap pattern pre-check.
    #[must_use]
    pub fn can_handle(&self, url: &str) -> bool {
        match self {
            Self::Issue(h) => h.can_handle(url),
            Self::Pr(h) => h.can_handle(url),
            Self::Commit(h) => h.can_handle(url),
            Self::Branch(h) => h.can_handle(url),
            Self::Compare(h) => h.can_handle(url),
            Self::CrossRepo(h) => h.can_handle(url),
            Self::RepoHome(h) => h.can_handle(url),
        }
    }

    /// Attempt the rewrite; `None` passes the URL to the next handler.
    #[must_use]
    pub fn handle(&self, url: &str, context: LinkContext) -> Option<Rewrite> {
        match self {
            Self::Issue(h) => h.handle(url, context),
            Self::Pr(h) => h.handle(url, context),
            Self::Commit(h) => h.handle(url, context),
            Self::Branch(h) => h.handle(url, context),
            Self::Compare(h) => h.handle(url, context),
            Self::CrossRepo(h) => h.handle(url, context),
            Self::RepoHome(h) => h.handle(url, context),
        }
    }
}

/// Shared construction state for the chain.
#[derive(Clone)]
pub struct ChainParts {
    pub route: Arc<Route>,
    pub config: Arc<LinkRewriteConfig>,
    pub issues: Arc<BTreeMap<u64, u64>>,
    pub pull_requests: Arc<BTreeMap<u64, u64>>,
    pub repositories: Arc<RepoMap>,
}

/// The priority-ordered handler chain.
#[derive(Debug)]
pub struct HandlerChain {
    handlers: Vec<LinkHandler>,
}

impl HandlerChain {
    /// Build the chain and stable-sort it by priority, so ties keep
    /// declaration order and rewrite output is reproducible across runs.
    #[must_use]
    pub fn new(parts: &ChainParts) -> Self {
        let mut handlers = vec![
            LinkHandler::Issue(IssueLinkHandler::new(parts)),
            LinkHandler::Pr(PrLinkHandler::new(parts)),
            LinkHandler::Commit(CommitLinkHandler::new(parts)),
            LinkHandler::Branch(BranchLinkHandler::new(parts)),
            LinkHandler::Compare(CompareLinkHandler::new(parts)),
            LinkHandler::CrossRepo(CrossRepoLinkHandler::new(parts)),
            LinkHandler::RepoHome(RepoHomeLinkHandler::new(parts)),
        ];
        handlers.sort_by_key(LinkHandler::priority);
        Self { handlers }
    }

    /// Try each handler in priority order until one rewrites `url`.
    #[must_use]
    pub fn dispatch(&self, url: &str, context: LinkContext) -> Option<Rewrite> {
        self.handlers
            .iter()
            .filter(|h| h.can_handle(url))
            .find_map(|h| h.handle(url, context))
    }

    /// Handlers in dispatch order.
    #[must_use]
    pub fn handlers(&self) -> &[LinkHandler] {
        &self.handlers
    }
}

/// Shorten a ref for display, as in commit abbreviations.
#[must_use]
pub(crate) fn abbreviate(reference: &str) -> String {
    if reference.chars().count() > 7 {
        reference.chars().take(7).collect()
    } else {
        reference.to_string()
    }
}
