//! Rewrites Bitbucket references in markdown to their GitHub equivalents.
//!
//! The crate drives a migration's content pass: issue bodies, pull request
//! descriptions, and comments arrive as Bitbucket-flavoured markdown, and
//! leave with every recognisable Bitbucket link, short reference, and
//! mention pointing at the mapped GitHub target. Rewrites preserve markdown
//! structure (no nested bracket pairs, escaped markdown untouched) and are
//! idempotent, so a body can safely pass through the rewriter twice.

pub mod config;
pub mod detect;
pub mod encode;
pub mod handlers;
pub mod io;
mod macros;
pub mod markdown;
pub mod note;
pub mod rewrite;
pub mod tokenize;

pub use config::{LinkRewriteConfig, MigrationConfig, RepoMap, UserMap};
pub use detect::extract_urls;
pub use encode::encode_url_component;
pub use handlers::{LinkDetail, RewriteReason};
pub use rewrite::{LinkRewriter, RewriteOutcome, RewriterSettings};
