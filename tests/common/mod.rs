//! Utility helpers shared across integration tests.

use std::collections::BTreeMap;

use bb2gh::{LinkRewriteConfig, LinkRewriter, RewriterSettings};

/// Settings for the repository used throughout the suites:
/// `workspace/repo` on Bitbucket migrating to `owner/repo` on GitHub, with
/// a handful of mapped issue and PR numbers.
pub fn standard_settings() -> RewriterSettings {
    RewriterSettings {
        bb_workspace: "workspace".to_string(),
        bb_repo: "repo".to_string(),
        gh_owner: "owner".to_string(),
        gh_repo: "repo".to_string(),
        issues: BTreeMap::from([(123, 456), (789, 1001), (42, 100)]),
        pull_requests: BTreeMap::from([(45, 200), (67, 201)]),
        config: Some(LinkRewriteConfig::default()),
        ..RewriterSettings::default()
    }
}

pub fn standard_rewriter() -> LinkRewriter {
    LinkRewriter::new(standard_settings())
}

/// Assert the bracket and paren counts survived rewriting.
pub fn assert_balanced(text: &str) {
    assert_eq!(
        text.matches('[').count(),
        text.matches(']').count(),
        "unbalanced brackets in {text:?}"
    );
    assert_eq!(
        text.matches('(').count(),
        text.matches(')').count(),
        "unbalanced parens in {text:?}"
    );
}

/// [`assert_balanced`] plus the stronger invariant that no bracket pair was
/// glued onto another. Not applicable to inputs that legitimately contain
/// reference-style links.
pub fn assert_no_nesting(text: &str) {
    assert_balanced(text);
    assert!(!text.contains("]["), "nested bracket join in {text:?}");
}
