//! File helpers for rewriting markdown documents.

use std::{fs, path::Path};

use crate::rewrite::{LinkRewriter, RewriteOutcome};

/// Rewrite a file in place, returning the rewrite counts.
///
/// The file content is written back byte-for-byte as rewritten; running the
/// helper twice leaves the file unchanged the second time.
///
/// # Errors
/// Returns an error if reading or writing the file fails.
pub fn rewrite_file(path: &Path, rewriter: &LinkRewriter) -> std::io::Result<RewriteOutcome> {
    let text = fs::read_to_string(path)?;
    let outcome = rewriter.rewrite_links(&text);
    fs::write(path, &outcome.text)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tempfile::tempdir;

    use super::*;
    use crate::{config::LinkRewriteConfig, rewrite::RewriterSettings};

    fn rewriter() -> LinkRewriter {
        LinkRewriter::new(RewriterSettings {
            bb_workspace: "workspace".to_string(),
            bb_repo: "repo".to_string(),
            gh_owner: "owner".to_string(),
            gh_repo: "repo".to_string(),
            issues: BTreeMap::from([(1, 11)]),
            config: Some(LinkRewriteConfig::default()),
            ..RewriterSettings::default()
        })
    }

    #[test]
    fn rewrite_file_roundtrip() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("body.md");
        fs::write(&file, "see https://bitbucket.org/workspace/repo/issues/1\n").unwrap();
        let rewriter = rewriter();
        let outcome = rewrite_file(&file, &rewriter).unwrap();
        assert_eq!(outcome.links_found, 1);
        let out = fs::read_to_string(&file).unwrap();
        assert!(out.contains("github.com/owner/repo/issues/11"));
    }

    #[test]
    fn rewrite_file_is_idempotent() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("body.md");
        fs::write(&file, "see https://bitbucket.org/workspace/repo/issues/1\n").unwrap();
        let rewriter = rewriter();
        rewrite_file(&file, &rewriter).unwrap();
        let first = fs::read_to_string(&file).unwrap();
        let outcome = rewrite_file(&file, &rewriter).unwrap();
        assert_eq!(outcome.links_found, 0);
        assert_eq!(fs::read_to_string(&file).unwrap(), first);
    }
}
