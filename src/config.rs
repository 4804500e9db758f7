//! Migration configuration and mapping tables.
//!
//! The broader migration run supplies everything here once per repository:
//! the Bitbucket source and GitHub target coordinates, the issue and pull
//! request number mappings, the cross-repository map, the user map, and the
//! note-template settings. All of it is read-only for the rewriting engine.

use std::{collections::BTreeMap, fs, path::Path};

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::note::render_template;

static DEFAULT_NOTE_TEMPLATES: Lazy<BTreeMap<String, String>> = Lazy::new(|| {
    [
        ("issue_link", " *(was [BB #{bb_num}]({bb_url}))*"),
        ("pr_link", " *(was [BB PR #{bb_num}]({bb_url}))*"),
        ("commit_link", " *(was [Bitbucket]({bb_url}))*"),
        ("branch_link", " *(was [Bitbucket]({bb_url}))*"),
        ("compare_link", " *(was [Bitbucket]({bb_url}))*"),
        ("repo_home_link", ""),
        ("cross_repo_link", " *(was [Bitbucket]({bb_url}))*"),
        ("short_issue_ref", " *(was BB `#{bb_num}`)*"),
        ("pr_ref", " *(was BB PR `#{bb_num}`)*"),
        ("mention", ""),
        ("default", " *(migrated link)*"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
});

/// Settings for link rewriting and provenance notes.
///
/// A custom `note_templates` table replaces the default table wholesale;
/// lookups for types absent from a custom table fall back to its `default`
/// entry, or to the empty string when no `default` exists.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkRewriteConfig {
    /// Master switch; when false, `rewrite_links` passes text through.
    pub enabled: bool,
    /// Whether rewritten links carry provenance notes.
    pub enable_notes: bool,
    /// Whether markdown destinations suppress notes and keep structure.
    #[serde(alias = "enable_markdown_context_awareness")]
    pub enable_markdown_awareness: bool,
    /// Note template per link type; `default` is the fallback entry.
    pub note_templates: BTreeMap<String, String>,
}

impl Default for LinkRewriteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_notes: true,
            enable_markdown_awareness: true,
            note_templates: DEFAULT_NOTE_TEMPLATES.clone(),
        }
    }
}

impl LinkRewriteConfig {
    /// Configuration used when the migration supplies no template section:
    /// rewriting stays on, notes are off.
    #[must_use]
    pub fn without_notes() -> Self {
        Self {
            enable_notes: false,
            note_templates: BTreeMap::new(),
            ..Self::default()
        }
    }

    /// Look up the template for `link_type`, falling back to `default`.
    #[must_use]
    pub fn get_template(&self, link_type: &str) -> &str {
        self.note_templates
            .get(link_type)
            .or_else(|| self.note_templates.get("default"))
            .map_or("", String::as_str)
    }

    /// Render the provenance note for `link_type`.
    ///
    /// A malformed template or one referencing a variable not in `vars`
    /// falls back to the `default` template; notes disabled, an empty
    /// resolved template, or a default that also fails all yield `""`.
    #[must_use]
    pub fn format_note(&self, link_type: &str, vars: &[(&str, &str)]) -> String {
        if !self.enable_notes {
            return String::new();
        }
        let template = self.get_template(link_type);
        if template.is_empty() {
            return String::new();
        }
        render_template(template, vars)
            .or_else(|| {
                let fallback = self.note_templates.get("default").map_or("", String::as_str);
                render_template(fallback, vars)
            })
            .unwrap_or_default()
    }
}

/// Cross-repository mapping: `"workspace/repo"` on Bitbucket to
/// `"owner/repo"` on GitHub. A value without a slash names a repository
/// under the migration's default GitHub owner.
#[derive(Debug, Clone, Default)]
pub struct RepoMap {
    entries: BTreeMap<String, String>,
    default_owner: String,
}

impl RepoMap {
    #[must_use]
    pub fn new(entries: BTreeMap<String, String>, default_owner: impl Into<String>) -> Self {
        Self {
            entries,
            default_owner: default_owner.into(),
        }
    }

    /// Resolve a Bitbucket repository to its GitHub owner and name.
    #[must_use]
    pub fn get_mapped_repository(&self, workspace: &str, repo: &str) -> Option<(String, String)> {
        let value = self.entries.get(&format!("{workspace}/{repo}"))?;
        Some(match value.split_once('/') {
            Some((owner, name)) => (owner.to_string(), name.to_string()),
            None => (self.default_owner.clone(), value.clone()),
        })
    }
}

/// Bitbucket identifier (username, display name, or account id) to GitHub
/// login mapping.
#[derive(Debug, Clone, Default)]
pub struct UserMap {
    entries: BTreeMap<String, String>,
}

impl UserMap {
    #[must_use]
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Resolve a mention identifier to a GitHub login.
    #[must_use]
    pub fn map_mention(&self, identifier: &str) -> Option<&str> {
        self.entries.get(identifier).map(String::as_str)
    }
}

/// Source repository on Bitbucket.
#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketSource {
    pub workspace: String,
    pub repo: String,
}

/// Target repository on GitHub.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubTarget {
    pub owner: String,
    pub repo: String,
}

/// The migration configuration file consumed by the CLI.
///
/// # Examples
///
/// ```
/// let config: bb2gh::MigrationConfig = serde_json::from_str(
///     r#"{
///         "bitbucket": {"workspace": "acme", "repo": "widget"},
///         "github": {"owner": "acme-gh", "repo": "widget"},
///         "issues": {"1": 11, "2": 12}
///     }"#,
/// )
/// .unwrap();
/// assert_eq!(config.issues.get(&1), Some(&11));
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MigrationConfig {
    pub bitbucket: BitbucketSource,
    pub github: GithubTarget,
    #[serde(default)]
    pub issues: BTreeMap<u64, u64>,
    #[serde(default, alias = "prs")]
    pub pull_requests: BTreeMap<u64, u64>,
    #[serde(default)]
    pub repositories: BTreeMap<String, String>,
    #[serde(default)]
    pub users: BTreeMap<String, String>,
    #[serde(default)]
    pub link_rewriting: LinkRewriteConfig,
}

impl MigrationConfig {
    /// Load a migration configuration from a JSON file.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_templates_cover_every_link_type() {
        let config = LinkRewriteConfig::default();
        for tag in [
            "issue_link",
            "pr_link",
            "commit_link",
            "branch_link",
            "compare_link",
            "repo_home_link",
            "cross_repo_link",
            "short_issue_ref",
            "pr_ref",
            "mention",
            "default",
        ] {
            assert!(config.note_templates.contains_key(tag), "missing {tag}");
        }
        assert!(config.enabled);
        assert!(config.enable_notes);
        assert!(config.enable_markdown_awareness);
    }

    #[test]
    fn custom_table_replaces_defaults() {
        let config: LinkRewriteConfig = serde_json::from_str(
            r#"{"note_templates": {"issue_link": " *(custom #{bb_num})*", "default": " *(d)*"}}"#,
        )
        .unwrap();
        assert_eq!(config.get_template("issue_link"), " *(custom #{bb_num})*");
        assert_eq!(config.get_template("pr_link"), " *(d)*");
    }

    #[test]
    fn missing_default_yields_empty_template() {
        let config: LinkRewriteConfig =
            serde_json::from_str(r#"{"note_templates": {}}"#).unwrap();
        assert_eq!(config.get_template("unknown_type"), "");
    }

    #[test]
    fn format_note_falls_back_on_missing_variable() {
        let config: LinkRewriteConfig = serde_json::from_str(
            r##"{"note_templates": {"issue_link": "#{bb_num} at {missing}", "default": " *(fallback)*"}}"##,
        )
        .unwrap();
        let note = config.format_note("issue_link", &[("bb_num", "1")]);
        assert_eq!(note, " *(fallback)*");
    }

    #[test]
    fn format_note_respects_disabled_notes() {
        let config = LinkRewriteConfig {
            enable_notes: false,
            ..LinkRewriteConfig::default()
        };
        assert_eq!(config.format_note("issue_link", &[("bb_num", "1"), ("bb_url", "u")]), "");
    }

    #[test]
    fn repo_map_splits_owner_and_falls_back() {
        let mut entries = BTreeMap::new();
        entries.insert("ws/other".to_string(), "acme/other-gh".to_string());
        entries.insert("ws/bare".to_string(), "bare-gh".to_string());
        let map = RepoMap::new(entries, "default-owner");
        assert_eq!(
            map.get_mapped_repository("ws", "other"),
            Some(("acme".to_string(), "other-gh".to_string()))
        );
        assert_eq!(
            map.get_mapped_repository("ws", "bare"),
            Some(("default-owner".to_string(), "bare-gh".to_string()))
        );
        assert_eq!(map.get_mapped_repository("ws", "unknown"), None);
    }

    #[test]
    fn config_alias_for_markdown_awareness() {
        let config: LinkRewriteConfig =
            serde_json::from_str(r#"{"enable_markdown_context_awareness": false}"#).unwrap();
        assert!(!config.enable_markdown_awareness);
    }
}
