use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};

use anyhow::Context;
use bb2gh::{LinkRewriter, MigrationConfig, RewriteOutcome, RewriterSettings};
use clap::Parser;
use rayon::prelude::*;

#[derive(Parser)]
#[command(version, about = "Rewrite Bitbucket links in markdown to their GitHub equivalents")]
struct Cli {
    /// Migration configuration: repository coordinates, number mappings,
    /// and note templates (JSON)
    #[arg(long = "config", value_name = "FILE")]
    config: PathBuf,
    /// Rewrite files in place
    #[arg(long = "in-place", requires = "files")]
    in_place: bool,
    /// Print per-input rewrite counts to stderr
    #[arg(long = "report")]
    report: bool,
    /// Markdown files to rewrite
    files: Vec<PathBuf>,
}

fn report(label: &str, outcome: &RewriteOutcome) {
    eprintln!(
        "{label}: {} rewritten, {} unhandled, {} mentions mapped, {} mentions unmapped",
        outcome.links_found,
        outcome.unhandled_links.len(),
        outcome.mentions_mapped,
        outcome.mentions_unmapped,
    );
}

/// Entry point for the command-line tool that rewrites Bitbucket links.
///
/// Reads the migration configuration, then rewrites the given markdown
/// files (in parallel, output order preserved) or standard input.
///
/// # Examples
///
/// ```sh
/// # Rewrite a body read from stdin
/// cat body.md | bb2gh --config migration.json
///
/// # Rewrite files in place and show counts
/// bb2gh --config migration.json --in-place --report notes/*.md
/// ```
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = MigrationConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let rewriter = LinkRewriter::new(RewriterSettings::from(&config));

    if cli.files.is_empty() {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        let outcome = rewriter.rewrite_links(&input);
        print!("{}", outcome.text);
        if cli.report {
            report("stdin", &outcome);
        }
        return Ok(());
    }

    let results: Vec<(PathBuf, io::Result<RewriteOutcome>)> = cli
        .files
        .par_iter()
        .map(|path| {
            let result = if cli.in_place {
                bb2gh::io::rewrite_file(path, &rewriter)
            } else {
                fs::read_to_string(path).map(|text| rewriter.rewrite_links(&text))
            };
            (path.clone(), result)
        })
        .collect();

    for (path, result) in results {
        let outcome =
            result.with_context(|| format!("failed to process {}", path.display()))?;
        if !cli.in_place {
            print!("{}", outcome.text);
        }
        if cli.report {
            report(&path.display().to_string(), &outcome);
        }
    }

    Ok(())
}
