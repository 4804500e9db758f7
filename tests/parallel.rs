//! Parallel rewriting: batch results must match sequential rewriting
//! exactly, in content and in order.

#[macro_use]
mod prelude;
use prelude::*;

fn bodies() -> Vec<String> {
    (0..16)
        .map(|i| match i % 4 {
            0 => format!("Body {i}: see https://bitbucket.org/workspace/repo/issues/123 now"),
            1 => format!("Body {i}: [link](https://bitbucket.org/workspace/repo/pull-requests/45)"),
            2 => format!("Body {i}: refs #789 and PR #67"),
            _ => format!("Body {i}: nothing to do here"),
        })
        .collect()
}

#[test]
fn batch_results_match_sequential_rewriting() {
    let rewriter = standard_rewriter();
    let bodies = bodies();
    let parallel = rewriter.rewrite_all(&bodies);
    assert_eq!(parallel.len(), bodies.len());
    for (body, outcome) in bodies.iter().zip(&parallel) {
        let sequential = rewriter.rewrite_links(body);
        assert_eq!(outcome.text, sequential.text);
        assert_eq!(outcome.links_found, sequential.links_found);
        assert_eq!(outcome.unhandled_links, sequential.unhandled_links);
    }
}

#[test]
fn batch_preserves_input_order() {
    let rewriter = standard_rewriter();
    let bodies = bodies();
    let outcomes = rewriter.rewrite_all(&bodies);
    for (i, outcome) in outcomes.iter().enumerate() {
        assert!(outcome.text.starts_with(&format!("Body {i}:")));
    }
}

#[test]
fn batch_counts_accumulate_per_body() {
    let rewriter = standard_rewriter();
    let outcomes = rewriter.rewrite_all(&bodies());
    let total: usize = outcomes.iter().map(|o| o.links_found).sum();
    // Four bodies of each shape: URL, markdown PR link, two refs, nothing.
    assert_eq!(total, 4 + 4 + 8);
}

#[test]
fn empty_batch_is_fine() {
    let rewriter = standard_rewriter();
    assert!(rewriter.rewrite_all(&[]).is_empty());
}
