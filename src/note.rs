//! Provenance-note templates.
//!
//! Each rewritten link may carry a short trailing note recording where it
//! was migrated from, e.g. `` *(was [BB #12](https://bitbucket.org/…))*``.
//! Templates use named placeholders (`{bb_num}`, `{bb_url}`, `{gh_num}`)
//! and `{{`/`}}` for literal braces. Interpolation validates the template
//! before producing output: a missing placeholder, an unterminated
//! placeholder, or a stray closing brace makes [`render_template`] return
//! `None` so the caller can fall back to the `default` template instead of
//! surfacing an error mid-rewrite.

/// Interpolate `template` using the `(name, value)` pairs in `vars`.
///
/// Returns `None` when the template is malformed or references a name not
/// present in `vars`.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) if c.is_ascii_alphanumeric() || c == '_' => name.push(c),
                        // Unterminated or syntactically invalid placeholder.
                        _ => return None,
                    }
                }
                let value = vars.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)?;
                out.push_str(value);
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                    out.push('}');
                } else {
                    return None;
                }
            }
            _ => out.push(ch),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_named_placeholders() {
        let vars = [("bb_num", "123"), ("bb_url", "https://bitbucket.org/w/r")];
        assert_eq!(
            render_template("Issue #{bb_num} from {bb_url}", &vars),
            Some("Issue #123 from https://bitbucket.org/w/r".to_string())
        );
    }

    #[test]
    fn missing_variable_fails() {
        assert_eq!(render_template("Issue #{bb_num}", &[]), None);
    }

    #[test]
    fn unterminated_placeholder_fails() {
        let vars = [("bb_num", "1"), ("bb_url", "u")];
        assert_eq!(render_template("Issue #{bb_num from {bb_url}", &vars), None);
    }

    #[test]
    fn stray_closing_brace_fails() {
        assert_eq!(render_template("oops}", &[]), None);
    }

    #[test]
    fn doubled_braces_are_literal() {
        assert_eq!(
            render_template("{{literal}} #{n}", &[("n", "7")]),
            Some("{literal} #7".to_string())
        );
    }

    #[test]
    fn empty_template_renders_empty() {
        assert_eq!(render_template("", &[]), Some(String::new()));
    }
}
