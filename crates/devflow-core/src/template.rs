//! Command-template tokens.
//!
//! A token is literal text with `{name}` placeholders. `{{` and `}}` stand
//! for literal braces. Rendering substitutes values into the token as-is:
//! the result is always exactly one argument, never re-split or passed
//! through a shell.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_-]*$").expect("valid regex"))
}

/// Placeholder and argument names: lowercase, starting with a letter.
pub fn is_valid_name(name: &str) -> bool {
    name_re().is_match(name)
}

/// Split a token into literal and placeholder segments.
pub fn parse(token: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = token.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if !closed {
                    return Err(format!("unclosed '{{' in token '{token}'"));
                }
                if !is_valid_name(&name) {
                    return Err(format!("invalid placeholder '{{{name}}}' in token '{token}'"));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(name));
            }
            '}' => return Err(format!("unmatched '}}' in token '{token}'")),
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Placeholder names across `tokens`, in first-seen order, deduplicated.
/// Malformed tokens contribute nothing; they are rejected at registration.
pub fn placeholders<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for token in tokens {
        for seg in parse(token).unwrap_or_default() {
            if let Segment::Placeholder(name) = seg {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
    }
    names
}

/// Fill every placeholder in `token` via `lookup`. Returns the name of the
/// first placeholder `lookup` cannot fill.
pub fn render<'v>(
    token: &str,
    lookup: impl Fn(&str) -> Option<&'v str>,
) -> Result<String, RenderError> {
    let segments = parse(token).map_err(RenderError::Malformed)?;
    let mut out = String::with_capacity(token.len());
    for seg in segments {
        match seg {
            Segment::Literal(text) => out.push_str(&text),
            Segment::Placeholder(name) => match lookup(&name) {
                Some(value) => out.push_str(value),
                None => return Err(RenderError::Unfilled(name)),
            },
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    Malformed(String),
    Unfilled(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literals_and_placeholders() {
        let segs = parse("{venv}/bin/python").unwrap();
        assert_eq!(
            segs,
            vec![
                Segment::Placeholder("venv".into()),
                Segment::Literal("/bin/python".into()),
            ]
        );
    }

    #[test]
    fn escaped_braces_are_literal() {
        let segs = parse("{{not}} a placeholder").unwrap();
        assert_eq!(segs, vec![Segment::Literal("{not} a placeholder".into())]);
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(parse("{venv").is_err());
        assert!(parse("venv}").is_err());
        assert!(parse("{}").is_err());
        assert!(parse("{Bad Name}").is_err());
    }

    #[test]
    fn placeholders_are_deduplicated_in_order() {
        let names = placeholders(["{git}", "push", "{remote}", "{branch}", "{remote}"]);
        assert_eq!(names, vec!["git", "remote", "branch"]);
    }

    #[test]
    fn render_substitutes_without_splitting() {
        let out = render("-m={message}", |n| (n == "message").then_some("two words; rm -rf")).unwrap();
        assert_eq!(out, "-m=two words; rm -rf");
    }

    #[test]
    fn render_reports_unfilled() {
        let err = render("{missing}", |_| None).unwrap_err();
        assert_eq!(err, RenderError::Unfilled("missing".into()));
    }

    #[test]
    fn name_validation() {
        assert!(is_valid_name("venv"));
        assert!(is_valid_name("remote_url"));
        assert!(is_valid_name("max-count"));
        assert!(!is_valid_name("1st"));
        assert!(!is_valid_name("Message"));
        assert!(!is_valid_name(""));
    }
}
