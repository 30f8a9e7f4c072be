//! The action-block parser (§4.3): slices a `{ ... }` block body into
//! individual statement strings, each paired with the byte offset of its
//! first character within the block body so a later stage can resolve
//! absolute source positions for diagnostics raised while parsing it.

use crate::grammar::strip_comments;
use once_cell::sync::Lazy;
use regex::Regex;

static STATEMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\s*([^;]+;)").expect("static regex"));

/// Split a raw block body (including its outer `{`/`}`) into
/// `(statement, offset)` pairs, each statement terminated by `;` and
/// `offset` measured from the start of `raw_block_body`. Line comments are
/// blanked first (same byte length, so offsets stay aligned) so a `;`
/// inside a comment never ends a statement early.
pub fn split_statements(raw_block_body: &str) -> Vec<(String, usize)> {
    let sanitized = strip_comments(raw_block_body);
    let inner_start = sanitized.find('{').map(|i| i + 1).unwrap_or(0);
    let inner_end = sanitized.rfind('}').unwrap_or(sanitized.len());
    let inner = &sanitized[inner_start..inner_end];

    STATEMENT
        .captures_iter(inner)
        .filter_map(|cap| {
            let m = cap.get(1).expect("capturing group present");
            let leading_ws = m.as_str().len() - m.as_str().trim_start().len();
            let text = m.as_str().trim().to_string();
            if text.is_empty() {
                None
            } else {
                Some((text, inner_start + m.start() + leading_ws))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multiple_statements() {
        let body = r#"{ extract where tag "div" -> a; extract where tag "p" -> b; }"#;
        let statements = split_statements(body);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].0.ends_with("-> a;"));
        assert!(statements[1].0.ends_with("-> b;"));
    }

    #[test]
    fn ignores_line_comments() {
        let body = "{ // note about this block\n extract where tag \"div\" -> a; }";
        let statements = split_statements(body);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].0.starts_with("extract"));
    }

    #[test]
    fn empty_block_has_no_statements() {
        assert!(split_statements("{ }").is_empty());
    }

    #[test]
    fn statement_offset_points_to_its_first_character() {
        let body = "{ extract where tag \"div\" -> a; }";
        let statements = split_statements(body);
        let (text, offset) = &statements[0];
        assert_eq!(&body[*offset..*offset + text.len()], text.as_str());
    }
}
