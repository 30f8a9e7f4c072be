//! The high-level parser (§4.2): isolates the single `targets = [...]`
//! header from a raw script and slices the remaining text into ordered
//! `(target_name, raw_block_body, offset)` triples, one per
//! `TARGET_HEAD { ... }` group. Comments are blanked before either regex
//! pass runs, so a comment that happens to contain `targets = [...]` or a
//! `TARGET: {` look-alike is never mistaken for the real thing.

use crate::error::{CompileError, ExternalDiagnostic};
use crate::grammar::{strip_comments, UnexpectedToken};
use crate::source::Source;
use crate::util::{split_comma_list, strip_quotes};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

static TARGET_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)targets\s*=\s*\[(?P<body>.*?)\]").expect("static regex"));

static TARGET_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)^(?P<ident>[A-Za-z_][A-Za-z_]*)\s*:\s*"(?P<url>[^"]*)"$"#)
        .expect("static regex")
});

static ACTION_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<ident>[A-Za-z_][A-Za-z_]*)\s*:\s*\{").expect("static regex")
});

/// The result of the high-level parse: an ordered alias→URL mapping and an
/// ordered list of raw per-target block bodies (each including its outer
/// braces), paired with the absolute byte offset of the block's opening
/// brace in the original source.
#[derive(Debug)]
pub struct HighLevelTree {
    pub targets: IndexMap<String, String>,
    pub blocks: Vec<(String, String, usize)>,
}

pub fn parse_high_level(source: &Source<'_>) -> Result<HighLevelTree, CompileError> {
    let sanitized = strip_comments(source.text);
    let text = sanitized.as_str();
    let matches: Vec<_> = TARGET_LIST.find_iter(text).collect();

    if matches.is_empty() {
        let failure = UnexpectedToken::new(0, ["targets"]);
        return Err(failure.into_diagnostic(source).into());
    }
    if matches.len() > 1 {
        // Comment-blanking preserves every other byte offset, so these
        // ranges are valid into the real source too — report the original
        // text rather than the blanked one.
        let kept = source.text[matches[0].start()..matches[0].end()].to_string();
        let rejected = matches[1..]
            .iter()
            .map(|m| source.text[m.start()..m.end()].to_string())
            .collect();
        return Err(ExternalDiagnostic::MultipleTargetListDefinitions { kept, rejected }.into());
    }

    let list_match = &matches[0];
    let captures = TARGET_LIST.captures(list_match.as_str()).expect("matched above");
    let body = captures.name("body").expect("named group").as_str();
    let targets = parse_target_body(body, source, list_match.start())?;

    let remainder_start = list_match.end();
    let blocks = parse_action_blocks(&text[remainder_start..], remainder_start, source)?;

    Ok(HighLevelTree { targets, blocks })
}

fn parse_target_body(
    body: &str,
    source: &Source<'_>,
    list_offset: usize,
) -> Result<IndexMap<String, String>, CompileError> {
    let mut targets = IndexMap::new();
    for entry in split_comma_list(body) {
        let captures = TARGET_PAIR.captures(entry).ok_or_else(|| {
            let offset = list_offset + body_entry_offset(body, entry);
            CompileError::from(UnexpectedToken::new(offset, ["IDENT : \"URL\""]).into_diagnostic(source))
        })?;
        let ident = captures.name("ident").expect("named group").as_str();
        let url = captures.name("url").expect("named group").as_str();
        targets.insert(ident.to_string(), strip_quotes(url).to_string());
    }
    Ok(targets)
}

/// Best-effort byte offset of `entry` within `body`, for diagnostics. Falls
/// back to the start of `body` if the slice can't be located by pointer
/// (shouldn't happen since `entry` always derives from `body`).
fn body_entry_offset(body: &str, entry: &str) -> usize {
    let body_ptr = body.as_ptr() as usize;
    let entry_ptr = entry.as_ptr() as usize;
    entry_ptr.saturating_sub(body_ptr)
}

fn parse_action_blocks(
    text: &str,
    base_offset: usize,
    source: &Source<'_>,
) -> Result<Vec<(String, String, usize)>, CompileError> {
    let mut blocks = Vec::new();
    let mut scan_from = 0usize;

    while let Some(head) = ACTION_HEAD.captures_at(text, scan_from) {
        let full_match = head.get(0).expect("whole match");
        let ident = head.name("ident").expect("named group").as_str().to_string();
        let open_brace = full_match.end() - 1;

        let close_brace = match find_matching_brace(text, open_brace) {
            Some(offset) => offset,
            None => {
                let failure = UnexpectedToken::new(base_offset + open_brace, ["}"]);
                return Err(failure.into_diagnostic(source).into());
            }
        };

        let raw_block_body = text[open_brace..=close_brace].to_string();
        blocks.push((ident, raw_block_body, base_offset + open_brace));
        scan_from = close_brace + 1;
    }

    Ok(blocks)
}

/// Scan forward from a `{` at `open` and return the offset of its matching
/// `}`, accounting for nested braces.
fn find_matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, ch) in text[open..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}
