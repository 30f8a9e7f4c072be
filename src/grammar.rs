//! The shared low-level scanning concerns behind the two tokenizer-like
//! stages (§4.1): compiled-pattern caching, whitespace/comment skipping, and
//! a structured record for an unexpected-token failure that both the
//! high-level and filter parsers lift into a `SyntaxError`.

use crate::error::ExternalDiagnostic;
use crate::source::Source;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// A line comment runs from `//` to end of line; this is skipped alongside
/// whitespace between every token so downstream regexes never have to
/// account for either.
static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"//[^\n]*").expect("static regex"));

/// Skip whitespace and line comments starting at `offset`, returning the
/// offset of the next non-trivial byte.
pub fn skip_trivia(text: &str, offset: usize) -> usize {
    let mut pos = offset;
    loop {
        let rest = &text[pos..];
        let ws_len = rest.len() - rest.trim_start().len();
        pos += ws_len;
        let rest = &text[pos..];
        if let Some(m) = LINE_COMMENT.find(rest) {
            if m.start() == 0 {
                pos += m.end();
                continue;
            }
        }
        break;
    }
    pos
}

/// Blank every line comment out of a string, replacing each comment's bytes
/// with spaces of the same byte length so every other byte offset in the
/// string is unchanged — callers that resolve diagnostics against the
/// original source can keep using offsets computed against the blanked
/// text directly.
///
/// A `//` is only recognized as a comment start outside a double-quoted
/// string, so a target URL like `"http://example.com"` is left intact
/// rather than being truncated at its own scheme separator.
pub fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'"' {
            in_string = !in_string;
            out.push(b);
            i += 1;
        } else if !in_string && b == b'/' && bytes.get(i + 1) == Some(&b'/') {
            while i < bytes.len() && bytes[i] != b'\n' {
                out.push(b' ');
                i += 1;
            }
        } else {
            out.push(b);
            i += 1;
        }
    }
    String::from_utf8(out).expect("blanking comment bytes with ASCII spaces keeps valid UTF-8")
}

/// A structured unexpected-token failure: the byte offset of the
/// unexpected input, what was found there, and the set of rule names the
/// grammar was willing to accept at that point.
pub struct UnexpectedToken {
    pub offset: usize,
    pub expected: BTreeSet<String>,
}

impl UnexpectedToken {
    pub fn new(offset: usize, expected: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            offset,
            expected: expected.into_iter().map(str::to_string).collect(),
        }
    }

    /// Lift this failure into a caller-facing diagnostic, resolving the
    /// offset to a line/column and a trimmed context snippet against
    /// `source`.
    pub fn into_diagnostic(self, source: &Source<'_>) -> ExternalDiagnostic {
        ExternalDiagnostic::SyntaxError {
            position: source.position_at(self.offset),
            offending_context: source.context_at(self.offset, 20),
            expected: self.expected,
        }
    }
}
