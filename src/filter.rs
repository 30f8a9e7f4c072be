//! The filter parser (§4.5): the hardest subcomponent. Extracts
//! `{from_alias, raw_filter, assignment}` metadata from a statement by
//! regex, then parses the predicate substring with a precedence-sensitive
//! recursive-descent grammar, normalizing atomic values per §4.5.3's table.

use crate::ast::{
    Action, ActionMetadata, AtomicValue, AttributePair, BoolOp, ContainsValue, Filter, FilterType,
    FilterValue,
};
use crate::error::{CompileError, ExternalDiagnostic};
use crate::source::Source;
use once_cell::sync::Lazy;
use regex::Regex;

static EXTRACT_FROM_WHERE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?sx)
        ^\s*extract \s+ from \s+ (?P<from>[A-Za-z_][A-Za-z_]*) \s+ where \s+
        (?P<cond>.*?)
        \s* -> \s* (?P<out>[A-Za-z_][A-Za-z_]*) \s* ; \s*$
        "#,
    )
    .expect("static regex")
});

static EXTRACT_WHERE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?sx)
        ^\s*extract \s+ where \s+
        (?P<cond>.*?)
        \s* -> \s* (?P<out>[A-Za-z_][A-Za-z_]*) \s* ; \s*$
        "#,
    )
    .expect("static regex")
});

struct ExtractMetadata {
    from_alias: String,
    raw_filter: String,
    /// Byte offset of `raw_filter`'s first character within the statement
    /// it was extracted from, so a caller holding the statement's own
    /// absolute offset can resolve `raw_filter`'s absolute position.
    cond_offset: usize,
    assignment: String,
}

fn extract_metadata(statement: &str) -> Option<ExtractMetadata> {
    if let Some(caps) = EXTRACT_FROM_WHERE.captures(statement) {
        let cond = caps.name("cond").expect("named group");
        return Some(ExtractMetadata {
            from_alias: caps.name("from").expect("named group").as_str().to_string(),
            raw_filter: cond.as_str().to_string(),
            cond_offset: cond.start(),
            assignment: caps.name("out").expect("named group").as_str().to_string(),
        });
    }
    let caps = EXTRACT_WHERE.captures(statement)?;
    let cond = caps.name("cond").expect("named group");
    Some(ExtractMetadata {
        from_alias: String::new(),
        raw_filter: cond.as_str().to_string(),
        cond_offset: cond.start(),
        assignment: caps.name("out").expect("named group").as_str().to_string(),
    })
}

/// Classifier registered under [`crate::registry::FILTER`]: true iff the
/// statement matches one of §4.5.1's two anchored forms.
pub fn classify(statement: &str) -> bool {
    extract_metadata(statement).is_some()
}

/// Constructor registered under [`crate::registry::FILTER`].
///
/// `offset` is `statement`'s absolute byte offset within `source` (the full
/// original script), so any `SyntaxError`/`UnknownAtomicValueShape`
/// resolved while parsing the predicate reports a real `{line, column}` in
/// the script rather than one local to the extracted statement text.
pub fn build(statement: &str, offset: usize, source: &Source<'_>) -> Result<Action, CompileError> {
    let metadata = extract_metadata(statement)
        .ok_or_else(|| ExternalDiagnostic::BadExtractStatement {
            statement: statement.to_string(),
        })?;

    let filter = parse_predicate(&metadata.raw_filter, offset + metadata.cond_offset, source)?;

    Ok(Action::Filter {
        metadata: ActionMetadata {
            action_type: crate::registry::FILTER.0,
            from_alias: metadata.from_alias,
            raw_filter: metadata.raw_filter,
            assignment: metadata.assignment,
        },
        filter,
    })
}

/// Parse the predicate substring of one `extract ... where <predicate> ->`
/// statement into a [`Filter`] tree. `base_offset` is `raw_filter`'s
/// absolute byte offset within `source`.
fn parse_predicate(raw_filter: &str, base_offset: usize, source: &Source<'_>) -> Result<Filter, CompileError> {
    let mut parser = PredicateParser::new(raw_filter, base_offset, source);
    let filter = parser.parse_or_expr()?;
    parser.expect_exhausted()?;
    Ok(filter)
}

struct PredicateParser<'p, 's> {
    text: &'p str,
    pos: usize,
    base_offset: usize,
    source: &'p Source<'s>,
}

impl<'p, 's> PredicateParser<'p, 's> {
    fn new(text: &'p str, base_offset: usize, source: &'p Source<'s>) -> Self {
        Self {
            text,
            pos: 0,
            base_offset,
            source,
        }
    }

    fn skip_ws(&mut self) {
        self.pos = crate::grammar::skip_trivia(self.text, self.pos);
    }

    fn rest(&self) -> &'p str {
        &self.text[self.pos..]
    }

    fn unexpected(&self, expected: &'static [&'static str]) -> CompileError {
        let absolute = self.base_offset + self.pos;
        ExternalDiagnostic::SyntaxError {
            position: self.source.position_at(absolute),
            offending_context: self.source.context_at(absolute, 20),
            expected: expected.iter().map(|s| s.to_string()).collect(),
        }
        .into()
    }

    /// Consume a bare keyword if the remaining input starts with it at a
    /// word boundary; does not consume on failure.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_ws();
        let rest = self.rest();
        if !rest.starts_with(keyword) {
            return false;
        }
        let after = &rest[keyword.len()..];
        let boundary_ok = after
            .chars()
            .next()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));
        if boundary_ok {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn eat_char(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn peek_char(&mut self, c: char) -> bool {
        self.skip_ws();
        self.rest().starts_with(c)
    }

    fn expect_char(&mut self, c: char, expected: &'static [&'static str]) -> Result<(), CompileError> {
        if self.eat_char(c) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_exhausted(&mut self) -> Result<(), CompileError> {
        self.skip_ws();
        if self.rest().is_empty() {
            Ok(())
        } else {
            Err(self.unexpected(&["and", "or"]))
        }
    }

    /// `or_expr := and_expr ("or" and_expr)*`
    fn parse_or_expr(&mut self) -> Result<Filter, CompileError> {
        let mut operands = vec![self.parse_and_expr()?];
        while self.eat_keyword("or") {
            operands.push(self.parse_and_expr()?);
        }
        Ok(wrap_operator(BoolOp::Or, operands))
    }

    /// `and_expr := not_expr ("and" not_expr)*`
    fn parse_and_expr(&mut self) -> Result<Filter, CompileError> {
        let mut operands = vec![self.parse_not_expr()?];
        while self.eat_keyword("and") {
            operands.push(self.parse_not_expr()?);
        }
        Ok(wrap_operator(BoolOp::And, operands))
    }

    /// `not_expr := "not" not_expr | atom`
    fn parse_not_expr(&mut self) -> Result<Filter, CompileError> {
        if self.eat_keyword("not") {
            let operand = self.parse_not_expr()?;
            Ok(Filter::Operator {
                op: BoolOp::Not,
                operands: vec![operand],
            })
        } else {
            self.parse_atom()
        }
    }

    /// `atom := "(" filter_expr ")" | tag_filter | attribute_filter | text_filter`
    fn parse_atom(&mut self) -> Result<Filter, CompileError> {
        if self.eat_char('(') {
            let inner = self.parse_or_expr()?;
            self.expect_char(')', &[")"])?;
            return Ok(inner);
        }
        if self.eat_keyword("tag") {
            let value = self.parse_atomic_shape("tag", Self::parse_value_shape)?;
            return Ok(Filter::Atomic {
                filter_type: FilterType::Tag,
                value: FilterValue::Tag(value),
            });
        }
        if self.eat_keyword("text") {
            let value = self.parse_atomic_shape("text", Self::parse_text_value)?;
            return Ok(Filter::Atomic {
                filter_type: FilterType::Text,
                value: FilterValue::Text(value),
            });
        }
        if self.eat_keyword("attribute") {
            let pairs = self.parse_atomic_shape("attribute", Self::parse_attribute_pairs)?;
            return Ok(Filter::Atomic {
                filter_type: FilterType::Attribute,
                value: FilterValue::Attribute(pairs),
            });
        }
        Err(self.unexpected(&["(", "tag", "attribute", "text", "not"]))
    }

    /// Run a value-shape parser and, on failure, report the §4.5.3 table
    /// having been exhausted rather than a bare grammar-level syntax error —
    /// the keyword (`tag`/`text`/`attribute`) was already recognized, so
    /// what follows is a value in the wrong shape, not unexpected input.
    fn parse_atomic_shape<T>(
        &mut self,
        filter_type: &'static str,
        parse: fn(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        let start = self.pos;
        parse(self).map_err(|_| {
            let raw = self.text[start..].trim().to_string();
            ExternalDiagnostic::UnknownAtomicValueShape {
                filter_type: filter_type.to_string(),
                raw,
            }
            .into()
        })
    }

    /// `text_filter := contains_text | STRING | options | "any"` (see §4.5.1
    /// note: `any` is a valid wildcard for `tag`/`text`, not only `attribute`).
    fn parse_text_value(&mut self) -> Result<AtomicValue, CompileError> {
        if self.eat_keyword("contains") {
            return Ok(AtomicValue::Contains(self.parse_contains_payload()?));
        }
        self.parse_value_shape()
    }

    /// `STRING | options | "any"`, normalized to `Values` (options/STRING) or
    /// an empty `Values` list (`any`).
    fn parse_value_shape(&mut self) -> Result<AtomicValue, CompileError> {
        if self.eat_keyword("any") {
            return Ok(AtomicValue::Values(Vec::new()));
        }
        if self.peek_char('[') {
            return Ok(AtomicValue::Values(self.parse_options()?));
        }
        let s = self.parse_string()?;
        Ok(AtomicValue::Values(vec![s]))
    }

    /// `contains_attr | contains_text := "contains" (STRING | options)`,
    /// preserving whether a bare string or a bracketed list was given.
    fn parse_contains_payload(&mut self) -> Result<ContainsValue, CompileError> {
        if self.peek_char('[') {
            Ok(ContainsValue::Many(self.parse_options()?))
        } else {
            Ok(ContainsValue::Single(self.parse_string()?))
        }
    }

    /// `attribute_filter := "attribute" (pair | "[" pair ("," pair)* "]")`
    fn parse_attribute_pairs(&mut self) -> Result<Vec<AttributePair>, CompileError> {
        if self.eat_char('[') {
            let mut pairs = vec![self.parse_pair()?];
            while self.eat_char(',') {
                pairs.push(self.parse_pair()?);
            }
            self.expect_char(']', &["]", ","])?;
            Ok(pairs)
        } else {
            Ok(vec![self.parse_pair()?])
        }
    }

    /// `pair := (STRING | "any") (":" attr_value)?` — a bare key with no
    /// `: value` binds to the `any` wildcard.
    fn parse_pair(&mut self) -> Result<AttributePair, CompileError> {
        let key = if self.eat_keyword("any") {
            None
        } else {
            Some(self.parse_string()?)
        };
        if self.eat_char(':') {
            let value = self.parse_attr_value()?;
            Ok(AttributePair { key, value })
        } else {
            Ok(AttributePair {
                key,
                value: AtomicValue::Values(Vec::new()),
            })
        }
    }

    /// `attr_value := contains_attr | options | STRING | "any"`
    fn parse_attr_value(&mut self) -> Result<AtomicValue, CompileError> {
        if self.eat_keyword("contains") {
            return Ok(AtomicValue::Contains(self.parse_contains_payload()?));
        }
        self.parse_value_shape()
    }

    fn parse_string(&mut self) -> Result<String, CompileError> {
        self.skip_ws();
        if !self.rest().starts_with('"') {
            return Err(self.unexpected(&["STRING"]));
        }
        let body_start = self.pos + 1;
        let closing = self.text[body_start..].find('"').ok_or_else(|| self.unexpected(&["\""]))?;
        let value = self.text[body_start..body_start + closing].to_string();
        self.pos = body_start + closing + 1;
        Ok(value)
    }

    /// `options := "[" STRING ("," STRING)+ "]"`, also accepting a single
    /// bracketed element.
    fn parse_options(&mut self) -> Result<Vec<String>, CompileError> {
        self.expect_char('[', &["["])?;
        let mut values = vec![self.parse_string()?];
        while self.eat_char(',') {
            values.push(self.parse_string()?);
        }
        self.expect_char(']', &["]", ","])?;
        Ok(values)
    }
}

/// A single-operand operator collapses to its lone operand; `and`/`or`
/// require at least two per §8's filter-tree-shape property, so a
/// single-element list here means no trailing keyword was consumed.
fn wrap_operator(op: BoolOp, mut operands: Vec<Filter>) -> Filter {
    if operands.len() == 1 {
        operands.pop().expect("length checked")
    } else {
        Filter::Operator { op, operands }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_filter(raw: &str) -> Filter {
        let source = Source::new(raw);
        match build(raw, 0, &source).expect("builds") {
            Action::Filter { filter, .. } => filter,
        }
    }

    #[test]
    fn classifies_extract_where() {
        assert!(classify(r#"extract where tag "div" -> out;"#));
        assert!(classify(r#"extract from prev where tag "div" -> out;"#));
        assert!(!classify("frobnicate;"));
    }

    #[test]
    fn builds_simple_tag_filter() {
        let filter = build_filter(r#"extract where tag "div" -> out;"#);
        match filter {
            Filter::Atomic { filter_type, value } => {
                assert_eq!(filter_type, FilterType::Tag);
                assert_eq!(value, FilterValue::Tag(AtomicValue::Values(vec!["div".into()])));
            }
            other => panic!("expected atomic filter, got {other:?}"),
        }
    }

    #[test]
    fn builds_and_not_composition() {
        let filter = build_filter(
            r#"extract where tag "div" and not attribute "class":"ad" -> x;"#,
        );
        match filter {
            Filter::Operator { op: BoolOp::And, operands } => {
                assert_eq!(operands.len(), 2);
                match &operands[1] {
                    Filter::Operator { op: BoolOp::Not, operands } => assert_eq!(operands.len(), 1),
                    other => panic!("expected not node, got {other:?}"),
                }
            }
            other => panic!("expected and node, got {other:?}"),
        }
    }

    #[test]
    fn builds_text_contains_list() {
        let filter = build_filter(r#"extract where text contains ["foo","bar"] -> t;"#);
        match filter {
            Filter::Atomic { filter_type: FilterType::Text, value } => {
                assert_eq!(
                    value,
                    FilterValue::Text(AtomicValue::Contains(ContainsValue::Many(vec![
                        "foo".into(),
                        "bar".into()
                    ])))
                );
            }
            other => panic!("expected text filter, got {other:?}"),
        }
    }

    #[test]
    fn builds_mixed_attribute_pairs() {
        let filter = build_filter(
            r#"extract from prev where attribute ["k1":"v1","k2": contains "v2"] -> y;"#,
        );
        match filter {
            Filter::Atomic { filter_type: FilterType::Attribute, value: FilterValue::Attribute(pairs) } => {
                assert_eq!(pairs.len(), 2);
                assert_eq!(pairs[0].key.as_deref(), Some("k1"));
                assert_eq!(pairs[0].value, AtomicValue::Values(vec!["v1".into()]));
                assert_eq!(pairs[1].key.as_deref(), Some("k2"));
                assert_eq!(
                    pairs[1].value,
                    AtomicValue::Contains(ContainsValue::Single("v2".into()))
                );
            }
            other => panic!("expected attribute filter, got {other:?}"),
        }
    }

    #[test]
    fn bare_attribute_key_is_any() {
        let filter = build_filter(r#"extract where attribute "k" -> out;"#);
        match filter {
            Filter::Atomic { value: FilterValue::Attribute(pairs), .. } => {
                assert_eq!(pairs[0].value, AtomicValue::Values(Vec::new()));
            }
            other => panic!("expected attribute filter, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_atom_shape() {
        let statement = r#"extract where bogus "div" -> out;"#;
        let source = Source::new(statement);
        let err = build(statement, 0, &source).unwrap_err();
        match err {
            CompileError::External(ExternalDiagnostic::SyntaxError { .. }) => {}
            other => panic!("expected SyntaxError, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_atomic_value_shape() {
        let statement = "extract where tag 123 -> out;";
        let source = Source::new(statement);
        let err = build(statement, 0, &source).unwrap_err();
        match err {
            CompileError::External(ExternalDiagnostic::UnknownAtomicValueShape { filter_type, .. }) => {
                assert_eq!(filter_type, "tag");
            }
            other => panic!("expected UnknownAtomicValueShape, got {other:?}"),
        }
    }

    #[test]
    fn rejects_statement_that_is_not_an_extract_form() {
        let statement = "not an extract statement;";
        let source = Source::new(statement);
        let err = build(statement, 0, &source).unwrap_err();
        match err {
            CompileError::External(ExternalDiagnostic::BadExtractStatement { statement }) => {
                assert_eq!(statement, "not an extract statement;");
            }
            other => panic!("expected BadExtractStatement, got {other:?}"),
        }
    }
}
