//! Small string/form helpers shared by the high-level and filter parsers:
//! stripping surrounding quotes off a `STRING` token, and splitting a
//! comma-separated list body into trimmed elements.

/// Strip one layer of matching double quotes, if present.
///
/// `"foo"` becomes `foo`; a string without both surrounding quotes is
/// returned unchanged so callers can feed already-bare identifiers through
/// the same helper.
pub fn strip_quotes(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
}

/// Split a comma-separated list body into trimmed element strings. Empty
/// segments are dropped so a trailing comma doesn't produce an empty entry.
pub fn split_comma_list(body: &str) -> Vec<&str> {
    body.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_matching_quotes() {
        assert_eq!(strip_quotes("\"div\""), "div");
        assert_eq!(strip_quotes("div"), "div");
    }

    #[test]
    fn drops_trailing_comma_segments() {
        assert_eq!(split_comma_list("a, b, "), vec!["a", "b"]);
    }
}
