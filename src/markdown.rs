/// Escape a value for a Markdown table cell: pipes are escaped and line
/// breaks collapsed so a model-written field cannot split the row.
pub(crate) fn escape_cell(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '|' => out.push_str("\\|"),
            '\n' | '\r' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Sanitize user input for embedding in a Markdown heading.
/// Replaces newlines (which would break heading structure) with spaces.
pub(crate) fn sanitize_heading(s: &str) -> String {
    s.chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

/// Escape text placed inside inline emphasis or code spans so a stray
/// `_`, `*` or backtick cannot close the span early.
pub(crate) fn escape_inline(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '_' | '*' | '`' => {
                out.push('\\');
                out.push(c);
            }
            '\n' | '\r' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_pipes_and_newlines() {
        assert_eq!(escape_cell("normal text"), "normal text");
        assert_eq!(escape_cell("a|b\nc"), r"a\|b c");
    }

    #[test]
    fn escapes_emphasis_markers() {
        assert_eq!(escape_inline("plain"), "plain");
        assert_eq!(escape_inline("snake_case *bold*"), r"snake\_case \*bold\*");
        assert_eq!(escape_inline("a`b\nc"), r"a\`b c");
    }

    #[test]
    fn sanitize_heading_replaces_newlines() {
        assert_eq!(sanitize_heading("line1\nline2\rline3"), "line1 line2 line3");
        assert_eq!(sanitize_heading("no newlines"), "no newlines");
    }
}
