//! Line-oriented helpers over raw source text.
//!
//! Lines are split like Python's `str.splitlines`: on `\n`, `\r\n`, a lone
//! `\r`, and the vertical tab, form feed, file/group/record separators, NEL
//! and the Unicode line and paragraph separators. Syntax tree rows only
//! advance on `\n`, so on files using the other separators the tree's line
//! numbers and these helpers disagree.

use super::LineSpan;

/// Slice the lines covered by `range` out of `code`, joined with `\n`.
///
/// An absent range, an inverted range or a range entirely past the end of the
/// text all yield an empty string.
pub fn extract_range(code: &str, range: Option<LineSpan>) -> String {
    let Some(range) = range else {
        return String::new();
    };
    let start = range.start.max(1);
    if range.end < start {
        return String::new();
    }

    split_lines(code)
        .into_iter()
        .skip(start - 1)
        .take(range.end - start + 1)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Number of lines in `code`; a trailing newline does not open a new line.
pub fn line_count(code: &str) -> usize {
    split_lines(code).len()
}

/// Lines of `code` without their terminators.
pub fn split_lines(code: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = code.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        if !is_line_boundary(c) {
            continue;
        }
        lines.push(&code[start..index]);
        let mut end = index + c.len_utf8();
        if c == '\r' && chars.next_if(|&(_, next)| next == '\n').is_some() {
            end += 1;
        }
        start = end;
    }
    if start < code.len() {
        lines.push(&code[start..]);
    }
    lines
}

fn is_line_boundary(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r'
            | '\x0b'
            | '\x0c'
            | '\x1c'
            | '\x1d'
            | '\x1e'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

/// Number of characters, as opposed to bytes.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Share of the lines of `full` that `section` spans.
pub fn volume(section: &str, full: &str) -> f64 {
    ratio(line_count(section), line_count(full))
}

/// `part / total`, or 0.0 when `total` is zero.
pub fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Byte offset at which 1-based `line` begins, `None` past the last line.
pub fn line_offset(code: &str, line: usize) -> Option<usize> {
    if line <= 1 {
        return Some(0);
    }
    code.match_indices('\n')
        .nth(line - 2)
        .map(|(index, _)| index + 1)
}

/// Text from byte `column` of `start_line` up to `end_byte`.
///
/// Empty when the bounds do not form a valid slice of `code`.
pub fn source_segment(code: &str, start_line: usize, column: usize, end_byte: usize) -> &str {
    line_offset(code, start_line)
        .and_then(|offset| code.get(offset + column..end_byte))
        .unwrap_or("")
}

/// Remove the indentation common to every non-blank line.
///
/// Lines made only of spaces and tabs are emptied and do not take part in
/// the margin computation. Tabs and spaces are not treated as equivalent.
pub fn dedent(text: &str) -> String {
    let margin = text
        .split('\n')
        .filter(|line| !is_blank(line))
        .map(leading_whitespace)
        .reduce(common_prefix)
        .unwrap_or("");

    text.split('\n')
        .map(|line| {
            if is_blank(line) {
                ""
            } else {
                &line[margin.len()..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_blank(line: &str) -> bool {
    line.chars().all(|c| c == ' ' || c == '\t')
}

fn leading_whitespace(line: &str) -> &str {
    let rest = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - rest.len()]
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let shared = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..shared]
}
