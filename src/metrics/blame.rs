//! Attribution of blamed lines to the change owner and the reviewer.

use crate::core::{text, LineSpan};
use crate::sources::gerrit::BlameInfo;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AuthorLines {
    pub lines: usize,
    /// `lines` as a share of the file's blamed lines
    pub volume: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BlameMetrics {
    pub by_owner: AuthorLines,
    pub by_reviewer: AuthorLines,
}

/// Count the lines inside `window` blamed on the owner and on the reviewer.
///
/// Without a window the whole file is used, `[1, last blamed line]`. Entries
/// are not assumed to be disjoint; overlapping ranges are counted twice.
/// Volumes are relative to the last blamed line, whatever the window.
pub fn calculate_blame_metrics(
    blame: &[BlameInfo],
    owner_name: &str,
    reviewer_name: &str,
    window: Option<LineSpan>,
) -> BlameMetrics {
    let all_lines = last_blamed_line(blame);
    let window = window.unwrap_or(LineSpan::new(1, all_lines));

    let attribute = |name: &str| {
        let lines = count_lines_by_author(blame, name, window);
        AuthorLines {
            lines,
            volume: text::ratio(lines, all_lines),
        }
    };

    BlameMetrics {
        by_owner: attribute(owner_name),
        by_reviewer: attribute(reviewer_name),
    }
}

fn last_blamed_line(blame: &[BlameInfo]) -> usize {
    blame
        .iter()
        .flat_map(|entry| &entry.ranges)
        .map(|range| range.end)
        .max()
        .unwrap_or(0)
}

fn count_lines_by_author(blame: &[BlameInfo], author: &str, window: LineSpan) -> usize {
    blame
        .iter()
        .filter(|entry| entry.author == author)
        .flat_map(|entry| &entry.ranges)
        .map(|range| LineSpan::from(*range).overlap(&window))
        .sum()
}
