pub mod text;

use serde::{Deserialize, Serialize};

/// Inclusive, 1-based range of source lines.
///
/// A span whose `end` is before its `start` is valid and covers no lines; it
/// appears when a comment range ends on column 0 of its first line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(line: usize) -> Self {
        Self::new(line, line)
    }

    /// Number of lines covered, 0 for inverted spans
    pub fn len(&self) -> usize {
        (self.end + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `other` lies fully inside this span
    pub fn contains(&self, other: &LineSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Number of lines shared with `other`, never negative
    pub fn overlap(&self, other: &LineSpan) -> usize {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (end + 1).saturating_sub(start)
    }
}

/// Which version of a file a review comment is attached to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// The file before the change
    Parent,
    /// The file after the change
    #[default]
    Revision,
}

impl Side {
    /// Pick the old or new variant depending on the side
    pub fn select<T>(self, old: T, new: T) -> T {
        match self {
            Side::Parent => old,
            Side::Revision => new,
        }
    }
}
