//! Features read directly off a review comment.

use crate::core::{text, LineSpan, Side};
use crate::sources::gerrit::CommentInfo;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommentFeatures {
    /// Message without surrounding whitespace
    pub text: String,
    pub side: Side,
    /// Characters in `text`
    pub len: usize,
}

/// `None` when the comment has no message once trimmed
pub fn extract_comment_features(comment: &CommentInfo) -> Option<CommentFeatures> {
    let text = comment.message.as_deref().unwrap_or("").trim();
    if text.is_empty() {
        return None;
    }
    Some(CommentFeatures {
        text: text.to_string(),
        side: comment.side.unwrap_or_default(),
        len: text::char_len(text),
    })
}

/// Lines the comment is anchored to.
///
/// An explicit range wins over the single `line`; neither (or line 0) means
/// a comment on the file as a whole.
pub fn extract_line_range(comment: &CommentInfo) -> Option<LineSpan> {
    if let Some(range) = comment.range {
        return Some(range.lines());
    }
    comment
        .line
        .filter(|line| *line > 0)
        .map(LineSpan::single)
}
