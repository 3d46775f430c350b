use super::gerrit::{BlameInfo, ChangeInfo, CommentInfo};
use super::CommentMeta;
use crate::core::Side;
use crate::errors::Result;

/// Gerrit queries needed to extract the features of one comment.
///
/// `Ok(None)` means the entity does not exist; errors are reserved for a
/// source that cannot answer at all.
pub trait ReviewSource: Send + Sync {
    /// Change the comment was made on
    fn change_info(&self, meta: &CommentMeta) -> Result<Option<ChangeInfo>>;

    fn comment_info(&self, meta: &CommentMeta) -> Result<Option<CommentInfo>>;

    /// Full text of the commented file; the old side of a newly added file is
    /// empty
    fn code(&self, meta: &CommentMeta, side: Side) -> Result<String>;

    fn blame(&self, meta: &CommentMeta, side: Side) -> Result<Vec<BlameInfo>>;

    /// Merged changes touching `file_path` created before `cutoff`, a Gerrit
    /// timestamp
    fn file_changes(&self, file_path: &str, cutoff: &str) -> Result<Vec<ChangeInfo>>;
}

impl<S: ReviewSource + ?Sized> ReviewSource for &S {
    fn change_info(&self, meta: &CommentMeta) -> Result<Option<ChangeInfo>> {
        (**self).change_info(meta)
    }

    fn comment_info(&self, meta: &CommentMeta) -> Result<Option<CommentInfo>> {
        (**self).comment_info(meta)
    }

    fn code(&self, meta: &CommentMeta, side: Side) -> Result<String> {
        (**self).code(meta, side)
    }

    fn blame(&self, meta: &CommentMeta, side: Side) -> Result<Vec<BlameInfo>> {
        (**self).blame(meta, side)
    }

    fn file_changes(&self, file_path: &str, cutoff: &str) -> Result<Vec<ChangeInfo>> {
        (**self).file_changes(file_path, cutoff)
    }
}
