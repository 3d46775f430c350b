//! Feature records of review comments.
//!
//! [`FeatureExtractor`] combines the comment itself, the code it is attached
//! to, the context around it, blame and the history of the file into one flat
//! [`FeatureRecord`].

pub mod comment;
pub mod extractor;
pub mod record;

pub use comment::{extract_comment_features, extract_line_range, CommentFeatures};
pub use extractor::FeatureExtractor;
pub use record::{diff_features, FeatureRecord};
