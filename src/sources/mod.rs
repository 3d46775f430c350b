//! Review data consumed by the feature extractor.
//!
//! A [`ReviewSource`] answers the handful of Gerrit queries the extractor
//! needs. [`SnapshotSource`] serves them from pre-fetched JSON and
//! [`MemoizedSource`] caches the lookups that repeat across comments.

pub mod gerrit;
mod memo;
mod snapshot;
mod traits;

pub use memo::MemoizedSource;
pub use snapshot::{CommentSnapshot, Snapshot, SnapshotSource};
pub use traits::ReviewSource;

use serde::{Deserialize, Serialize};

/// Identity of one labeled review comment
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentMeta {
    pub comment_id: String,
    pub revision_id: String,
    pub change_number: String,
    pub file_path: String,
    pub url: String,
    #[serde(default)]
    pub label: String,
}

impl CommentMeta {
    /// Fields carried into the feature record under `meta.`
    pub fn feature_dict(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut dict = serde_json::Map::new();
        dict.insert("comment_id".into(), self.comment_id.clone().into());
        dict.insert("url".into(), self.url.clone().into());
        dict.insert("label".into(), self.label.clone().into());
        dict
    }
}
