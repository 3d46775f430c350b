//! Review data pre-fetched from Gerrit and stored as JSON.
//!
//! A snapshot file holds the entities of any number of comments plus the
//! change history of the files they touch:
//!
//! ```json
//! {
//!   "comments": [
//!     {
//!       "meta": {"comment_id": "...", "revision_id": "...", "change_number": "...",
//!                "file_path": "...", "url": "...", "label": "..."},
//!       "change": { ChangeInfo },
//!       "comment": { CommentInfo },
//!       "code_old": "...", "code_new": "...",
//!       "blame_old": [ BlameInfo ], "blame_new": [ BlameInfo ]
//!     }
//!   ],
//!   "file_changes": { "path/to/file.py": [ ChangeInfo ] }
//! }
//! ```
//!
//! A directory is read by merging every `*.json` file below it.

use super::gerrit::{parse_timestamp, BlameInfo, ChangeInfo, CommentInfo};
use super::{CommentMeta, ReviewSource};
use crate::core::Side;
use crate::errors::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub comments: Vec<CommentSnapshot>,
    #[serde(default)]
    pub file_changes: BTreeMap<String, Vec<ChangeInfo>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentSnapshot {
    pub meta: CommentMeta,
    #[serde(default)]
    pub change: Option<ChangeInfo>,
    #[serde(default)]
    pub comment: Option<CommentInfo>,
    /// Absent when the change adds the file
    #[serde(default)]
    pub code_old: Option<String>,
    #[serde(default)]
    pub code_new: Option<String>,
    #[serde(default)]
    pub blame_old: Vec<BlameInfo>,
    #[serde(default)]
    pub blame_new: Vec<BlameInfo>,
}

#[derive(Debug, Default)]
pub struct SnapshotSource {
    comments: HashMap<String, CommentSnapshot>,
    /// Comment ids in the order they were loaded
    order: Vec<String>,
    file_changes: HashMap<String, Vec<ChangeInfo>>,
}

impl SnapshotSource {
    pub fn new(snapshot: Snapshot) -> Self {
        let mut source = Self::default();
        source.merge(snapshot);
        source
    }

    /// Load a snapshot file, or every `*.json` file below a directory.
    pub fn load(path: &Path) -> Result<Self> {
        let mut source = Self::default();
        for file in snapshot_files(path)? {
            let contents = fs::read_to_string(&file)
                .map_err(|e| Error::file_system("Failed to read snapshot", &file, e))?;
            let snapshot: Snapshot = serde_json::from_str(&contents)
                .map_err(Error::from)
                .context(format!("Invalid snapshot {}", file.display()))?;
            log::debug!(
                "Loaded {} comments from {}",
                snapshot.comments.len(),
                file.display()
            );
            source.merge(snapshot);
        }
        Ok(source)
    }

    /// Add the entries of `snapshot`; a later entry for the same comment
    /// replaces the earlier one.
    pub fn merge(&mut self, snapshot: Snapshot) {
        for entry in snapshot.comments {
            let id = entry.meta.comment_id.clone();
            if self.comments.insert(id.clone(), entry).is_none() {
                self.order.push(id);
            }
        }
        for (path, changes) in snapshot.file_changes {
            let known = self.file_changes.entry(path).or_default();
            let mut seen: HashSet<String> = known.iter().map(|c| c.id.clone()).collect();
            known.extend(changes.into_iter().filter(|c| seen.insert(c.id.clone())));
        }
    }

    /// Comments available in this snapshot, in load order
    pub fn metas(&self) -> Vec<CommentMeta> {
        self.order
            .iter()
            .filter_map(|id| self.comments.get(id))
            .map(|entry| entry.meta.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn entry(&self, meta: &CommentMeta) -> Result<&CommentSnapshot> {
        self.comments.get(&meta.comment_id).ok_or_else(|| {
            Error::source(format!("no snapshot entry for comment {}", meta.comment_id))
        })
    }
}

impl ReviewSource for SnapshotSource {
    fn change_info(&self, meta: &CommentMeta) -> Result<Option<ChangeInfo>> {
        Ok(self.entry(meta)?.change.clone())
    }

    fn comment_info(&self, meta: &CommentMeta) -> Result<Option<CommentInfo>> {
        Ok(self.entry(meta)?.comment.clone())
    }

    fn code(&self, meta: &CommentMeta, side: Side) -> Result<String> {
        let entry = self.entry(meta)?;
        match side {
            Side::Parent => Ok(entry.code_old.clone().unwrap_or_default()),
            Side::Revision => entry.code_new.clone().ok_or_else(|| {
                Error::source(format!(
                    "no new code of {} for comment {}",
                    meta.file_path, meta.comment_id
                ))
            }),
        }
    }

    fn blame(&self, meta: &CommentMeta, side: Side) -> Result<Vec<BlameInfo>> {
        let entry = self.entry(meta)?;
        Ok(side.select(&entry.blame_old, &entry.blame_new).clone())
    }

    fn file_changes(&self, file_path: &str, cutoff: &str) -> Result<Vec<ChangeInfo>> {
        let cutoff = parse_timestamp(cutoff)
            .ok_or_else(|| Error::source(format!("invalid cutoff timestamp '{cutoff}'")))?;
        let Some(changes) = self.file_changes.get(file_path) else {
            return Ok(Vec::new());
        };

        Ok(changes
            .iter()
            .filter(|change| match change.created_at() {
                Some(created) => created < cutoff,
                None => {
                    log::debug!("Ignoring change {} with unreadable timestamp", change.id);
                    false
                }
            })
            .cloned()
            .collect())
    }
}

fn snapshot_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::source(format!("Failed to walk {}: {}", path.display(), e))
        })?;
        let is_json = entry.path().extension().and_then(|s| s.to_str()) == Some("json");
        if entry.file_type().is_file() && is_json {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
