//! Memoizing wrapper around a [`ReviewSource`].
//!
//! Comments of the same change share their change info, and files commented
//! on repeatedly share their history, so these lookups are cached for the
//! lifetime of the wrapper. Code and blame are passed through.

use super::gerrit::{BlameInfo, ChangeInfo, CommentInfo};
use super::{CommentMeta, ReviewSource};
use crate::core::{text, Side};
use crate::errors::Result;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Thread-safe cache of source lookups, shared by the extraction workers
pub struct MemoizedSource<S> {
    inner: S,
    /// Keyed by change number
    changes: DashMap<String, Option<ChangeInfo>>,
    /// Keyed by comment id
    comments: DashMap<String, Option<CommentInfo>>,
    /// Keyed by (file path, cutoff)
    file_changes: DashMap<(String, String), Vec<ChangeInfo>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<S: ReviewSource> MemoizedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            changes: DashMap::new(),
            comments: DashMap::new(),
            file_changes: DashMap::new(),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Share of cached lookups answered without asking the inner source
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        text::ratio(hits, hits + misses)
    }

    /// Errors are returned but not cached, so a failed lookup is retried.
    fn get_or_fetch<K, V>(
        &self,
        cache: &DashMap<K, V>,
        key: K,
        fetch: impl FnOnce() -> Result<V>,
    ) -> Result<V>
    where
        K: Eq + Hash,
        V: Clone,
    {
        if let Some(cached) = cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = fetch()?;
        cache.insert(key, value.clone());
        Ok(value)
    }
}

impl<S: ReviewSource> ReviewSource for MemoizedSource<S> {
    fn change_info(&self, meta: &CommentMeta) -> Result<Option<ChangeInfo>> {
        self.get_or_fetch(&self.changes, meta.change_number.clone(), || {
            self.inner.change_info(meta)
        })
    }

    fn comment_info(&self, meta: &CommentMeta) -> Result<Option<CommentInfo>> {
        self.get_or_fetch(&self.comments, meta.comment_id.clone(), || {
            self.inner.comment_info(meta)
        })
    }

    fn code(&self, meta: &CommentMeta, side: Side) -> Result<String> {
        self.inner.code(meta, side)
    }

    fn blame(&self, meta: &CommentMeta, side: Side) -> Result<Vec<BlameInfo>> {
        self.inner.blame(meta, side)
    }

    fn file_changes(&self, file_path: &str, cutoff: &str) -> Result<Vec<ChangeInfo>> {
        let key = (file_path.to_string(), cutoff.to_string());
        self.get_or_fetch(&self.file_changes, key, || {
            self.inner.file_changes(file_path, cutoff)
        })
    }
}
