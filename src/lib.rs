//! Feature extraction for code-review comments on Python files.
//!
//! For every review comment, commentmap parses the commented file, resolves
//! the code context around the commented lines and computes code, blame and
//! change-history metrics, producing one flat [`FeatureRecord`].

pub mod analyzers;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod features;
pub mod interrupt;
pub mod io;
pub mod metrics;
pub mod progress;
pub mod sources;

pub use crate::analyzers::python::{AstKind, SyntaxTree};
pub use crate::config::{CommentmapConfig, ContextConfig};
pub use crate::context::{extract_context, Context};
pub use crate::core::{LineSpan, Side};
pub use crate::errors::{Error, Result};
pub use crate::features::{FeatureExtractor, FeatureRecord};
pub use crate::metrics::{
    calculate_blame_metrics, calculate_change_metrics, calculate_code_metrics,
};
pub use crate::sources::{CommentMeta, MemoizedSource, ReviewSource, SnapshotSource};
