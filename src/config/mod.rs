//! Configuration for commentmap, read from `.commentmap.toml`.

mod loader;

pub use loader::{
    directory_ancestors, load_config, load_config_file, load_config_from,
    parse_and_validate_config,
    CONFIG_FILE_NAME,
};

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

fn default_optimal_lines() -> usize {
    20
}

fn default_max_statement_lines() -> usize {
    100
}

fn default_chunk_size() -> usize {
    8
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentmapConfig {
    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub extract: ExtractConfig,
}

impl CommentmapConfig {
    pub fn validate(&self) -> Result<()> {
        self.context.validate()?;
        self.extract.validate()
    }
}

/// Window sizes used when resolving a comment's context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Preferred number of lines in a context snippet (default: 20)
    #[serde(default = "default_optimal_lines")]
    pub optimal_lines: usize,

    /// Statements longer than this are narrowed to a sub-expression
    /// (default: 100)
    #[serde(default = "default_max_statement_lines")]
    pub max_statement_lines: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            optimal_lines: default_optimal_lines(),
            max_statement_lines: default_max_statement_lines(),
        }
    }
}

impl ContextConfig {
    fn validate(&self) -> Result<()> {
        if self.optimal_lines == 0 {
            return Err(Error::Configuration(
                "context.optimal_lines must be at least 1".to_string(),
            ));
        }
        if self.max_statement_lines == 0 {
            return Err(Error::Configuration(
                "context.max_statement_lines must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Batch settings of the `extract` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Comments handed to the worker pool per batch (default: 8)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Worker threads, 0 for one per core
    #[serde(default)]
    pub jobs: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            jobs: 0,
        }
    }
}

impl ExtractConfig {
    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration(
                "extract.chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Contents written by `commentmap init`
pub const DEFAULT_CONFIG_TOML: &str = r#"# commentmap configuration

[context]
# Preferred size of a context snippet, in lines
optimal_lines = 20
# Statements longer than this are narrowed to a sub-expression
max_statement_lines = 100

[extract]
# Comments per parallel batch
chunk_size = 8
# Worker threads, 0 for one per core
jobs = 0
"#;
