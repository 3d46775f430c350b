use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::CommentmapConfig;
use crate::errors::{Error, Result};

pub const CONFIG_FILE_NAME: &str = ".commentmap.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

pub(crate) fn read_config_file(path: &Path) -> std::result::Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Parse a TOML document and check its values
pub fn parse_and_validate_config(contents: &str) -> Result<CommentmapConfig> {
    let config = toml::from_str::<CommentmapConfig>(contents)?;
    config.validate()?;
    Ok(config)
}

/// Load `path`, `Ok(None)` when it does not exist.
///
/// An unreadable file is only logged; a file that exists but does not parse
/// or validate is an error.
pub(crate) fn try_load_config_from_path(config_path: &Path) -> Result<Option<CommentmapConfig>> {
    let contents = match read_config_file(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return Ok(None);
        }
    };

    let config = parse_and_validate_config(&contents)
        .map_err(|e| Error::Configuration(format!("{}: {}", config_path.display(), e)))?;
    log::debug!("Loaded config from {}", config_path.display());
    Ok(Some(config))
}

pub(crate) fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    // Only log actual errors, not "file not found"
    if error.kind() != std::io::ErrorKind::NotFound {
        log::warn!(
            "Failed to read config file {}: {}",
            config_path.display(),
            error
        );
    }
}

/// `start` followed by its parents, at most `max_depth` directories
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Search `start` and its ancestors for the nearest config file.
pub fn load_config_from(start: PathBuf) -> Result<CommentmapConfig> {
    for dir in directory_ancestors(start, MAX_TRAVERSAL_DEPTH) {
        if let Some(config) = try_load_config_from_path(&dir.join(CONFIG_FILE_NAME))? {
            return Ok(config);
        }
    }

    log::debug!(
        "No config found after checking {} directories. Using default config.",
        MAX_TRAVERSAL_DEPTH
    );
    Ok(CommentmapConfig::default())
}

/// Load a config file named explicitly; unlike discovery, it must exist.
pub fn load_config_file(path: &Path) -> Result<CommentmapConfig> {
    let contents = read_config_file(path)
        .map_err(|e| Error::file_system("Failed to read config file", path, e))?;
    parse_and_validate_config(&contents)
        .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))
}

/// Search the working directory and its ancestors for the nearest config file.
pub fn load_config() -> Result<CommentmapConfig> {
    let current = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            log::warn!(
                "Failed to get current directory: {}. Using default config.",
                e
            );
            return Ok(CommentmapConfig::default());
        }
    };
    load_config_from(current)
}
