//! Progress feedback for feature extraction.
//!
//! Progress bars are drawn with `indicatif` on stderr, so records written to
//! stdout stay clean.
//!
//! - **Quiet mode**: no progress output (`COMMENTMAP_QUIET` or `--quiet`)
//! - **Non-TTY**: bars are hidden in CI and when stderr is redirected
//!
//! ```rust,no_run
//! use commentmap::progress::{ProgressConfig, ProgressManager, TEMPLATE_COMMENTS};
//!
//! let manager = ProgressManager::new(ProgressConfig::from_env(false));
//! let progress = manager.create_bar(100, TEMPLATE_COMMENTS);
//! for _ in 0..100 {
//!     progress.inc(1);
//! }
//! progress.finish_and_clear();
//! ```

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::sync::Arc;

pub const QUIET_ENV: &str = "COMMENTMAP_QUIET";

pub const TEMPLATE_COMMENTS: &str =
    "💬 {bar:30} {pos}/{len} comments ({percent}%) {msg} - {per_sec} - {eta}";

const PROGRESS_CHARS: &str = "█▓▒░  ";

#[derive(Debug, Clone, Default)]
pub struct ProgressConfig {
    pub quiet_mode: bool,
}

impl ProgressConfig {
    pub fn from_env(quiet: bool) -> Self {
        let env_quiet = std::env::var_os(QUIET_ENV).is_some();
        Self {
            quiet_mode: quiet || env_quiet,
        }
    }

    pub fn should_show_progress(&self) -> bool {
        !self.quiet_mode && std::io::stderr().is_terminal()
    }
}

/// Coordinates the progress bars of one command run
#[derive(Clone)]
pub struct ProgressManager {
    multi: Arc<MultiProgress>,
    config: ProgressConfig,
}

impl ProgressManager {
    pub fn new(config: ProgressConfig) -> Self {
        Self {
            multi: Arc::new(MultiProgress::new()),
            config,
        }
    }

    /// Create a progress bar with the given length and template.
    ///
    /// Returns a hidden bar if progress should not be shown. An invalid
    /// template falls back to the default bar style.
    pub fn create_bar(&self, len: u64, template: &str) -> ProgressBar {
        if !self.config.should_show_progress() {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|e| {
                log::debug!("Invalid progress template {template:?}: {e}");
                ProgressStyle::default_bar()
            })
            .progress_chars(PROGRESS_CHARS);
        let pb = self.multi.add(ProgressBar::new(len));
        pb.set_style(style);
        pb
    }
}
