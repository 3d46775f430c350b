//! CLI command implementations.
//!
//! - **extract**: feature records for every comment of a snapshot
//! - **metrics**: code metrics of one Python file
//! - **context**: the context resolved for a range of lines
//! - **init**: write a default `.commentmap.toml`

pub mod context;
pub mod extract;
pub mod init;
pub mod metrics;

pub use context::{run_context, ContextOptions};
pub use extract::{extract_records, run_extract, sort_records, ExtractOptions};
pub use init::init_config;
pub use metrics::run_metrics;
