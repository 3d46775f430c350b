//! Metrics calculation module
//!
//! Code metrics describe a piece of Python source by the kinds of nodes it is
//! made of; blame and change metrics attribute lines and past changes of a
//! file to the owner and the reviewer of the change under review.

pub mod blame;
pub mod changes;
pub mod code;

pub use blame::{calculate_blame_metrics, AuthorLines, BlameMetrics};
pub use changes::{calculate_change_metrics, AuthorChanges, ChangeMetrics};
pub use code::{calculate_code_metrics, CodeMetrics, KindTable, NodeCounts};
