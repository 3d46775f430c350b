//! Change-frequency statistics of a file's history.

use crate::core::text;
use crate::sources::gerrit::ChangeInfo;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AuthorChanges {
    pub count: usize,
    /// `count` as a share of all changes
    pub volume: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ChangeMetrics {
    pub count: usize,
    pub unique_authors: usize,
    pub by_owner: AuthorChanges,
    pub by_reviewer: AuthorChanges,
}

/// Summarise past `changes` of a file by who owned them.
pub fn calculate_change_metrics(
    changes: &[ChangeInfo],
    owner_id: i64,
    reviewer_id: i64,
) -> ChangeMetrics {
    let count = changes.len();
    let authored_by = |account_id: i64| {
        let authored = changes
            .iter()
            .filter(|change| change.owner.account_id == account_id)
            .count();
        AuthorChanges {
            count: authored,
            volume: text::ratio(authored, count),
        }
    };

    ChangeMetrics {
        count,
        unique_authors: changes
            .iter()
            .map(|change| change.owner.account_id)
            .collect::<HashSet<_>>()
            .len(),
        by_owner: authored_by(owner_id),
        by_reviewer: authored_by(reviewer_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::gerrit::AccountInfo;

    fn change(number: i64, owner: i64) -> ChangeInfo {
        ChangeInfo {
            id: format!("project~master~I{number}"),
            created: "2020-01-01 00:00:00.000000000".to_string(),
            number,
            owner: AccountInfo {
                account_id: owner,
                name: None,
            },
            current_revision: None,
            more_changes: false,
        }
    }

    #[test]
    fn test_change_metrics() {
        let changes = vec![change(1, 10), change(2, 10), change(3, 20), change(4, 30)];
        let metrics = calculate_change_metrics(&changes, 10, 20);
        assert_eq!(metrics.count, 4);
        assert_eq!(metrics.unique_authors, 3);
        assert_eq!(metrics.by_owner.count, 2);
        assert_eq!(metrics.by_owner.volume, 0.5);
        assert_eq!(metrics.by_reviewer.count, 1);
        assert_eq!(metrics.by_reviewer.volume, 0.25);
    }

    #[test]
    fn test_no_changes() {
        let metrics = calculate_change_metrics(&[], 10, 20);
        assert_eq!(metrics, ChangeMetrics::default());
    }
}
