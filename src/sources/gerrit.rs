//! Gerrit REST entities, as returned by the changes and accounts endpoints.
//!
//! Only the fields the feature pipeline reads are modelled; unknown fields
//! are ignored when deserializing.

use crate::core::{LineSpan, Side};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp layout used by Gerrit, always UTC: `2019-02-27 15:56:40.000000000`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parse a Gerrit timestamp
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(rename = "_account_id")]
    pub account_id: i64,
    /// Only present when detailed accounts were requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AccountInfo {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeInfo {
    /// `<project>~<branch>~<Change-Id>`
    pub id: String,
    pub created: String,
    #[serde(rename = "_number")]
    pub number: i64,
    pub owner: AccountInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_revision: Option<String>,
    /// Set on the last change of a truncated query result
    #[serde(
        rename = "_more_changes",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub more_changes: bool,
}

impl ChangeInfo {
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.created)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRange {
    pub start_line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_character: Option<usize>,
    pub end_line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_character: Option<usize>,
}

impl CommentRange {
    /// Lines covered by the range. A range ending on character 0 stops at the
    /// end of the previous line.
    pub fn lines(&self) -> LineSpan {
        let end = match self.end_character {
            Some(0) => self.end_line.saturating_sub(1),
            _ => self.end_line,
        };
        LineSpan::new(self.start_line, end)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    /// Line of a single-line comment, or the end line of `range`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<CommentRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Unset for drafts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AccountInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeInfo {
    pub start: usize,
    pub end: usize,
}

impl From<RangeInfo> for LineSpan {
    fn from(range: RangeInfo) -> Self {
        LineSpan::new(range.start, range.end)
    }
}

/// Lines of a file attributed to one commit author
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameInfo {
    pub author: String,
    #[serde(default)]
    pub ranges: Vec<RangeInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_change_info_from_gerrit_json() {
        let json = r#"{
            "id": "openstack%2Fnova~master~I8f3c",
            "project": "openstack/nova",
            "created": "2019-02-27 15:56:40.000000000",
            "_number": 639653,
            "owner": {"_account_id": 1000, "name": "Jane Doe"},
            "_more_changes": true
        }"#;
        let change: ChangeInfo = serde_json::from_str(json).unwrap();
        assert_eq!(change.number, 639653);
        assert_eq!(change.owner.display_name(), "Jane Doe");
        assert!(change.more_changes);
        assert_eq!(change.current_revision, None);

        let created = change.created_at().unwrap();
        assert_eq!(created.year(), 2019);
        assert_eq!(created.hour(), 15);
    }

    #[test]
    fn test_comment_info_defaults() {
        let comment: CommentInfo = serde_json::from_str(r#"{"message": "Hello"}"#).unwrap();
        assert_eq!(comment.side, None);
        assert_eq!(comment.author, None);
        assert_eq!(comment.message.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_comment_range_lines() {
        let range = CommentRange {
            start_line: 6,
            start_character: Some(5),
            end_line: 9,
            end_character: Some(0),
        };
        assert_eq!(range.lines(), LineSpan::new(6, 8));

        let range = CommentRange {
            start_line: 1,
            start_character: None,
            end_line: 2,
            end_character: None,
        };
        assert_eq!(range.lines(), LineSpan::new(1, 2));
    }

    #[test]
    fn test_account_without_name() {
        let account: AccountInfo = serde_json::from_str(r#"{"_account_id": 7}"#).unwrap();
        assert_eq!(account.display_name(), "");
    }
}
