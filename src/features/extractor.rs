use super::comment::{extract_comment_features, extract_line_range};
use super::record::{diff_features, FeatureRecord};
use crate::analyzers::python;
use crate::config::ContextConfig;
use crate::context::extract_context;
use crate::core::{text, LineSpan, Side};
use crate::errors::Result;
use crate::metrics::{calculate_blame_metrics, calculate_change_metrics, calculate_code_metrics};
use crate::sources::{CommentMeta, ReviewSource};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Builds the feature record of one comment from the data of a
/// [`ReviewSource`].
pub struct FeatureExtractor<S> {
    source: S,
    context: ContextConfig,
}

impl<S: ReviewSource> FeatureExtractor<S> {
    pub fn new(source: S, context: ContextConfig) -> Self {
        Self { source, context }
    }

    /// Extract the features of the comment identified by `meta`.
    ///
    /// Returns `Ok(None)` for comments that cannot be described: unknown
    /// change or comment, no author, an empty message, or a file version that
    /// is not valid Python. Errors come from the source only.
    pub fn extract(&self, meta: &CommentMeta) -> Result<Option<FeatureRecord>> {
        let id = &meta.comment_id;
        let Some(change) = self.source.change_info(meta)? else {
            log::debug!("Skipping comment {id}: change {} not found", meta.change_number);
            return Ok(None);
        };
        let Some(comment) = self.source.comment_info(meta)? else {
            log::debug!("Skipping comment {id}: comment not found");
            return Ok(None);
        };
        let Some(reviewer) = comment.author.as_ref() else {
            log::debug!("Skipping comment {id}: no author");
            return Ok(None);
        };
        let Some(comment_features) = extract_comment_features(&comment) else {
            log::debug!("Skipping comment {id}: empty message");
            return Ok(None);
        };

        let code_old = self.source.code(meta, Side::Parent)?;
        let code_new = self.source.code(meta, Side::Revision)?;
        let (tree_old, tree_new) = match (python::parse(&code_old), python::parse(&code_new)) {
            (Ok(old), Ok(new)) => (old, new),
            (Err(e), _) | (_, Err(e)) => {
                log::debug!("Skipping comment {id}: {} is not valid Python: {e}", meta.file_path);
                return Ok(None);
            }
        };
        let blame_old = self.source.blame(meta, Side::Parent)?;
        let blame_new = self.source.blame(meta, Side::Revision)?;

        let owner_name = change.owner.display_name();
        let reviewer_name = reviewer.display_name();

        let old = merge([
            to_object(&calculate_code_metrics(&code_old, Some(tree_old.as_subtree()))?)?,
            to_object(&calculate_blame_metrics(&blame_old, owner_name, reviewer_name, None))?,
        ]);
        let new = merge([
            to_object(&calculate_code_metrics(&code_new, Some(tree_new.as_subtree()))?)?,
            to_object(&calculate_blame_metrics(&blame_new, owner_name, reviewer_name, None))?,
        ]);
        let diff = diff_features(&old, &new);

        let side = comment_features.side;
        let code = side.select(&code_old, &code_new);
        let blame = side.select(&blame_old, &blame_new);
        let line_range = extract_line_range(&comment);

        let range_text = text::extract_range(code, line_range);
        let range = merge([
            to_object(&json!({
                "text": range_text,
                "volume": text::volume(&range_text, code),
                "len": text::char_len(&range_text),
                "lines": text::line_count(&range_text),
            }))?,
            to_object(&calculate_blame_metrics(blame, owner_name, reviewer_name, line_range))?,
        ]);

        let ctx = extract_context(code, line_range, &self.context)?;
        // A comment without an anchored context is attributed no lines
        let ctx_window = ctx.span.unwrap_or(LineSpan::new(1, 0));
        let context = merge([
            to_object(&json!({
                "text": ctx.text,
                "volume": text::volume(&ctx.text, code),
            }))?,
            to_object(&calculate_code_metrics(&ctx.text, Some(ctx.subtree()))?)?,
            to_object(&calculate_blame_metrics(
                blame,
                owner_name,
                reviewer_name,
                Some(ctx_window),
            ))?,
        ]);

        let history = self.source.file_changes(&meta.file_path, &change.created)?;
        let changes = calculate_change_metrics(&history, change.owner.account_id, reviewer.account_id);

        let mut meta_features = meta.feature_dict();
        meta_features.insert("start_line".into(), line_range.map(|r| r.start).into());
        meta_features.insert("end_line".into(), line_range.map(|r| r.end).into());

        let record = to_object(&json!({
            "meta": meta_features,
            "comment": to_object(&comment_features)?,
            "code": {
                "old": old,
                "new": new,
                "diff": diff,
                "range": range,
                "context": context,
            },
            "changes": to_object(&changes)?,
        }))?;
        Ok(Some(FeatureRecord::from_nested(record)))
    }
}

fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => {
            let mut map = Map::new();
            map.insert("value".into(), other);
            Ok(map)
        }
    }
}

/// Union of `parts`, later keys overwriting earlier ones
fn merge<const N: usize>(parts: [Map<String, Value>; N]) -> Map<String, Value> {
    parts.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::sources::gerrit::{AccountInfo, BlameInfo, ChangeInfo, CommentInfo, RangeInfo};
    use crate::sources::{CommentSnapshot, Snapshot, SnapshotSource};
    use indoc::indoc;
    use std::collections::BTreeMap;

    const CODE_OLD: &str = indoc! {"
        def add(a, b):
            return a + b
    "};

    const CODE_NEW: &str = indoc! {"
        def add(a, b):
            if a is None:
                return b
            return a + b


        VALUE = add(1, 2)
    "};

    fn account(id: i64, name: &str) -> AccountInfo {
        AccountInfo {
            account_id: id,
            name: Some(name.to_string()),
        }
    }

    fn change(id: &str, created: &str, owner: AccountInfo) -> ChangeInfo {
        ChangeInfo {
            id: id.to_string(),
            created: created.to_string(),
            number: 42,
            owner,
            current_revision: None,
            more_changes: false,
        }
    }

    fn meta() -> CommentMeta {
        CommentMeta {
            comment_id: "c1".into(),
            revision_id: "rev".into(),
            change_number: "42".into(),
            file_path: "pkg/calc.py".into(),
            url: "https://review.example.org/c/42".into(),
            label: "FUNCTIONAL".into(),
        }
    }

    fn entry(comment: CommentInfo) -> CommentSnapshot {
        CommentSnapshot {
            meta: meta(),
            change: Some(change("p~master~I42", "2020-05-01 12:00:00.000000000", account(1, "Olive"))),
            comment: Some(comment),
            code_old: Some(CODE_OLD.to_string()),
            code_new: Some(CODE_NEW.to_string()),
            blame_old: vec![BlameInfo {
                author: "Rey".into(),
                ranges: vec![RangeInfo { start: 1, end: 2 }],
            }],
            blame_new: vec![
                BlameInfo {
                    author: "Olive".into(),
                    ranges: vec![RangeInfo { start: 2, end: 3 }, RangeInfo { start: 7, end: 7 }],
                },
                BlameInfo {
                    author: "Rey".into(),
                    ranges: vec![RangeInfo { start: 1, end: 1 }, RangeInfo { start: 4, end: 6 }],
                },
            ],
        }
    }

    fn comment_on_line(line: usize) -> CommentInfo {
        CommentInfo {
            id: "c1".into(),
            line: Some(line),
            message: Some(" Handle None? ".into()),
            author: Some(account(2, "Rey")),
            ..CommentInfo::default()
        }
    }

    fn extractor(entry: CommentSnapshot) -> FeatureExtractor<SnapshotSource> {
        let file_changes = BTreeMap::from([(
            "pkg/calc.py".to_string(),
            vec![
                change("a", "2020-01-01 00:00:00.000000000", account(1, "Olive")),
                change("b", "2020-02-01 00:00:00.000000000", account(3, "Finn")),
                change("later", "2020-06-01 00:00:00.000000000", account(2, "Rey")),
            ],
        )]);
        let source = SnapshotSource::new(Snapshot {
            comments: vec![entry],
            file_changes,
        });
        FeatureExtractor::new(source, ContextConfig::default())
    }

    #[test]
    fn test_extract_line_comment() {
        let record = extractor(entry(comment_on_line(2)))
            .extract(&meta())
            .unwrap()
            .unwrap();

        assert_eq!(record.comment_id(), Some("c1"));
        assert_eq!(record.get("meta.start_line"), Some(&json!(2)));
        assert_eq!(record.get("meta.end_line"), Some(&json!(2)));
        assert_eq!(record.get("comment.text"), Some(&json!("Handle None?")));
        assert_eq!(record.get("comment.side"), Some(&json!("REVISION")));
        assert_eq!(record.get("comment.len"), Some(&json!(12)));

        assert_eq!(record.get("code.old.cyc_comp"), Some(&json!(1)));
        assert_eq!(record.get("code.new.cyc_comp"), Some(&json!(2)));
        assert_eq!(record.get("code.diff.cyc_comp"), Some(&json!(1)));
        assert_eq!(record.get("code.new.by_owner.lines"), Some(&json!(3)));
        assert_eq!(record.get("code.new.by_reviewer.lines"), Some(&json!(4)));

        assert_eq!(record.get("code.range.text"), Some(&json!("    if a is None:")));
        assert_eq!(record.get("code.range.lines"), Some(&json!(1)));
        assert_eq!(record.get("code.range.by_owner.lines"), Some(&json!(1)));
        assert_eq!(record.get("code.range.by_reviewer.lines"), Some(&json!(0)));

        // The enclosing function is the context
        assert_eq!(record.get("code.context.lines"), Some(&json!(4)));
        assert_eq!(record.get("code.context.cyc_comp"), Some(&json!(2)));
        assert_eq!(record.get("code.context.by_owner.lines"), Some(&json!(2)));
        assert_eq!(record.get("code.context.by_reviewer.lines"), Some(&json!(2)));

        // Only changes created before this one count
        assert_eq!(record.get("changes.count"), Some(&json!(2)));
        assert_eq!(record.get("changes.unique_authors"), Some(&json!(2)));
        assert_eq!(record.get("changes.by_owner.count"), Some(&json!(1)));
        assert_eq!(record.get("changes.by_reviewer.count"), Some(&json!(0)));
    }

    #[test]
    fn test_file_comment_has_no_context() {
        let mut comment = comment_on_line(0);
        comment.line = None;
        let record = extractor(entry(comment)).extract(&meta()).unwrap().unwrap();

        assert_eq!(record.get("meta.start_line"), Some(&Value::Null));
        assert_eq!(record.get("code.range.text"), Some(&json!("")));
        assert_eq!(record.get("code.range.volume"), Some(&json!(0.0)));
        assert_eq!(record.get("code.range.by_owner.lines"), Some(&json!(3)));
        assert_eq!(record.get("code.context.text"), Some(&json!("")));
        assert_eq!(record.get("code.context.cyc_comp"), Some(&json!(1)));
        assert_eq!(record.get("code.context.by_owner.lines"), Some(&json!(0)));
    }

    #[test]
    fn test_parent_side_uses_old_code() {
        let mut comment = comment_on_line(2);
        comment.side = Some(Side::Parent);
        let record = extractor(entry(comment)).extract(&meta()).unwrap().unwrap();

        assert_eq!(record.get("comment.side"), Some(&json!("PARENT")));
        assert_eq!(record.get("code.range.text"), Some(&json!("    return a + b")));
        assert_eq!(record.get("code.range.by_reviewer.lines"), Some(&json!(1)));
    }

    #[test]
    fn test_skips_undescribable_comments() {
        let mut no_author = comment_on_line(2);
        no_author.author = None;
        assert!(extractor(entry(no_author)).extract(&meta()).unwrap().is_none());

        let mut empty = comment_on_line(2);
        empty.message = Some("   ".into());
        assert!(extractor(entry(empty)).extract(&meta()).unwrap().is_none());

        let mut invalid = entry(comment_on_line(2));
        invalid.code_new = Some("def broken(:\n".into());
        assert!(extractor(invalid).extract(&meta()).unwrap().is_none());

        let mut missing_change = entry(comment_on_line(2));
        missing_change.change = None;
        assert!(extractor(missing_change).extract(&meta()).unwrap().is_none());
    }

    #[test]
    fn test_source_errors_propagate() {
        let mut unknown = meta();
        unknown.comment_id = "nope".into();
        let err = extractor(entry(comment_on_line(2)))
            .extract(&unknown)
            .unwrap_err();
        assert!(matches!(err, Error::Source(_)));
    }
}
