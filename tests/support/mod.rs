//! Snapshot fixtures shared by the integration tests

#![allow(dead_code)]

use indoc::indoc;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const CODE_OLD: &str = indoc! {r#"
    import os


    def load(path):
        with open(path) as handle:
            return handle.read()
"#};

pub const CODE_NEW: &str = indoc! {r#"
    import os


    @cached
    def load(path):
        if not os.path.exists(path):
            return None
        with open(path) as handle:
            return handle.read()


    DEFAULTS = {"root": "/tmp", "retries": 3}
"#};

pub fn account(id: i64, name: &str) -> Value {
    json!({"_account_id": id, "name": name})
}

pub fn change(id: &str, created: &str, owner: Value) -> Value {
    json!({"id": id, "created": created, "_number": 7, "owner": owner})
}

pub fn meta(comment_id: &str) -> Value {
    json!({
        "comment_id": comment_id,
        "revision_id": "0f1e2d",
        "change_number": "7",
        "file_path": "pkg/files.py",
        "url": format!("https://review.example.org/c/pkg/+/7/1/pkg/files.py#{comment_id}"),
        "label": "FUNCTIONAL",
    })
}

/// A comment by Rey on the change owned by Olive
pub fn comment_entry(comment_id: &str, comment: Value) -> Value {
    json!({
        "meta": meta(comment_id),
        "change": change("pkg~main~I7", "2021-03-10 09:30:00.000000000", account(1, "Olive")),
        "comment": comment,
        "code_old": CODE_OLD,
        "code_new": CODE_NEW,
        "blame_old": [
            {"author": "Rey", "ranges": [{"start": 1, "end": 6}]}
        ],
        "blame_new": [
            {"author": "Rey", "ranges": [{"start": 1, "end": 3}, {"start": 8, "end": 9}]},
            {"author": "Olive", "ranges": [{"start": 4, "end": 7}, {"start": 10, "end": 12}]}
        ],
    })
}

pub fn line_comment(comment_id: &str, line: usize, message: &str) -> Value {
    json!({
        "id": comment_id,
        "line": line,
        "message": message,
        "author": account(2, "Rey"),
    })
}

pub fn file_history() -> Value {
    json!({
        "pkg/files.py": [
            change("h1", "2020-11-02 10:00:00.000000000", account(2, "Rey")),
            change("h2", "2021-01-15 16:20:00.000000000", account(1, "Olive")),
            change("h3", "2021-02-01 08:00:00.000000000", account(2, "Rey")),
            change("h4", "2021-04-01 08:00:00.000000000", account(3, "Finn")),
        ]
    })
}

pub fn snapshot(comments: Vec<Value>) -> Value {
    json!({"comments": comments, "file_changes": file_history()})
}

pub fn write_snapshot(dir: &Path, name: &str, comments: Vec<Value>) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(&snapshot(comments)).unwrap()).unwrap();
    path
}
