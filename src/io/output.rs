use crate::features::FeatureRecord;
use anyhow::Context;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    JsonLines,
    /// A single pretty-printed JSON array
    Json,
}

pub trait OutputWriter {
    fn write_records(&mut self, records: &[FeatureRecord]) -> anyhow::Result<()>;
}

pub struct JsonLinesWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for JsonLinesWriter<W> {
    fn write_records(&mut self, records: &[FeatureRecord]) -> anyhow::Result<()> {
        for record in records {
            serde_json::to_writer(&mut self.writer, record)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    fn write_records(&mut self, records: &[FeatureRecord]) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, records)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Writer for `format`, to `output` or stdout.
pub fn create_writer(
    format: OutputFormat,
    output: Option<&Path>,
) -> anyhow::Result<Box<dyn OutputWriter>> {
    let sink: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout().lock()),
    };
    Ok(match format {
        OutputFormat::JsonLines => Box::new(JsonLinesWriter::new(sink)),
        OutputFormat::Json => Box::new(JsonWriter::new(sink)),
    })
}

/// Read records written by either writer; a missing file holds none.
pub fn read_records(path: &Path) -> anyhow::Result<Vec<FeatureRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    if contents.trim_start().starts_with('[') {
        return serde_json::from_str(&contents)
            .with_context(|| format!("Invalid feature records in {}", path.display()));
    }

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line).with_context(|| {
                format!("Invalid feature record at {}:{}", path.display(), number + 1)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn record(id: &str, len: usize) -> FeatureRecord {
        match json!({"meta": {"comment_id": id}, "comment": {"len": len}}) {
            Value::Object(map) => FeatureRecord::from_nested(map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_json_lines_writer() {
        let mut buffer = Vec::new();
        JsonLinesWriter::new(&mut buffer)
            .write_records(&[record("a", 1), record("b", 2)])
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "{\"comment.len\":1,\"meta.comment_id\":\"a\"}\n{\"comment.len\":2,\"meta.comment_id\":\"b\"}\n"
        );
    }

    #[test]
    fn test_read_back_both_formats() {
        let temp = TempDir::new().unwrap();
        let records = vec![record("a", 1), record("b", 2)];

        let lines = temp.path().join("features.jsonl");
        create_writer(OutputFormat::JsonLines, Some(&lines))
            .unwrap()
            .write_records(&records)
            .unwrap();
        assert_eq!(read_records(&lines).unwrap(), records);

        let array = temp.path().join("features.json");
        create_writer(OutputFormat::Json, Some(&array))
            .unwrap()
            .write_records(&records)
            .unwrap();
        assert_eq!(read_records(&array).unwrap(), records);
    }

    #[test]
    fn test_read_missing_and_blank_lines() {
        let temp = TempDir::new().unwrap();
        assert!(read_records(&temp.path().join("none.jsonl")).unwrap().is_empty());

        let path = temp.path().join("gaps.jsonl");
        fs::write(&path, "{\"meta.comment_id\":\"a\"}\n\n").unwrap();
        assert_eq!(read_records(&path).unwrap().len(), 1);

        fs::write(&path, "{\"meta.comment_id\":\"a\"}\nnot json\n").unwrap();
        let err = read_records(&path).unwrap_err();
        assert!(format!("{err:#}").contains(":2"));
    }
}
