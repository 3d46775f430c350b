use crate::cli::OutputFormat;
use crate::config;
use crate::features::{FeatureExtractor, FeatureRecord};
use crate::interrupt;
use crate::io;
use crate::progress::{ProgressConfig, ProgressManager, TEMPLATE_COMMENTS};
use crate::sources::{CommentMeta, MemoizedSource, ReviewSource, SnapshotSource};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct ExtractOptions {
    pub snapshot: PathBuf,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub jobs: Option<usize>,
    pub chunk_size: Option<usize>,
    pub resume: bool,
    pub config: Option<PathBuf>,
    pub quiet: bool,
}

pub fn run_extract(options: ExtractOptions) -> Result<()> {
    let config = match &options.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config()?,
    };
    let chunk_size = options.chunk_size.unwrap_or(config.extract.chunk_size);
    if chunk_size == 0 {
        anyhow::bail!("--chunk-size must be at least 1");
    }
    let jobs = options.jobs.unwrap_or(config.extract.jobs);

    let source = SnapshotSource::load(&options.snapshot)
        .with_context(|| format!("Failed to load snapshot {}", options.snapshot.display()))?;
    log::info!("Loaded {} comments from {}", source.len(), options.snapshot.display());

    let mut records = match (&options.output, options.resume) {
        (Some(output), true) => io::read_records(output)?,
        _ => Vec::new(),
    };
    let done: HashSet<String> = records
        .iter()
        .filter_map(|r| r.comment_id().map(str::to_string))
        .collect();
    let pending: Vec<CommentMeta> = source
        .metas()
        .into_iter()
        .filter(|meta| !done.contains(&meta.comment_id))
        .collect();
    if !done.is_empty() {
        log::info!(
            "Resuming: {} records kept, {} comments left",
            done.len(),
            pending.len()
        );
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("Failed to build worker pool")?;
    let memo = MemoizedSource::new(source);
    let extractor = FeatureExtractor::new(&memo, config.context);

    let manager = ProgressManager::new(ProgressConfig::from_env(options.quiet));
    let progress = manager.create_bar(pending.len() as u64, TEMPLATE_COMMENTS);
    interrupt::install_handler();
    let stop = interrupt::stop_flag();
    let extracted = pool.install(|| {
        extract_records(&extractor, &pending, chunk_size, &progress, stop, || {
            format!("cache hit ratio {:.2}", memo.hit_ratio())
        })
    });
    let processed = progress.position() as usize;
    progress.finish_and_clear();
    log::info!(
        "Extracted {} records, skipped {} comments",
        extracted.len(),
        processed - extracted.len()
    );

    records.extend(extracted);
    sort_records(&mut records);
    write_output(&records, &options)?;

    if stop.load(Ordering::SeqCst) {
        anyhow::bail!(
            "Interrupted after {processed} of {} comments; {} records saved, \
             rerun with --resume to continue",
            pending.len(),
            records.len()
        );
    }
    Ok(())
}

/// Extract `metas` chunk by chunk, each chunk in parallel on the current
/// rayon pool.
///
/// A comment whose extraction fails is logged and skipped; the others are
/// returned in input order. Once `stop` is set no further chunk is started
/// and the records of the finished chunks are returned.
pub fn extract_records<S: ReviewSource>(
    extractor: &FeatureExtractor<S>,
    metas: &[CommentMeta],
    chunk_size: usize,
    progress: &ProgressBar,
    stop: &AtomicBool,
    status: impl Fn() -> String,
) -> Vec<FeatureRecord> {
    let mut records = Vec::with_capacity(metas.len());
    let mut remaining = metas.len();
    for chunk in metas.chunks(chunk_size.max(1)) {
        if stop.load(Ordering::SeqCst) {
            log::warn!("Stopping with {remaining} comments left");
            break;
        }
        remaining -= chunk.len();
        let results: Vec<Option<FeatureRecord>> = chunk
            .par_iter()
            .map(|meta| match extractor.extract(meta) {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("Failed to extract comment {}: {}", meta.comment_id, e);
                    None
                }
            })
            .collect();
        records.extend(results.into_iter().flatten());
        progress.inc(chunk.len() as u64);
        progress.set_message(status());
    }
    records
}

/// Order records by comment id
pub fn sort_records(records: &mut [FeatureRecord]) {
    records.sort_by(|a, b| a.comment_id().cmp(&b.comment_id()));
}

fn write_output(records: &[FeatureRecord], options: &ExtractOptions) -> Result<()> {
    let mut writer = io::create_writer(options.format.into(), options.output.as_deref())?;
    writer.write_records(records)?;
    if let Some(output) = &options.output {
        log::info!("Wrote {} records to {}", records.len(), output.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(id: &str) -> FeatureRecord {
        match json!({"meta": {"comment_id": id}}) {
            Value::Object(map) => FeatureRecord::from_nested(map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_sort_records_by_comment_id() {
        let mut records = vec![record("c"), record("a"), record("b")];
        sort_records(&mut records);
        let ids: Vec<_> = records.iter().filter_map(|r| r.comment_id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_extract_records_skips_failures() {
        let source = SnapshotSource::default();
        let extractor = FeatureExtractor::new(&source, Default::default());
        let metas = vec![CommentMeta {
            comment_id: "missing".into(),
            revision_id: "rev".into(),
            change_number: "1".into(),
            file_path: "a.py".into(),
            url: String::new(),
            label: String::new(),
        }];
        let progress = ProgressBar::hidden();
        let stop = AtomicBool::new(false);
        let records = extract_records(&extractor, &metas, 8, &progress, &stop, String::new);
        assert!(records.is_empty());
        assert_eq!(progress.position(), 1);
    }

    #[test]
    fn test_extract_records_stops_between_chunks() {
        let source = SnapshotSource::default();
        let extractor = FeatureExtractor::new(&source, Default::default());
        let metas: Vec<CommentMeta> = ["a", "b", "c"]
            .into_iter()
            .map(|id| CommentMeta {
                comment_id: id.into(),
                revision_id: "rev".into(),
                change_number: "1".into(),
                file_path: "a.py".into(),
                url: String::new(),
                label: String::new(),
            })
            .collect();
        let progress = ProgressBar::hidden();
        let stop = AtomicBool::new(false);

        // Ctrl+C arrives while the first chunk is running
        extract_records(&extractor, &metas, 1, &progress, &stop, || {
            stop.store(true, Ordering::SeqCst);
            String::new()
        });
        assert_eq!(progress.position(), 1);

        let progress = ProgressBar::hidden();
        extract_records(&extractor, &metas, 1, &progress, &stop, String::new);
        assert_eq!(progress.position(), 0);
    }
}
