use crate::config;
use crate::context::{extract_context, Context};
use crate::core::LineSpan;
use crate::io;
use anyhow::{Context as _, Result};
use colored::*;
use std::path::Path;

pub struct ContextOptions<'a> {
    pub file: &'a Path,
    pub start: usize,
    pub end: Option<usize>,
    pub config: Option<&'a Path>,
}

pub fn run_context(options: ContextOptions<'_>) -> Result<()> {
    let config = match options.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config()?,
    };
    let code = io::read_file(options.file)?;
    let range = LineSpan::new(options.start, options.end.unwrap_or(options.start));
    let context = extract_context(&code, Some(range), &config.context)
        .with_context(|| format!("Failed to parse {}", options.file.display()))?;

    println!("{}", describe(&context, range).bold());
    if !context.is_empty() {
        println!("{}", context.text);
    }
    Ok(())
}

fn describe(context: &Context, range: LineSpan) -> String {
    match context.span {
        Some(span) => format!(
            "Lines {}-{} resolve to lines {}-{}",
            range.start, range.end, span.start, span.end
        ),
        None => format!("Lines {}-{} have no context", range.start, range.end),
    }
}
