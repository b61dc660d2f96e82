//! `run` and `check` subcommands.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use csvdv_ingest::{ParserEngine, ParserTask, RunSummary};
use tracing::{info, info_span};

use crate::output::{CsvSink, JsonLinesSink, OutputFormat};

/// Reads and decodes a JSON task file.
pub fn load_task(path: &Path) -> Result<ParserTask> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read task {}", path.display()))?;
    ParserTask::from_json_str(&text).with_context(|| format!("decode task {}", path.display()))
}

/// Loads the task and builds an engine, surfacing every configuration error.
pub fn check_task(path: &Path) -> Result<ParserEngine> {
    let task = load_task(path)?;
    ParserEngine::from_task(task).with_context(|| format!("invalid task {}", path.display()))
}

/// Runs `inputs` through the task at `task_path`, writing records to `out`.
pub fn run_ingest<W: Write>(
    task_path: &Path,
    inputs: &[PathBuf],
    format: OutputFormat,
    out: W,
) -> Result<RunSummary> {
    let engine = check_task(task_path)?;
    let schema = &engine.config().schema;
    let span = info_span!("run", task = %task_path.display(), inputs = inputs.len());
    let _guard = span.enter();
    let start = Instant::now();

    let result = match format {
        OutputFormat::JsonLines => {
            engine.run_files(inputs.iter().cloned(), JsonLinesSink::new(schema, out))
        }
        OutputFormat::Csv => engine.run_files(inputs.iter().cloned(), CsvSink::new(schema, out)),
    };
    let summary = result.context("ingest failed")?;

    info!(
        files = summary.files,
        records = summary.records,
        skipped = summary.skipped_count(),
        defaults_applied = summary.defaults_applied,
        duration_ms = start.elapsed().as_millis(),
        "run complete"
    );
    Ok(summary)
}
