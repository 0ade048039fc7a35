//! File-level drivers: a log on disk in, a table on disk out.

use crate::Result;
use crate::model::RunSummary;
use crate::render::{CsvEmitter, DivergencePolicy};
use crate::stat::{Discard, parse_reader};
use anyhow::{Context, bail};
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// `run-1.prof` -> `run-1.prof.csv`
pub fn default_output(log: &Path) -> PathBuf {
    let mut name = log.as_os_str().to_owned();
    name.push(".csv");
    PathBuf::from(name)
}

/// Convert one log into a CSV table.
///
/// A table is never left half-written: on failure the output file is removed.
pub fn convert_log_file(log: &Path, out: &Path, policy: DivergencePolicy) -> Result<RunSummary> {
    let input = File::open(log).with_context(|| format!("open log file {}", log.display()))?;
    let output =
        File::create(out).with_context(|| format!("create table file {}", out.display()))?;

    let mut emitter = CsvEmitter::new(BufWriter::new(output), policy);
    let result = parse_reader(BufReader::new(input), &mut emitter)
        .and_then(|summary| {
            if emitter.dropped() > 0 {
                warn!(
                    "{}: dropped {} values absent from the header row",
                    log.display(),
                    emitter.dropped()
                );
            }
            debug!("{}: {} rows written", out.display(), emitter.rows());
            emitter.finish().map(|_| summary)
        });

    match result {
        Ok(summary) => {
            report(log, &summary);
            Ok(summary)
        }
        Err(e) => {
            if let Err(rm) = fs::remove_file(out) {
                warn!("could not remove partial table {}: {}", out.display(), rm);
            }
            Err(e).with_context(|| format!("convert {} to {}", log.display(), out.display()))
        }
    }
}

/// Parse a log for its run summary only.
pub fn inspect_log_file(log: &Path) -> Result<RunSummary> {
    let input = File::open(log).with_context(|| format!("open log file {}", log.display()))?;
    let summary = parse_reader(BufReader::new(input), &mut Discard)
        .with_context(|| format!("parse log file {}", log.display()))?;
    report(log, &summary);
    Ok(summary)
}

/// Convert every `*.<ext>` file in `dir`, in path order, each next to itself.
/// Stops at the first failure.
pub fn convert_dir(
    dir: &Path,
    ext: &str,
    policy: DivergencePolicy,
) -> Result<Vec<(PathBuf, RunSummary)>> {
    let mut logs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read directory {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == ext) {
            logs.push(path);
        }
    }
    logs.sort();

    if logs.is_empty() {
        bail!("no *.{} files in {}", ext, dir.display());
    }

    let mut out = Vec::with_capacity(logs.len());
    for log in logs {
        let table = default_output(&log);
        let summary = convert_log_file(&log, &table, policy)?;
        out.push((table, summary));
    }
    Ok(out)
}

fn report(log: &Path, summary: &RunSummary) {
    info!("{}: start time {:?}", log.display(), summary.start_time);
    info!("{}: columns {:?}", log.display(), summary.columns);
    match &summary.summary {
        Some(s) => info!("{}: run '{}' x {}", log.display(), s.label, s.runs),
        None => info!("{}: no summary section", log.display()),
    }
    info!("{}: {} records", log.display(), summary.records);
}
