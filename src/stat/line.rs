//! Line classification for `perf stat -I` interval logs.
//!
//! Expected shapes:
//!
//! ```text
//! # started on Thu Nov  9 14:58:03 2023
//! #           time CPU    counts unit events
//!      1.000100001 S0        4        123 msec cpu-clock       #    1.0 CPUs utilized
//!      1.000100001 S0        4  <not counted>      branch-misses
//!
//!  Performance counter stats for 'system wide' (3 runs):
//! ```

use regex::Regex;
use std::fmt;

/// Category of a classified line, used when reporting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    StartTime,
    Header,
    Summary,
    Sample,
    Blank,
    Other,
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LineKind::StartTime => "start-time comment",
            LineKind::Header => "column-header comment",
            LineKind::Summary => "summary header",
            LineKind::Sample => "sample line",
            LineKind::Blank => "blank line",
            LineKind::Other => "unrecognized line",
        };
        f.write_str(name)
    }
}

/// One input line, borrowed from the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine<'a> {
    /// `# started on <timestamp>`; holds the raw timestamp text.
    StartTime(&'a str),
    /// Any other `#` comment; holds its whitespace-split labels.
    Header(Vec<&'a str>),
    /// `Performance counter stats for '<label>' (<N> runs):`
    Summary { label: &'a str, runs: u64 },
    /// `<elapsed> <core> <core count> <payload...>`
    Sample {
        elapsed: &'a str,
        core: &'a str,
        cores: u32,
        payload: &'a str,
    },
    Blank,
    Other,
}

impl LogLine<'_> {
    pub fn kind(&self) -> LineKind {
        match self {
            LogLine::StartTime(_) => LineKind::StartTime,
            LogLine::Header(_) => LineKind::Header,
            LogLine::Summary { .. } => LineKind::Summary,
            LogLine::Sample { .. } => LineKind::Sample,
            LogLine::Blank => LineKind::Blank,
            LogLine::Other => LineKind::Other,
        }
    }
}

/// Stateless classifier; holds the compiled line patterns.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    start_re: Regex,
    summary_re: Regex,
    sample_re: Regex,
}

impl LineClassifier {
    pub fn new() -> Result<Self, regex::Error> {
        // Capture: timestamp text after "started on".
        let start_re = Regex::new(r#"^#+\s*started\s+on\s+(.*?)\s*$"#)?;

        // Capture:
        // 1) run label between quotes
        // 2) run count
        let summary_re =
            Regex::new(r#"^\s+Performance\s+counter\s+stats\s+for\s+'(.*)'\s+\((\d+)\s+runs\):"#)?;

        // Capture:
        // 1) elapsed seconds, kept as text
        // 2) core id
        // 3) core count
        // 4) payload: counts, [unit], event, [# info]
        let sample_re = Regex::new(r#"^\s+(\d+\.\d+)\s+(\S+)\s+(\d+)\s+(.*?)\s*$"#)?;

        Ok(Self {
            start_re,
            summary_re,
            sample_re,
        })
    }

    pub fn classify<'a>(&self, line: &'a str) -> LogLine<'a> {
        if line.trim().is_empty() {
            return LogLine::Blank;
        }

        if line.starts_with('#') {
            if let Some(caps) = self.start_re.captures(line) {
                return LogLine::StartTime(caps.get(1).map_or("", |m| m.as_str()));
            }
            return LogLine::Header(line.trim_start_matches('#').split_whitespace().collect());
        }

        if let Some(caps) = self.summary_re.captures(line) {
            let label = caps.get(1).map_or("", |m| m.as_str());
            // Digits only; an overflowing count is not a summary we understand.
            return match caps.get(2).map(|m| m.as_str().parse::<u64>()) {
                Some(Ok(runs)) => LogLine::Summary { label, runs },
                _ => LogLine::Other,
            };
        }

        if let Some(caps) = self.sample_re.captures(line) {
            let cores = match caps.get(3).map(|m| m.as_str().parse::<u32>()) {
                Some(Ok(n)) => n,
                _ => return LogLine::Other,
            };
            return LogLine::Sample {
                elapsed: caps.get(1).map_or("", |m| m.as_str()),
                core: caps.get(2).map_or("", |m| m.as_str()),
                cores,
                payload: caps.get(4).map_or("", |m| m.as_str()),
            };
        }

        LogLine::Other
    }
}
