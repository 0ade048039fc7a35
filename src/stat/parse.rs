use crate::error::{FormatCause, ParseError};
use crate::model::{RunSummary, SampleRecord, SummaryHeader};
use crate::stat::field::FieldDecoder;
use crate::stat::line::{LineClassifier, LineKind, LogLine};
use crate::stat::time::{parse_start_time, synthesize};
use chrono::NaiveDateTime;
use log::{debug, info, trace, warn};
use std::io::BufRead;

/// Receives records in the order they are sealed.
pub trait RecordSink {
    fn emit(&mut self, record: SampleRecord) -> Result<(), ParseError>;
}

impl RecordSink for Vec<SampleRecord> {
    fn emit(&mut self, record: SampleRecord) -> Result<(), ParseError> {
        self.push(record);
        Ok(())
    }
}

/// Sink that drops every record; used when only the run summary is wanted.
#[derive(Debug, Default)]
pub struct Discard;

impl RecordSink for Discard {
    fn emit(&mut self, _record: SampleRecord) -> Result<(), ParseError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Accumulating,
    /// The summary header was seen; no further lines are consumed.
    SummaryReached,
}

/// Folds classified lines into wide records, one per elapsed-seconds string.
///
/// At most one record is open at a time. It is sealed when a sample line with
/// a different elapsed string arrives, when the summary header is reached, or
/// (with a warning) when input ends without a summary.
#[derive(Debug)]
pub struct Assembler {
    classifier: LineClassifier,
    decoder: FieldDecoder,
    state: State,
    lineno: usize,
    start_time: Option<NaiveDateTime>,
    columns: Vec<String>,
    open: Option<SampleRecord>,
    summary: Option<SummaryHeader>,
    sealed: usize,
}

impl Assembler {
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            classifier: LineClassifier::new()?,
            decoder: FieldDecoder::new()?,
            state: State::Accumulating,
            lineno: 0,
            start_time: None,
            columns: Vec::new(),
            open: None,
            summary: None,
            sealed: 0,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Consume one line (without its terminator).
    pub fn feed<S: RecordSink>(&mut self, line: &str, sink: &mut S) -> Result<State, ParseError> {
        self.lineno += 1;
        if self.state == State::SummaryReached {
            return Ok(self.state);
        }

        let classified = self.classifier.classify(line);
        let kind = classified.kind();
        match classified {
            LogLine::Blank => {}
            LogLine::StartTime(text) => {
                let start = parse_start_time(text)
                    .map_err(|e| ParseError::format(self.lineno, kind, e, line))?;
                debug!("line {}: start time {}", self.lineno, start);
                self.start_time = Some(start);
            }
            LogLine::Header(labels) => {
                debug!("line {}: column labels {:?}", self.lineno, labels);
                self.columns = labels.into_iter().map(str::to_string).collect();
            }
            LogLine::Summary { label, runs } => {
                self.seal(sink)?;
                info!(
                    "line {}: summary for '{}' ({} runs) reached after {} records",
                    self.lineno, label, runs, self.sealed
                );
                self.summary = Some(SummaryHeader {
                    label: label.to_string(),
                    runs,
                });
                self.state = State::SummaryReached;
            }
            LogLine::Sample {
                elapsed,
                core,
                cores,
                payload,
            } => {
                trace!(
                    "line {}: {}s {} of {}: {}",
                    self.lineno, elapsed, core, cores, payload
                );
                self.sample(line, elapsed, core, payload, sink)?;
            }
            LogLine::Other => {
                return Err(ParseError::format(
                    self.lineno,
                    kind,
                    FormatCause::Unrecognized,
                    line,
                ));
            }
        }

        Ok(self.state)
    }

    /// End of input. Seals a record left open by a log without a summary.
    pub fn finish<S: RecordSink>(mut self, sink: &mut S) -> Result<RunSummary, ParseError> {
        if let Some(open) = &self.open {
            warn!(
                "log ended without a summary section; sealing last record at {}s",
                open.elapsed()
            );
            self.seal(sink)?;
        }

        Ok(RunSummary {
            start_time: self.start_time,
            columns: self.columns,
            summary: self.summary,
            records: self.sealed,
        })
    }

    fn sample<S: RecordSink>(
        &mut self,
        line: &str,
        elapsed: &str,
        core: &str,
        payload: &str,
        sink: &mut S,
    ) -> Result<(), ParseError> {
        let start = self.start_time.ok_or_else(|| ParseError::Ordering {
            lineno: self.lineno,
            line: line.to_string(),
        })?;

        let field = self
            .decoder
            .decode(payload)
            .map_err(|e| ParseError::format(self.lineno, LineKind::Sample, e, line))?;

        // Raw text comparison: "1.50" and "1.5" are different intervals.
        let mut record = match self.open.take() {
            Some(record) if record.elapsed() == elapsed => record,
            previous => {
                if let Some(previous) = previous {
                    self.emit(previous, sink)?;
                }
                let utctime = synthesize(start, elapsed)
                    .map_err(|e| ParseError::format(self.lineno, LineKind::Sample, e, line))?;
                SampleRecord::open(elapsed, utctime)
            }
        };

        record.insert(format!("{}_{}", core, field.event), field.value);
        self.open = Some(record);
        Ok(())
    }

    fn seal<S: RecordSink>(&mut self, sink: &mut S) -> Result<(), ParseError> {
        match self.open.take() {
            Some(record) => self.emit(record, sink),
            None => Ok(()),
        }
    }

    fn emit<S: RecordSink>(&mut self, record: SampleRecord, sink: &mut S) -> Result<(), ParseError> {
        self.sealed += 1;
        debug!(
            "sealed record {} at {}s with {} columns",
            self.sealed,
            record.elapsed(),
            record.len()
        );
        sink.emit(record)
    }
}

/// Parse a whole log, stopping at the summary boundary.
pub fn parse_reader<R: BufRead, S: RecordSink>(
    reader: R,
    sink: &mut S,
) -> Result<RunSummary, ParseError> {
    let mut assembler = Assembler::new()?;
    for line in reader.lines() {
        let line = line?;
        assembler.feed(&line, sink)?;
        if assembler.state() == State::SummaryReached {
            break;
        }
    }
    assembler.finish(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, TIME_COLUMN};
    use crate::stat::field::FieldError;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    const START: &str = "# started on Thu Nov 9 14:58:03 2023";

    fn parse(text: &str) -> Result<(Vec<SampleRecord>, RunSummary), ParseError> {
        let mut records = Vec::new();
        let summary = parse_reader(text.as_bytes(), &mut records)?;
        Ok((records, summary))
    }

    fn at(s: u32, nano: u32) -> CellValue {
        CellValue::Time(
            NaiveDate::from_ymd_opt(2023, 11, 9)
                .unwrap()
                .and_hms_nano_opt(14, 58, s, nano)
                .unwrap(),
        )
    }

    fn keys(record: &SampleRecord) -> Vec<&str> {
        record.keys().collect()
    }

    #[test]
    fn two_timestamps_make_two_records() {
        let log = [
            START,
            "   1.000100001        S0        4        123 msec cpu-clock # 1.0 CPUs",
            "   2.000100001        S0        4        55 instructions # 1.2 IPC",
        ]
        .join("\n");

        let (records, summary) = parse(&log).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get(TIME_COLUMN), Some(&at(4, 100_001)));
        assert_eq!(records[0].get("S0_cpu-clock"), Some(&CellValue::Float(123.0)));
        assert_eq!(records[1].get(TIME_COLUMN), Some(&at(5, 100_001)));
        assert_eq!(records[1].get("S0_instructions"), Some(&CellValue::Int(55)));
        assert_eq!(
            records[0].get(TIME_COLUMN).unwrap().to_string(),
            "2023-11-09T14:58:04.000100001"
        );
        assert_eq!(summary.records, 2);
        assert_eq!(summary.summary, None);
    }

    #[test]
    fn lines_sharing_a_timestamp_form_one_wide_record() {
        let log = [
            START,
            "#           time CPU    counts unit events",
            "     1.000100001 S0        4        10      cycles          # 0.1 GHz",
            "     1.000100001 S0        4  <not counted>      branch-misses   (0.00%)",
            "     1.000100001 S1        4        20      cycles          # 0.1 GHz",
            "     1.000100001 S0        4        30      cycles          # 0.1 GHz",
        ]
        .join("\n");

        let (records, summary) = parse(&log).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(
            keys(&records[0]),
            vec![TIME_COLUMN, "S0_cycles", "S0_branch-misses", "S1_cycles"]
        );
        // A repeated key overwrites in place.
        assert_eq!(records[0].get("S0_cycles"), Some(&CellValue::Int(30)));
        assert_eq!(records[0].get("S0_branch-misses"), Some(&CellValue::NotCounted));
        assert_eq!(summary.columns, vec!["time", "CPU", "counts", "unit", "events"]);
    }

    #[test]
    fn summary_boundary_seals_and_stops() {
        let log = [
            START,
            "     1.000100001 S0        4        10      cycles          # 0.1 GHz",
            "     2.000100001 S0        4        11      cycles          # 0.1 GHz",
            "",
            " Performance counter stats for 'system wide' (3 runs):",
            "",
            "     9.000000000 S0        4        99      cycles          # 0.1 GHz",
            "S0        4        1,234      cycles",
        ]
        .join("\n");

        let (records, summary) = parse(&log).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("S0_cycles"), Some(&CellValue::Int(11)));
        assert_eq!(
            summary.summary,
            Some(SummaryHeader {
                label: "system wide".to_string(),
                runs: 3
            })
        );
        assert_eq!(summary.records, 2);
    }

    #[test]
    fn assembler_ignores_lines_after_summary() {
        let mut assembler = Assembler::new().unwrap();
        let mut records = Vec::new();
        assembler.feed(START, &mut records).unwrap();
        assembler
            .feed("   1.0 S0 4 5 cycles # x", &mut records)
            .unwrap();
        let state = assembler
            .feed(" Performance counter stats for 'system wide' (1 runs):", &mut records)
            .unwrap();
        assert_eq!(state, State::SummaryReached);

        assembler.feed("   2.0 S0 4 6 cycles # x", &mut records).unwrap();
        assembler.feed("garbage", &mut records).unwrap();
        assert_eq!(assembler.state(), State::SummaryReached);

        let summary = assembler.finish(&mut records).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(summary.records, 1);
    }

    #[test]
    fn elapsed_compared_as_text() {
        // Same numeric time, different text: two records.
        let log = [
            START,
            "   1.50 S0 4 5 cycles # x",
            "   1.5 S0 4 6 instructions # x",
            " Performance counter stats for 'system wide' (1 runs):",
        ]
        .join("\n");

        let (records, _) = parse(&log).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].elapsed(), "1.50");
        assert_eq!(records[1].elapsed(), "1.5");
        assert_eq!(records[0].get(TIME_COLUMN), records[1].get(TIME_COLUMN));
    }

    #[test]
    fn row_count_matches_distinct_timestamps() {
        let mut lines = vec![START.to_string()];
        for t in 1..=5 {
            for core in ["S0", "S1"] {
                lines.push(format!("   {}.000000001 {} 4 {} cycles # x", t, core, t));
            }
        }
        lines.push(" Performance counter stats for 'system wide' (1 runs):".to_string());

        let (records, summary) = parse(&lines.join("\n")).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(summary.records, 5);
    }

    #[test]
    fn sample_before_start_time_is_ordering_violation() {
        let err = parse("   1.0 S0 4 5 cycles # x").unwrap_err();
        assert!(matches!(err, ParseError::Ordering { lineno: 1, .. }), "{err}");
    }

    #[test]
    fn three_bare_tokens_abort() {
        let log = [START, "   1.0 S0 4 808323 instructions (3.64%)"].join("\n");
        match parse(&log).unwrap_err() {
            ParseError::Format {
                lineno,
                kind,
                cause,
                line,
            } => {
                assert_eq!(lineno, 2);
                assert_eq!(kind, LineKind::Sample);
                assert_eq!(cause, FormatCause::Field(FieldError::TokenCount(3)));
                assert_eq!(line, "   1.0 S0 4 808323 instructions (3.64%)");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bare_two_tokens_accepted() {
        let log = [START, "   1.0 S1 4 808323 instructions"].join("\n");
        let (records, _) = parse(&log).unwrap();
        assert_eq!(records[0].get("S1_instructions"), Some(&CellValue::Int(808323)));
    }

    #[test]
    fn unrecognized_line_before_summary_aborts() {
        let log = [START, "this is not perf output"].join("\n");
        let err = parse(&log).unwrap_err();
        assert!(
            matches!(
                err,
                ParseError::Format {
                    lineno: 2,
                    kind: LineKind::Other,
                    cause: FormatCause::Unrecognized,
                    ..
                }
            ),
            "{err}"
        );
        assert!(err.to_string().contains("this is not perf output"));
    }

    #[test]
    fn bad_start_time_aborts() {
        let err = parse("# started on yesterday").unwrap_err();
        assert!(
            matches!(
                err,
                ParseError::Format {
                    kind: LineKind::StartTime,
                    ..
                }
            ),
            "{err}"
        );
    }

    #[test]
    fn open_record_sealed_at_end_of_input() {
        let log = [START, "   1.0 S0 4 5 cycles # x"].join("\n");
        let (records, summary) = parse(&log).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(summary.summary, None);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let (records, summary) = parse("").unwrap();
        assert!(records.is_empty());
        assert_eq!(summary, RunSummary::default());
    }
}
