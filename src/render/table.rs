//! CSV emission of sealed records.
//!
//! The first record fixes the header row. Later records are written against
//! that header: a missing column becomes an empty cell, an extra column is a
//! `ColumnDivergence` (or, under `DivergencePolicy::Drop`, a logged drop).

use crate::error::ParseError;
use crate::model::SampleRecord;
use crate::stat::RecordSink;
use indexmap::IndexSet;
use log::{debug, warn};
use std::io::Write;

/// What to do with a column that is absent from the header row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DivergencePolicy {
    /// Abort with `ColumnDivergence`.
    #[default]
    Error,
    /// Drop the value and log a warning naming the column.
    Drop,
}

pub struct CsvEmitter<W: Write> {
    writer: csv::Writer<W>,
    policy: DivergencePolicy,
    header: Option<IndexSet<String>>,
    rows: usize,
    dropped: usize,
}

impl<W: Write> CsvEmitter<W> {
    pub fn new(out: W, policy: DivergencePolicy) -> Self {
        Self {
            writer: csv::Writer::from_writer(out),
            policy,
            header: None,
            rows: 0,
            dropped: 0,
        }
    }

    /// Data rows written so far (the header row is not counted).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Values dropped under `DivergencePolicy::Drop`.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W, ParseError> {
        self.writer.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| ParseError::Io(e.into_error()))
    }
}

impl<W: Write> RecordSink for CsvEmitter<W> {
    fn emit(&mut self, record: SampleRecord) -> Result<(), ParseError> {
        let first = self.header.is_none();
        let header = self
            .header
            .get_or_insert_with(|| record.keys().map(str::to_string).collect());
        if first {
            self.writer.write_record(header.iter())?;
        }

        let index = self.rows + 1;
        for key in record.keys() {
            if header.contains(key) {
                continue;
            }
            match self.policy {
                DivergencePolicy::Error => {
                    return Err(ParseError::ColumnDivergence {
                        record: index,
                        key: key.to_string(),
                    });
                }
                DivergencePolicy::Drop => {
                    warn!(
                        "record {} ({}s): dropping column {:?} absent from the header",
                        index,
                        record.elapsed(),
                        key
                    );
                    self.dropped += 1;
                }
            }
        }

        let mut row = Vec::with_capacity(header.len());
        for key in header.iter() {
            match record.get(key) {
                Some(value) => row.push(value.to_string()),
                None => {
                    debug!("record {}: no value for column {:?}", index, key);
                    row.push(String::new());
                }
            }
        }
        self.writer.write_record(&row)?;
        self.rows += 1;
        Ok(())
    }
}
