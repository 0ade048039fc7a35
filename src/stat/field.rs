//! Decoding of the per-event payload that trails a sample line.
//!
//! Three shapes are accepted, tried in order:
//!
//! ```text
//! <not counted>      branch-misses                          (0.00%)
//! 123 msec cpu-clock       #    1.0 CPUs utilized
//! 808323      instructions
//! ```

use crate::model::CellValue;
use regex::Regex;

/// Event whose count is reported in fractional milliseconds.
pub const FLOAT_EVENT: &str = "cpu-clock";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("payload without '#' must have exactly 2 tokens (count, event), found {0}")]
    TokenCount(usize),

    #[error("payload names no event")]
    MissingEvent,

    #[error("cannot parse count {count:?} for event {event:?}")]
    BadCount { count: String, event: String },
}

/// A decoded reading: event name plus its typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField<'a> {
    pub event: &'a str,
    pub value: CellValue,
}

#[derive(Debug, Clone)]
pub struct FieldDecoder {
    not_counted_re: Regex,
    annotated_re: Regex,
}

impl FieldDecoder {
    pub fn new() -> Result<Self, regex::Error> {
        let not_counted_re = Regex::new(r#"^<not\s+counted>(.*)$"#)?;

        // Capture:
        // 1) count: digits with at most one decimal point
        // 2) unit and event tokens up to the first '#'
        let annotated_re = Regex::new(r#"^(\d+(?:\.\d*)?)\s+([^#]*)#"#)?;

        Ok(Self {
            not_counted_re,
            annotated_re,
        })
    }

    pub fn decode<'a>(&self, payload: &'a str) -> Result<DecodedField<'a>, FieldError> {
        let payload = payload.trim();

        if let Some(caps) = self.not_counted_re.captures(payload) {
            // Trailing annotations such as "(0.00%)" are not part of the name.
            let event = caps
                .get(1)
                .and_then(|m| m.as_str().split_whitespace().next())
                .ok_or(FieldError::MissingEvent)?;
            return Ok(DecodedField {
                event,
                value: CellValue::NotCounted,
            });
        }

        let (count, event) = match self.annotated_re.captures(payload) {
            Some(caps) => {
                let count = caps.get(1).map_or("", |m| m.as_str());
                // Earlier tokens are the unit (e.g. "msec").
                let event = caps
                    .get(2)
                    .and_then(|m| m.as_str().split_whitespace().last())
                    .ok_or(FieldError::MissingEvent)?;
                (count, event)
            }
            None => {
                // Some events (seen for `instructions`) are printed without the
                // '#' annotation: "<count> <event>".
                let tokens: Vec<&str> = payload.split_whitespace().collect();
                match tokens.as_slice() {
                    [count, event] => (*count, *event),
                    _ => return Err(FieldError::TokenCount(tokens.len())),
                }
            }
        };

        Ok(DecodedField {
            event,
            value: coerce(count, event)?,
        })
    }
}

/// `cpu-clock` counts are floats; every other event counts occurrences.
fn coerce(count: &str, event: &str) -> Result<CellValue, FieldError> {
    let bad = || FieldError::BadCount {
        count: count.to_string(),
        event: event.to_string(),
    };
    if event == FLOAT_EVENT {
        count.parse::<f64>().map(CellValue::Float).map_err(|_| bad())
    } else {
        count.parse::<u64>().map(CellValue::Int).map_err(|_| bad())
    }
}
