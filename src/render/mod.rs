//! Output rendering for sealed records.

pub mod table;

pub use table::{CsvEmitter, DivergencePolicy};
