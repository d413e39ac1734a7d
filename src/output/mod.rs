//! # Output Module
//!
//! Writers for extracted history records: a plain listing for terminals,
//! JSON lines, and CSV.

pub mod csv;
pub mod jsonl;
pub mod text;

use std::io::Write;

use thiserror::Error;

use crate::extractor::HistoryRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Text,
    Jsonl,
    Csv,
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub trait RecordSink {
    /// `index` is the record's position in the extractor's result.
    fn record(&mut self, index: usize, record: &HistoryRecord) -> Result<(), OutputError>;
    fn flush(&mut self) -> Result<(), OutputError>;
}

pub fn build_sink<'w, W: Write + 'w>(kind: OutputKind, out: W) -> Box<dyn RecordSink + 'w> {
    match kind {
        OutputKind::Text => Box::new(text::TextSink::new(out)),
        OutputKind::Jsonl => Box::new(jsonl::JsonlSink::new(out)),
        OutputKind::Csv => Box::new(csv::CsvSink::new(out)),
    }
}

/// Write `(index, record)` pairs in order, then flush.
pub fn write_records<'a, I>(sink: &mut dyn RecordSink, records: I) -> Result<usize, OutputError>
where
    I: IntoIterator<Item = (usize, &'a HistoryRecord)>,
{
    let mut count = 0;
    for (index, record) in records {
        sink.record(index, record)?;
        count += 1;
    }
    sink.flush()?;
    Ok(count)
}
