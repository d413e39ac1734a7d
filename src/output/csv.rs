use std::io::Write;

use serde::Serialize;

use crate::extractor::HistoryRecord;
use crate::output::{OutputError, RecordSink};

pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

#[derive(Serialize)]
struct HistoryCsv<'a> {
    browser: &'a str,
    visited_at: String,
    title: &'a str,
    url: &'a str,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn record(&mut self, _index: usize, record: &HistoryRecord) -> Result<(), OutputError> {
        let row = HistoryCsv {
            browser: &record.origin,
            visited_at: record.visited_at.to_rfc3339(),
            title: &record.title,
            url: &record.url,
        };
        self.writer.serialize(row)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}
