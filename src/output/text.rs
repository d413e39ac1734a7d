use std::io::Write;

use crate::extractor::HistoryRecord;
use crate::output::{OutputError, RecordSink};

/// Title on one line, position and url indented below it.
pub struct TextSink<W: Write> {
    writer: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> RecordSink for TextSink<W> {
    fn record(&mut self, index: usize, record: &HistoryRecord) -> Result<(), OutputError> {
        writeln!(self.writer, "{}", record.title)?;
        writeln!(
            self.writer,
            "    {index}. {}  [{}]",
            record.url,
            record.visited_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}
