//! Case-insensitive substring filter used by the command-line consumer.

use crate::extractor::HistoryRecord;

/// True when `query` occurs in the record's title or url, ignoring case.
pub fn matches(record: &HistoryRecord, query: &str) -> bool {
    let needle = query.to_lowercase();
    record.title.to_lowercase().contains(&needle) || record.url.to_lowercase().contains(&needle)
}

/// Records matching `query` with their position in `records`, in order.
///
/// The query is used as given: surrounding whitespace is part of the needle
/// and an empty query matches everything.
pub fn filter<'a>(
    records: &'a [HistoryRecord],
    query: Option<&str>,
) -> Vec<(usize, &'a HistoryRecord)> {
    let indexed = records.iter().enumerate();
    match query {
        Some(query) => indexed.filter(|(_, r)| matches(r, query)).collect(),
        None => indexed.collect(),
    }
}
