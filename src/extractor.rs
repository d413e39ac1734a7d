//! # History Extraction
//!
//! Resolves a profile's database, queries a disposable clone of it, and
//! normalizes the rows. Every failure is reported next to the result; none of
//! them escape [`HistoryExtractor::get_history`].

use std::path::Path;

use chrono::{DateTime, Local};
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::error::{CleanupError, ExtractError, HistoryError};
use crate::profile::{BoundLocator, SchemaProfile};
use crate::safe_copy::{SafeCopy, SafeCopyOptions, Scoped};
use crate::timestamp::{self, TimestampError};

/// One normalized history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRecord {
    pub url: String,
    /// Never empty; the url stands in for a missing or blank title.
    pub title: String,
    pub visited_at: DateTime<Local>,
    /// Id of the browser profile the record came from.
    pub origin: String,
}

struct RawRow {
    url: Option<String>,
    title: Option<String>,
    raw_timestamp: Option<i64>,
}

/// Why a single row was dropped from an otherwise good result.
#[derive(Debug, Error)]
enum RowError {
    #[error("{0} is null")]
    Null(&'static str),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
}

/// Records from one `get_history` call plus everything that went wrong.
///
/// A cleanup failure does not empty `records`.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<HistoryRecord>,
    pub errors: Vec<HistoryError>,
}

impl Extraction {
    /// Nothing came back because the database or profile is unavailable.
    pub fn is_no_data(&self) -> bool {
        self.records.is_empty() && self.errors.iter().any(HistoryError::is_no_data)
    }

    pub fn extract_error(&self) -> Option<&ExtractError> {
        self.errors.iter().find_map(|err| match err {
            HistoryError::Extract(err) => Some(err),
            HistoryError::Cleanup(_) => None,
        })
    }

    pub fn cleanup_error(&self) -> Option<&CleanupError> {
        self.errors.iter().find_map(|err| match err {
            HistoryError::Cleanup(err) => Some(err),
            HistoryError::Extract(_) => None,
        })
    }

    fn report(&mut self, browser: &str, err: HistoryError) {
        if err.is_no_data() {
            warn!("{browser} history unavailable: {err}");
        } else {
            error!("{browser} history: {err}");
        }
        self.errors.push(err);
    }
}

pub struct HistoryExtractor {
    profile: SchemaProfile,
    locator: BoundLocator,
    copy_opts: SafeCopyOptions,
}

impl HistoryExtractor {
    pub fn new(profile: SchemaProfile, locator: BoundLocator, copy_opts: SafeCopyOptions) -> Self {
        Self {
            profile,
            locator,
            copy_opts,
        }
    }

    pub fn profile(&self) -> &SchemaProfile {
        &self.profile
    }

    /// Most recent visits first, at most `limit` of them.
    ///
    /// Each call copies the database, queries the copy and deletes it; nothing
    /// is cached between calls.
    pub fn get_history(&self, limit: u32) -> Extraction {
        let mut extraction = Extraction::default();
        let browser = self.profile.id.as_str();
        match self.query_copy(limit) {
            Ok(Scoped { value, cleanup }) => {
                match value {
                    Ok(records) => extraction.records = records,
                    Err(err) => extraction.report(browser, err.into()),
                }
                if let Err(err) = cleanup {
                    extraction.report(browser, err.into());
                }
            }
            Err(err) => extraction.report(browser, err.into()),
        }
        debug!(
            "{browser}: {} records, {} errors",
            extraction.records.len(),
            extraction.errors.len()
        );
        extraction
    }

    fn query_copy(
        &self,
        limit: u32,
    ) -> Result<Scoped<Result<Vec<HistoryRecord>, ExtractError>>, ExtractError> {
        if limit == 0 {
            return Err(ExtractError::InvalidLimit);
        }
        let source = self.locator.resolve()?;
        debug!("{}: reading {}", self.profile.id, source.display());
        SafeCopy::scope(&source, &self.copy_opts, |clone| self.query_clone(clone, limit))
    }

    fn query_clone(&self, clone: &Path, limit: u32) -> Result<Vec<HistoryRecord>, ExtractError> {
        // Read-write so SQLite can rebuild the WAL index of the copy; query_only
        // still refuses any statement that would modify it.
        let conn = Connection::open_with_flags(
            clone,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.pragma_update(None, "query_only", true)?;

        let sql = format!("{} LIMIT ?1", self.profile.query);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([limit], |row| {
            Ok(RawRow {
                url: row.get(0)?,
                title: row.get(1)?,
                raw_timestamp: row.get(2)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            let raw = row?;
            match self.normalize(raw) {
                Ok(record) => out.push(record),
                Err(err) => warn!("{}: skipping row: {err}", self.profile.id),
            }
        }
        Ok(out)
    }

    fn normalize(&self, raw: RawRow) -> Result<HistoryRecord, RowError> {
        let url = raw.url.ok_or(RowError::Null("url"))?;
        let raw_timestamp = raw.raw_timestamp.ok_or(RowError::Null("timestamp"))?;
        let visited_at = timestamp::to_datetime(raw_timestamp, self.profile.epoch)?;
        let title = match raw.title {
            Some(title) if !title.trim().is_empty() => title,
            _ => url.clone(),
        };
        Ok(HistoryRecord {
            url,
            title,
            visited_at,
            origin: self.profile.id.clone(),
        })
    }
}
