//! Browser history from live SQLite databases.
//!
//! Browsers keep their history database open and locked while running. This
//! crate copies the database to a private temporary file, queries the copy
//! with a per-family SQL profile, normalizes the rows into
//! [`HistoryRecord`]s, and deletes the copy again.

pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod output;
pub mod profile;
pub mod registry;
pub mod safe_copy;
pub mod search;
pub mod timestamp;

pub use error::{CleanupError, ConfigError, ExtractError, HistoryError};
pub use extractor::{Extraction, HistoryExtractor, HistoryRecord};
pub use profile::{BoundLocator, Family, ProfileRoots, SchemaProfile, SourceLocator};
pub use registry::BrowserRegistry;
pub use safe_copy::{SafeCopy, SafeCopyOptions};
pub use timestamp::EpochKind;
