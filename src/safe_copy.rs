//! # Safe Copy
//!
//! Disposable clones of SQLite databases that a running browser keeps open.
//!
//! A clone gets a random name from `tempfile`, is owned by exactly one
//! [`SafeCopy`], and is deleted when that value is released or dropped.
//! Deletion retries while another process (virus scanner, indexer, a slow
//! handle close) still holds the clone.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::{CleanupError, ExtractError};

pub const DEFAULT_CLEANUP_RETRIES: u32 = 10;
pub const DEFAULT_CLEANUP_BACKOFF: Duration = Duration::from_millis(500);

const CLONE_PREFIX: &str = "browsetrail-";

/// Sidecars cloned along with the database when they exist next to the source.
const COPIED_SIDECARS: [&str; 2] = ["-wal", "-journal"];
/// Sidecars removed on release; SQLite may create `-shm` while the clone is open.
const REMOVED_SIDECARS: [&str; 3] = ["-wal", "-journal", "-shm"];

/// Deletes a file. Swappable so lock contention can be simulated.
pub trait FileRemover: Send + Sync {
    fn remove(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsRemover;

impl FileRemover for FsRemover {
    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

#[derive(Clone)]
pub struct SafeCopyOptions {
    /// Directory for clones; the system temp dir when unset.
    pub temp_dir: Option<PathBuf>,
    /// Retries after the first failed delete.
    pub cleanup_retries: u32,
    pub cleanup_backoff: Duration,
    pub remover: Arc<dyn FileRemover>,
}

impl Default for SafeCopyOptions {
    fn default() -> Self {
        Self {
            temp_dir: None,
            cleanup_retries: DEFAULT_CLEANUP_RETRIES,
            cleanup_backoff: DEFAULT_CLEANUP_BACKOFF,
            remover: Arc::new(FsRemover),
        }
    }
}

impl fmt::Debug for SafeCopyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeCopyOptions")
            .field("temp_dir", &self.temp_dir)
            .field("cleanup_retries", &self.cleanup_retries)
            .field("cleanup_backoff", &self.cleanup_backoff)
            .finish_non_exhaustive()
    }
}

impl SafeCopyOptions {
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn with_remover(mut self, remover: Arc<dyn FileRemover>) -> Self {
        self.remover = remover;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.cleanup_backoff = backoff;
        self
    }
}

/// Value produced inside a [`SafeCopy::scope`] plus the outcome of releasing the clone.
#[derive(Debug)]
pub struct Scoped<T> {
    pub value: T,
    pub cleanup: Result<(), CleanupError>,
}

/// A temporary clone of a source database.
///
/// Use [`SafeCopy::scope`] where possible. A clone that is neither released
/// nor scoped is still removed on drop, with failures logged instead of
/// returned.
pub struct SafeCopy {
    path: PathBuf,
    retries: u32,
    backoff: Duration,
    remover: Arc<dyn FileRemover>,
    released: bool,
}

impl SafeCopy {
    pub fn acquire(source: &Path, opts: &SafeCopyOptions) -> Result<Self, ExtractError> {
        let mut input = open_source(source)?;

        let mut builder = tempfile::Builder::new();
        builder.prefix(CLONE_PREFIX).suffix(".sqlite");
        let temp = match &opts.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let (mut output, temp_path) = temp.into_parts();
        io::copy(&mut input, &mut output).map_err(|err| classify_read_error(source, err))?;
        drop(output);

        // From here on deletion is ours, including retries.
        let path = temp_path.keep().map_err(io::Error::from)?;
        let copy = Self {
            path,
            retries: opts.cleanup_retries,
            backoff: opts.cleanup_backoff,
            remover: Arc::clone(&opts.remover),
            released: false,
        };

        for suffix in COPIED_SIDECARS {
            let from = sidecar_path(source, suffix);
            if !from.exists() {
                continue;
            }
            match std::fs::copy(&from, sidecar_path(&copy.path, suffix)) {
                Ok(bytes) => debug!("copied sidecar {} ({bytes} bytes)", from.display()),
                // Checkpointed away between the check and the copy.
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(classify_read_error(&from, err)),
            }
        }

        debug!("cloned {} to {}", source.display(), copy.path.display());
        Ok(copy)
    }

    /// Acquire a clone, run `f` against it, then release it.
    ///
    /// The closure's value and the cleanup outcome are reported separately so
    /// a failed delete never hides a successful read.
    pub fn scope<T, F>(source: &Path, opts: &SafeCopyOptions, f: F) -> Result<Scoped<T>, ExtractError>
    where
        F: FnOnce(&Path) -> T,
    {
        let copy = Self::acquire(source, opts)?;
        let value = f(copy.path());
        let cleanup = copy.release();
        Ok(Scoped { value, cleanup })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) -> Result<(), CleanupError> {
        self.release_once()
    }

    fn release_once(&mut self) -> Result<(), CleanupError> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let mut failures = Vec::new();
        for suffix in REMOVED_SIDECARS {
            if let Err(err) = self.remove_with_retry(&sidecar_path(&self.path, suffix)) {
                failures.push(err);
            }
        }
        if let Err(err) = self.remove_with_retry(&self.path) {
            failures.push(err);
        }
        let mut failures = failures.into_iter();
        let Some(first) = failures.next() else {
            return Ok(());
        };
        for err in failures {
            error!("{err}; temporary copy leaked");
        }
        Err(first)
    }

    fn remove_with_retry(&self, path: &Path) -> Result<(), CleanupError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.remover.remove(path) {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(err) if is_transient_lock(&err) && attempts <= self.retries => {
                    warn!(
                        "temporary copy {} still locked (attempt {attempts}): {err}",
                        path.display()
                    );
                    std::thread::sleep(self.backoff);
                }
                Err(source) => {
                    return Err(CleanupError::FailedCleanup {
                        path: path.to_path_buf(),
                        attempts,
                        source,
                    });
                }
            }
        }
    }
}

impl Drop for SafeCopy {
    fn drop(&mut self) {
        if let Err(err) = self.release_once() {
            error!("{err}; temporary copy leaked");
        }
    }
}

fn open_source(source: &Path) -> Result<File, ExtractError> {
    match std::fs::metadata(source) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(ExtractError::SourceNotFound(source.to_path_buf())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ExtractError::SourceNotFound(source.to_path_buf()));
        }
        Err(err) => return Err(classify_read_error(source, err)),
    }
    File::open(source).map_err(|err| classify_read_error(source, err))
}

fn classify_read_error(path: &Path, err: io::Error) -> ExtractError {
    match err.kind() {
        io::ErrorKind::NotFound => ExtractError::SourceNotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => ExtractError::PermissionDenied {
            path: path.to_path_buf(),
            source: err,
        },
        _ => ExtractError::SourceLocked {
            path: path.to_path_buf(),
            source: err,
        },
    }
}

/// Only lock-style failures are retried; anything else fails on the first attempt.
fn is_transient_lock(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::PermissionDenied {
        return true;
    }
    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    #[cfg(windows)]
    if matches!(err.raw_os_error(), Some(32) | Some(33)) {
        return true;
    }
    false
}

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
