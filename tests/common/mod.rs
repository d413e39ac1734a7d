//! Shared fixtures for history extraction tests.
//!
//! Builds minimal Chromium and Mozilla history databases under a profile root
//! laid out like a real install, plus removers that simulate a clone held
//! open by another process.

#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;

use browsetrail::safe_copy::FileRemover;
use browsetrail::{BrowserRegistry, ProfileRoots, SafeCopyOptions};

// ============================================================================
// Profile Layout
// ============================================================================

pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub clones: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let clones = dir.path().join("clones");
        std::fs::create_dir_all(&clones).expect("clone dir");
        for root in ["roaming", "local"] {
            std::fs::create_dir_all(dir.path().join(root)).expect("root dir");
        }
        Self { dir, clones }
    }

    pub fn roots(&self) -> ProfileRoots {
        ProfileRoots {
            roaming: Some(self.dir.path().join("roaming")),
            local: Some(self.dir.path().join("local")),
        }
    }

    pub fn options(&self) -> SafeCopyOptions {
        SafeCopyOptions::default()
            .with_temp_dir(&self.clones)
            .with_backoff(Duration::ZERO)
    }

    pub fn registry(&self) -> BrowserRegistry {
        BrowserRegistry::new(self.roots(), self.options())
    }

    pub fn registry_with(&self, remover: Arc<dyn FileRemover>) -> BrowserRegistry {
        BrowserRegistry::new(self.roots(), self.options().with_remover(remover))
    }

    pub fn chrome_path(&self) -> PathBuf {
        self.dir
            .path()
            .join("local")
            .join("Google")
            .join("Chrome")
            .join("User Data")
            .join("Default")
            .join("History")
    }

    pub fn firefox_profile(&self, name: &str) -> PathBuf {
        let profile = self
            .dir
            .path()
            .join("roaming")
            .join("Mozilla")
            .join("Firefox")
            .join("Profiles")
            .join(name);
        std::fs::create_dir_all(&profile).expect("profile dir");
        profile.join("places.sqlite")
    }

    pub fn clone_count(&self) -> usize {
        std::fs::read_dir(&self.clones).expect("read clones").count()
    }
}

// ============================================================================
// Databases
// ============================================================================

/// A visit: url, title, raw timestamp in the family's epoch.
pub type Visit<'a> = (&'a str, Option<&'a str>, i64);

pub fn write_chrome_history(path: &Path, visits: &[Visit<'_>]) {
    std::fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
    let conn = Connection::open(path).expect("open chrome db");
    create_chrome_schema(&conn);
    insert_chrome_visits(&conn, visits);
}

pub fn create_chrome_schema(conn: &Connection) {
    conn.execute_batch(
        "CREATE TABLE urls (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url LONGVARCHAR,
            title LONGVARCHAR,
            visit_count INTEGER DEFAULT 0 NOT NULL,
            typed_count INTEGER DEFAULT 0 NOT NULL,
            last_visit_time INTEGER NOT NULL,
            hidden INTEGER DEFAULT 0 NOT NULL
        );",
    )
    .expect("create urls");
}

pub fn insert_chrome_visits(conn: &Connection, visits: &[Visit<'_>]) {
    for (url, title, last_visit_time) in visits {
        conn.execute(
            "INSERT INTO urls (url, title, visit_count, last_visit_time) VALUES (?1, ?2, 1, ?3)",
            (url, title, last_visit_time),
        )
        .expect("insert url");
    }
}

/// One place per distinct url, one visit row per entry.
pub fn write_firefox_places(path: &Path, visits: &[Visit<'_>]) {
    let conn = Connection::open(path).expect("open places db");
    conn.execute_batch(
        "CREATE TABLE moz_places (
            id INTEGER PRIMARY KEY,
            url LONGVARCHAR UNIQUE,
            title LONGVARCHAR,
            visit_count INTEGER DEFAULT 0,
            last_visit_date INTEGER
        );
        CREATE TABLE moz_historyvisits (
            id INTEGER PRIMARY KEY,
            from_visit INTEGER,
            place_id INTEGER,
            visit_date INTEGER,
            visit_type INTEGER
        );",
    )
    .expect("create places schema");
    for (url, title, visit_date) in visits {
        conn.execute(
            "INSERT OR IGNORE INTO moz_places (url, title) VALUES (?1, ?2)",
            (url, title),
        )
        .expect("insert place");
        conn.execute(
            "INSERT INTO moz_historyvisits (place_id, visit_date, visit_type)
             SELECT id, ?2, 1 FROM moz_places WHERE url = ?1",
            (url, visit_date),
        )
        .expect("insert visit");
    }
}

// ============================================================================
// Removers
// ============================================================================

/// Refuses to delete existing files while `failures` remain.
pub struct HeldLock {
    failures: AtomicU32,
}

impl HeldLock {
    pub fn new(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            failures: AtomicU32::new(failures),
        })
    }

    pub fn forever() -> Arc<Self> {
        Self::new(u32::MAX)
    }
}

impl FileRemover for HeldLock {
    fn remove(&self, path: &Path) -> io::Result<()> {
        if path.exists() && self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        std::fs::remove_file(path)
    }
}

/// Deletes normally and remembers every file it actually removed.
#[derive(Default)]
pub struct RecordingRemover {
    pub removed: Mutex<Vec<PathBuf>>,
}

impl FileRemover for RecordingRemover {
    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)?;
        self.removed.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}
