//! # Schema Profiles
//!
//! Per-browser constants: where the history database lives, how to query it,
//! and which epoch its visit times use.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ExtractError};
use crate::timestamp::EpochKind;

/// Chromium keeps one row per url with its latest visit.
pub const CHROMIUM_HISTORY_QUERY: &str =
    "SELECT url, title, last_visit_time FROM urls ORDER BY last_visit_time DESC";

/// Mozilla keeps one row per visit, joined back to its place.
pub const MOZILLA_HISTORY_QUERY: &str = "SELECT url, title, visit_date FROM moz_places \
     INNER JOIN moz_historyvisits ON moz_historyvisits.place_id = moz_places.id \
     ORDER BY visit_date DESC";

/// Browsers sharing one history schema and epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Chromium,
    Mozilla,
}

impl Family {
    pub fn query(self) -> &'static str {
        match self {
            Family::Chromium => CHROMIUM_HISTORY_QUERY,
            Family::Mozilla => MOZILLA_HISTORY_QUERY,
        }
    }

    pub fn epoch(self) -> EpochKind {
        match self {
            Family::Chromium => EpochKind::Webkit,
            Family::Mozilla => EpochKind::Unix,
        }
    }
}

/// OS profile root a locator hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootKind {
    Roaming,
    Local,
}

impl RootKind {
    pub fn env_var(self) -> &'static str {
        match self {
            RootKind::Roaming => "APPDATA",
            RootKind::Local => "LOCALAPPDATA",
        }
    }
}

/// Profile roots, resolved on demand rather than at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileRoots {
    pub roaming: Option<PathBuf>,
    pub local: Option<PathBuf>,
}

impl ProfileRoots {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var_os(var))
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let read = |kind: RootKind| {
            lookup(kind.env_var())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        };
        Self {
            roaming: read(RootKind::Roaming),
            local: read(RootKind::Local),
        }
    }

    /// Roots set in `other` take precedence.
    pub fn overlay(self, other: ProfileRoots) -> Self {
        Self {
            roaming: other.roaming.or(self.roaming),
            local: other.local.or(self.local),
        }
    }

    pub fn get(&self, kind: RootKind) -> Result<&Path, ConfigError> {
        let root = match kind {
            RootKind::Roaming => self.roaming.as_deref(),
            RootKind::Local => self.local.as_deref(),
        };
        root.ok_or(ConfigError::MissingRoot {
            var: kind.env_var(),
        })
    }
}

/// Where a family keeps its database, relative to a profile root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    Fixed {
        root: RootKind,
        suffix: PathBuf,
    },
    /// For browsers whose profile folder name is random per install.
    GlobProfile {
        root: RootKind,
        profiles_dir: PathBuf,
        pattern: String,
        database: String,
    },
}

impl SourceLocator {
    pub fn root(&self) -> RootKind {
        match self {
            SourceLocator::Fixed { root, .. } | SourceLocator::GlobProfile { root, .. } => *root,
        }
    }

    /// Join onto the configured roots. Fails when the root is unset.
    pub fn bind(&self, roots: &ProfileRoots) -> Result<BoundLocator, ConfigError> {
        let base = roots.get(self.root())?;
        match self {
            SourceLocator::Fixed { suffix, .. } => Ok(BoundLocator::fixed(base.join(suffix))),
            SourceLocator::GlobProfile {
                profiles_dir,
                pattern,
                database,
                ..
            } => BoundLocator::glob_profile(base.join(profiles_dir), pattern, database),
        }
    }
}

/// A locator with absolute paths, resolved again on every query.
#[derive(Debug, Clone)]
pub enum BoundLocator {
    Fixed(PathBuf),
    GlobProfile {
        dir: PathBuf,
        pattern: String,
        matcher: GlobMatcher,
        database: String,
    },
}

impl BoundLocator {
    pub fn fixed(path: impl Into<PathBuf>) -> Self {
        BoundLocator::Fixed(path.into())
    }

    pub fn glob_profile(
        dir: impl Into<PathBuf>,
        pattern: &str,
        database: &str,
    ) -> Result<Self, ConfigError> {
        let matcher = Glob::new(pattern)
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?
            .compile_matcher();
        Ok(BoundLocator::GlobProfile {
            dir: dir.into(),
            pattern: pattern.to_string(),
            matcher,
            database: database.to_string(),
        })
    }

    /// Concrete database path.
    ///
    /// Profile folders are sorted by name before matching, so with several
    /// matches the lexically first one wins.
    pub fn resolve(&self) -> Result<PathBuf, ExtractError> {
        match self {
            BoundLocator::Fixed(path) => Ok(path.clone()),
            BoundLocator::GlobProfile {
                dir,
                pattern,
                matcher,
                database,
            } => {
                let not_found = || ExtractError::ProfileNotFound {
                    dir: dir.clone(),
                    pattern: pattern.clone(),
                };
                let entries = match std::fs::read_dir(dir) {
                    Ok(entries) => entries,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                        return Err(not_found());
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                        return Err(ExtractError::PermissionDenied {
                            path: dir.clone(),
                            source: err,
                        });
                    }
                    Err(err) => return Err(err.into()),
                };

                let mut matches: Vec<OsString> = Vec::new();
                for entry in entries {
                    let entry = entry?;
                    let name = entry.file_name();
                    if matcher.is_match(Path::new(&name)) && entry.path().is_dir() {
                        matches.push(name);
                    }
                }
                matches.sort();
                if matches.len() > 1 {
                    debug!(
                        "{} profiles match {pattern:?} in {}; using the first",
                        matches.len(),
                        dir.display()
                    );
                }
                let profile = matches.into_iter().next().ok_or_else(not_found)?;
                Ok(dir.join(profile).join(database))
            }
        }
    }
}

/// Immutable per-browser configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaProfile {
    pub id: String,
    pub family: Family,
    pub locator: SourceLocator,
    /// SELECT without a LIMIT clause; ordering comes from the query itself.
    pub query: &'static str,
    pub epoch: EpochKind,
}

impl SchemaProfile {
    pub fn new(id: impl Into<String>, family: Family, locator: SourceLocator) -> Self {
        Self {
            id: id.into(),
            family,
            locator,
            query: family.query(),
            epoch: family.epoch(),
        }
    }
}

fn relative(parts: &[&str]) -> PathBuf {
    parts.iter().collect()
}

fn chromium(id: &str, parts: &[&str]) -> SchemaProfile {
    SchemaProfile::new(
        id,
        Family::Chromium,
        SourceLocator::Fixed {
            root: RootKind::Local,
            suffix: relative(parts),
        },
    )
}

fn mozilla(id: &str, profiles_dir: &[&str], pattern: &str) -> SchemaProfile {
    SchemaProfile::new(
        id,
        Family::Mozilla,
        SourceLocator::GlobProfile {
            root: RootKind::Roaming,
            profiles_dir: relative(profiles_dir),
            pattern: pattern.to_string(),
            database: "places.sqlite".to_string(),
        },
    )
}

pub fn builtin_profiles() -> Vec<SchemaProfile> {
    vec![
        chromium("chrome", &["Google", "Chrome", "User Data", "Default", "History"]),
        chromium("edge", &["Microsoft", "Edge", "User Data", "Default", "History"]),
        chromium(
            "brave",
            &["BraveSoftware", "Brave-Browser", "User Data", "Default", "History"],
        ),
        chromium("vivaldi", &["Vivaldi", "User Data", "Default", "History"]),
        mozilla("firefox", &["Mozilla", "Firefox", "Profiles"], "*.default-release"),
        mozilla("zen", &["zen", "Profiles"], "*.Default (alpha)"),
    ]
}
