use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::profile::{Family, ProfileRoots, RootKind, SchemaProfile, SourceLocator};
use crate::safe_copy::{DEFAULT_CLEANUP_RETRIES, SafeCopyOptions};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_browser")]
    pub default_browser: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub roots: RootsConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    /// Where temporary copies go; the system temp dir when unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    #[serde(default)]
    pub browsers: Vec<BrowserEntry>,
}

/// Overrides for the `APPDATA` / `LOCALAPPDATA` roots.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RootsConfig {
    pub roaming: Option<PathBuf>,
    pub local: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CleanupConfig {
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// A browser declared in configuration rather than built in.
#[derive(Debug, Deserialize, Clone)]
pub struct BrowserEntry {
    pub id: String,
    pub family: Family,
    pub root: RootKind,
    #[serde(flatten)]
    pub location: BrowserLocation,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum BrowserLocation {
    Profiles {
        profiles_dir: PathBuf,
        pattern: String,
        database: Option<String>,
    },
    Path {
        path: PathBuf,
    },
}

impl BrowserEntry {
    pub fn to_profile(&self) -> SchemaProfile {
        let locator = match &self.location {
            BrowserLocation::Path { path } => SourceLocator::Fixed {
                root: self.root,
                suffix: path.clone(),
            },
            BrowserLocation::Profiles {
                profiles_dir,
                pattern,
                database,
            } => SourceLocator::GlobProfile {
                root: self.root,
                profiles_dir: profiles_dir.clone(),
                pattern: pattern.clone(),
                database: database
                    .clone()
                    .unwrap_or_else(|| default_database(self.family).to_string()),
            },
        };
        SchemaProfile::new(self.id.as_str(), self.family, locator)
    }
}

impl Config {
    pub fn roots(&self) -> ProfileRoots {
        ProfileRoots {
            roaming: self.roots.roaming.clone(),
            local: self.roots.local.clone(),
        }
    }

    pub fn copy_options(&self) -> SafeCopyOptions {
        SafeCopyOptions {
            temp_dir: self.temp_dir.clone(),
            cleanup_retries: self.cleanup.retries,
            cleanup_backoff: Duration::from_millis(self.cleanup.backoff_ms),
            ..SafeCopyOptions::default()
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let bytes: Vec<u8> = if let Some(p) = path {
        std::fs::read(p)?
    } else {
        include_bytes!("../config/default.yml").to_vec()
    };

    let config: Config = serde_yaml::from_slice(&bytes)?;
    Ok(config)
}

fn default_database(family: Family) -> &'static str {
    match family {
        Family::Chromium => "History",
        Family::Mozilla => "places.sqlite",
    }
}

fn default_browser() -> String {
    "chrome".to_string()
}

fn default_limit() -> u32 {
    10_000
}

fn default_retries() -> u32 {
    DEFAULT_CLEANUP_RETRIES
}

fn default_backoff_ms() -> u64 {
    500
}
