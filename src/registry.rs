//! Browser id to extractor lookup.

use crate::config::Config;
use crate::error::ConfigError;
use crate::extractor::HistoryExtractor;
use crate::profile::{ProfileRoots, SchemaProfile, builtin_profiles};
use crate::safe_copy::SafeCopyOptions;

/// Known browser profiles bound to one set of profile roots.
///
/// Ids are matched case-insensitively.
#[derive(Debug)]
pub struct BrowserRegistry {
    profiles: Vec<SchemaProfile>,
    roots: ProfileRoots,
    copy_opts: SafeCopyOptions,
}

impl BrowserRegistry {
    /// Registry holding the built-in profiles.
    pub fn new(roots: ProfileRoots, copy_opts: SafeCopyOptions) -> Self {
        Self {
            profiles: builtin_profiles(),
            roots,
            copy_opts,
        }
    }

    /// Built-in profiles plus the browsers declared in `cfg`.
    pub fn from_config(cfg: &Config, roots: ProfileRoots) -> Result<Self, ConfigError> {
        let mut registry = Self::new(roots, cfg.copy_options());
        for entry in &cfg.browsers {
            registry.register(entry.to_profile())?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, mut profile: SchemaProfile) -> Result<(), ConfigError> {
        profile.id = normalize_id(&profile.id);
        if self.profiles.iter().any(|p| p.id == profile.id) {
            return Err(ConfigError::DuplicateBrowser(profile.id));
        }
        self.profiles.push(profile);
        Ok(())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.id.as_str())
    }

    pub fn profile(&self, id: &str) -> Result<&SchemaProfile, ConfigError> {
        let id = normalize_id(id);
        self.profiles
            .iter()
            .find(|p| p.id == id)
            .ok_or(ConfigError::InvalidBrowser(id))
    }

    /// Bind the profile's locator to the roots and build its extractor.
    ///
    /// An unset root fails here rather than on the first query.
    pub fn get(&self, id: &str) -> Result<HistoryExtractor, ConfigError> {
        let profile = self.profile(id)?;
        let locator = profile.locator.bind(&self.roots)?;
        Ok(HistoryExtractor::new(
            profile.clone(),
            locator,
            self.copy_opts.clone(),
        ))
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}
