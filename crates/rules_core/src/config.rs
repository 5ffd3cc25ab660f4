//! Session configuration.
//!
//! Options come from three places, later ones winning: compiled defaults
//! (the `strict-by-default` feature), a RON [`SessionConfig`] file, and the
//! `RULES_STRICT` environment variable.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CatalogSet};
use crate::error::{CatalogFault, FileFault};

/// Set to `1` or `true` to abort on the first tenant fault.
pub const STRICT_ENV: &str = "RULES_STRICT";

/// Overrides the directory searched for a manifest.
pub const DATA_DIR_ENV: &str = "RULES_DATA_DIR";

/// File name looked up inside a data directory.
pub const MANIFEST_FILE: &str = "manifest.ron";

/// Options for one load session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Abort on the first tenant fault instead of quarantining.
    pub strict: bool,
    /// Catalogs before any resource config is applied.
    pub catalogs: CatalogSet,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            strict: cfg!(feature = "strict-by-default"),
            catalogs: CatalogSet::default(),
        }
    }
}

impl LoadOptions {
    /// Defaults with the environment applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Turn strict mode on if `RULES_STRICT` asks for it.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        if strict_from_env() {
            self.strict = true;
        }
        self
    }

    /// Set strict mode.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Add or replace a catalog.
    #[must_use]
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalogs.insert(catalog);
        self
    }
}

/// Session settings read from a RON file.
///
/// ```ron
/// SessionConfig(
///     strict: Some(true),
///     manifest: Some("data/manifest.ron"),
///     catalogs: [Catalog(name: "BIGOBS.PCK", shared_max: 60)],
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Abort on the first tenant fault. Unset keeps the compiled default.
    #[serde(default)]
    pub strict: Option<bool>,
    /// Manifest to load, relative to the config file.
    #[serde(default)]
    pub manifest: Option<PathBuf>,
    /// Catalog overrides applied on top of the built-in set.
    #[serde(default)]
    pub catalogs: Vec<Catalog>,
}

impl SessionConfig {
    /// Read a session config file.
    ///
    /// # Errors
    ///
    /// Returns [`FileFault`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, FileFault> {
        let mut config: Self = read_ron(path)?;
        if let (Some(manifest), Some(dir)) = (config.manifest.as_mut(), path.parent()) {
            *manifest = dir.join(&*manifest);
        }
        Ok(config)
    }

    /// Build load options; the environment still applies on top.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogFault::NegativeShared`] for a catalog with a
    /// negative threshold. The upper bound is checked once tenants are
    /// allocated.
    pub fn to_options(&self) -> Result<LoadOptions, CatalogFault> {
        let mut options = LoadOptions::default();
        if let Some(strict) = self.strict {
            options.strict = strict;
        }
        for catalog in &self.catalogs {
            catalog.check(i64::MAX)?;
            options.catalogs.insert(catalog.clone());
        }
        Ok(options.with_env())
    }
}

/// A tenant's resource config, read before the baseline materializes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Catalogs to add or whose shared threshold to replace.
    #[serde(default)]
    pub catalogs: Vec<Catalog>,
}

impl ResourceConfig {
    /// Read a resource config file.
    ///
    /// # Errors
    ///
    /// Returns [`FileFault`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, FileFault> {
        read_ron(path)
    }

    /// Apply to `catalogs`, returning how many entries changed.
    ///
    /// `region` is the size of the smallest allocated tenant region; no
    /// shared threshold may exceed it.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogFault`] and leaves `catalogs` untouched if any
    /// declared catalog is out of bounds.
    pub fn apply(&self, catalogs: &mut CatalogSet, region: i64) -> Result<usize, CatalogFault> {
        for catalog in &self.catalogs {
            catalog.check(region)?;
        }
        let mut changed = 0;
        for catalog in &self.catalogs {
            match catalogs.insert(catalog.clone()) {
                Some(previous) if previous == *catalog => {}
                Some(previous) => {
                    tracing::debug!(
                        catalog = %catalog.name,
                        from = previous.shared_max,
                        to = catalog.shared_max,
                        "Overrode catalog threshold"
                    );
                    changed += 1;
                }
                None => {
                    tracing::debug!(
                        catalog = %catalog.name,
                        shared_max = catalog.shared_max,
                        "Declared catalog"
                    );
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }
}

/// True when `RULES_STRICT` is set to `1` or `true`.
#[must_use]
pub fn strict_from_env() -> bool {
    std::env::var(STRICT_ENV)
        .map(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(false)
}

/// Default data directory.
///
/// Checks, in order:
/// 1. Environment variable `RULES_DATA_DIR`
/// 2. `data/` and `assets/data/` under the working directory
#[must_use]
pub fn default_data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        let path = PathBuf::from(dir);
        if path.exists() {
            return Some(path);
        }
    }

    ["data", "assets/data"]
        .iter()
        .map(PathBuf::from)
        .find(|path| path.join(MANIFEST_FILE).exists())
}

/// Default manifest path, if a data directory was found.
#[must_use]
pub fn default_manifest() -> Option<PathBuf> {
    default_data_dir().map(|dir| dir.join(MANIFEST_FILE))
}

fn read_ron<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, FileFault> {
    let contents = fs::read_to_string(path).map_err(|source| FileFault::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(|source| FileFault::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BIG_OBJECTS;

    #[test]
    fn test_resource_config_overrides_and_adds() {
        let config: ResourceConfig = ron::from_str(
            r#"ResourceConfig(catalogs: [
                Catalog(name: "BIGOBS.PCK", shared_max: 60),
                Catalog(name: "SCANG.DAT", shared_max: 50),
                Catalog(name: "GEO.CAT", shared_max: 14),
            ])"#,
        )
        .unwrap();
        let mut catalogs = CatalogSet::default();
        let before = catalogs.len();

        assert_eq!(config.apply(&mut catalogs, 1000), Ok(2));
        assert_eq!(catalogs.get(BIG_OBJECTS).map(|c| c.shared_max), Some(60));
        assert_eq!(catalogs.len(), before + 1);
    }

    #[test]
    fn test_session_config_to_options() {
        let config: SessionConfig = ron::from_str(
            r#"SessionConfig(strict: Some(true), catalogs: [Catalog(name: "X.PCK", shared_max: 3)])"#,
        )
        .unwrap();
        let options = config.to_options().unwrap();
        assert!(options.strict);
        assert!(options.catalogs.get("X.PCK").is_some());
        assert!(config.manifest.is_none());
    }

    #[test]
    fn test_session_config_without_strict_keeps_default() {
        let config: SessionConfig = ron::from_str("SessionConfig()").unwrap();
        assert_eq!(config.strict, None);
        let options = config.to_options().unwrap();
        assert_eq!(options.strict, LoadOptions::default().with_env().strict);

        let config: SessionConfig = ron::from_str("SessionConfig(strict: Some(false))").unwrap();
        assert_eq!(config.strict, Some(false));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let config: SessionConfig = ron::from_str(
            r#"SessionConfig(catalogs: [Catalog(name: "X.PCK", shared_max: -5)])"#,
        )
        .unwrap();
        assert!(matches!(
            config.to_options(),
            Err(CatalogFault::NegativeShared { shared_max: -5, .. })
        ));

        let resources = ResourceConfig {
            catalogs: vec![
                Catalog::new("BIGOBS.PCK", 60),
                Catalog::new("HUGE.PCK", 5_000_000),
            ],
        };
        let mut catalogs = CatalogSet::default();
        let before = catalogs.clone();
        assert!(matches!(
            resources.apply(&mut catalogs, 1000),
            Err(CatalogFault::SharedExceedsRegion { limit: 1000, .. })
        ));
        assert_eq!(catalogs, before);
    }
}
