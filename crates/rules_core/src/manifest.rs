//! Tenant manifests.
//!
//! The manifest lists tenants in load order together with their files and
//! an `enabled` flag. Quarantine writes through [`ManifestSource::disable`],
//! so a broken tenant stays off on the next run.
//!
//! Example manifest:
//!
//! ```ron
//! Manifest(
//!     tenants: [
//!         TenantEntry(name: "xcom1", master: true, files: ["xcom1/rules.ron"]),
//!         TenantEntry(name: "lasers", reserved_space: 2, files: ["lasers/rules.ron"]),
//!     ],
//! )
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;
use crate::tenant::TenantSpec;

/// One tenant as declared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantEntry {
    /// Unique tenant name.
    pub name: String,
    /// Name shown in diagnostics. Falls back to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Reserved capacity in 1000-slot units.
    #[serde(default = "default_reserved_space")]
    pub reserved_space: u32,
    /// Whether the tenant may act as the baseline.
    #[serde(default)]
    pub master: bool,
    /// Resource config loaded before the baseline materializes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_config: Option<PathBuf>,
    /// Rule files in load order, relative to the manifest directory.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Disabled tenants are skipped entirely.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_reserved_space() -> u32 {
    1
}

const fn default_enabled() -> bool {
    true
}

impl TenantEntry {
    /// Enabled entry with default capacity and no files.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            reserved_space: default_reserved_space(),
            master: false,
            resource_config: None,
            files: Vec::new(),
            enabled: true,
        }
    }

    /// Name used in diagnostics.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Allocation request for this entry.
    #[must_use]
    pub fn spec(&self) -> TenantSpec {
        TenantSpec {
            name: self.name.clone(),
            display_name: self.display_name().to_string(),
            capacity: self.reserved_space,
            master: self.master,
        }
    }
}

/// The whole manifest document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Tenants in load order.
    #[serde(default)]
    pub tenants: Vec<TenantEntry>,
}

impl Manifest {
    /// Disable the last enabled entry called `name`.
    ///
    /// The last one is chosen so that a duplicate declared later is the
    /// entry switched off. Returns false when no enabled entry matches.
    pub fn disable(&mut self, name: &str) -> bool {
        match self
            .tenants
            .iter_mut()
            .rev()
            .find(|entry| entry.enabled && entry.name == name)
        {
            Some(entry) => {
                entry.enabled = false;
                true
            }
            None => false,
        }
    }

    /// Disable every entry.
    pub fn disable_all(&mut self) {
        for entry in &mut self.tenants {
            entry.enabled = false;
        }
    }
}

/// Where the orchestrator reads tenants from and records quarantines.
pub trait ManifestSource {
    /// All entries in manifest order, enabled or not.
    fn entries(&self) -> &[TenantEntry];

    /// Directory that relative paths in the manifest are resolved against.
    fn base_dir(&self) -> &Path;

    /// Durably disable the tenant called `name`.
    ///
    /// Returns `Ok(false)` when no enabled entry has that name.
    ///
    /// # Errors
    ///
    /// Fails when the change cannot be persisted.
    fn disable(&mut self, name: &str) -> Result<bool, ManifestError>;

    /// Durably disable every tenant.
    ///
    /// # Errors
    ///
    /// Fails when the change cannot be persisted.
    fn disable_all(&mut self) -> Result<(), ManifestError>;

    /// Enabled entries in manifest order.
    fn enabled(&self) -> Vec<&TenantEntry> {
        self.entries().iter().filter(|entry| entry.enabled).collect()
    }
}

/// Manifest held in memory only. Used by tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct MemoryManifest {
    manifest: Manifest,
    base_dir: PathBuf,
}

impl MemoryManifest {
    /// Wrap a list of entries.
    #[must_use]
    pub fn new(tenants: Vec<TenantEntry>) -> Self {
        Self {
            manifest: Manifest { tenants },
            base_dir: PathBuf::new(),
        }
    }

    /// Resolve relative paths against `dir`.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// The current manifest state.
    #[must_use]
    pub const fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

impl ManifestSource for MemoryManifest {
    fn entries(&self) -> &[TenantEntry] {
        &self.manifest.tenants
    }

    fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn disable(&mut self, name: &str) -> Result<bool, ManifestError> {
        Ok(self.manifest.disable(name))
    }

    fn disable_all(&mut self) -> Result<(), ManifestError> {
        self.manifest.disable_all();
        Ok(())
    }
}

/// Manifest backed by a RON file. Every disable rewrites the file.
#[derive(Debug, Clone)]
pub struct RonManifest {
    path: PathBuf,
    base_dir: PathBuf,
    manifest: Manifest,
}

impl RonManifest {
    /// Read a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if the file cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let path = path.into();
        let contents = fs::read_to_string(&path).map_err(|source| ManifestError::Io {
            path: path.clone(),
            source,
        })?;
        let manifest: Manifest = ron::from_str(&contents).map_err(|source| ManifestError::Parse {
            path: path.clone(),
            source,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        tracing::debug!(
            path = %path.display(),
            tenants = manifest.tenants.len(),
            "Loaded manifest"
        );
        Ok(Self {
            path,
            base_dir,
            manifest,
        })
    }

    /// Write `manifest` to `path` and return the backed source.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if the file cannot be written.
    pub fn create(path: impl Into<PathBuf>, manifest: Manifest) -> Result<Self, ManifestError> {
        let path = path.into();
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let source = Self {
            path,
            base_dir,
            manifest,
        };
        source.save()?;
        Ok(source)
    }

    /// Persist the current state.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if serialization or the write fails.
    pub fn save(&self) -> Result<(), ManifestError> {
        let text = ron::ser::to_string_pretty(&self.manifest, ron::ser::PrettyConfig::default())
            .map_err(|source| ManifestError::Serialize {
                path: self.path.clone(),
                source,
            })?;
        fs::write(&self.path, text).map_err(|source| ManifestError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current manifest state.
    #[must_use]
    pub const fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

impl ManifestSource for RonManifest {
    fn entries(&self) -> &[TenantEntry] {
        &self.manifest.tenants
    }

    fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn disable(&mut self, name: &str) -> Result<bool, ManifestError> {
        if !self.manifest.disable(name) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    fn disable_all(&mut self) -> Result<(), ManifestError> {
        self.manifest.disable_all();
        self.save()
    }
}
