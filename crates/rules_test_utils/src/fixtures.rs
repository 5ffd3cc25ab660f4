//! Test fixtures and helpers.
//!
//! Temporary content directories, manifest entries and small sample
//! documents for consistent testing.

use std::fs;
use std::path::{Path, PathBuf};

use rules_core::manifest::{Manifest, RonManifest, TenantEntry};
use rules_core::tenant::{TenantSpec, TenantTable};
use tempfile::TempDir;

/// Baseline-capable manifest entry with one capacity unit.
#[must_use]
pub fn master_entry(name: &str) -> TenantEntry {
    TenantEntry {
        master: true,
        ..TenantEntry::new(name)
    }
}

/// Plain manifest entry.
#[must_use]
pub fn tenant_entry(name: &str, reserved_space: u32) -> TenantEntry {
    TenantEntry {
        reserved_space,
        ..TenantEntry::new(name)
    }
}

/// Allocate tenants from `(name, capacity)` pairs; the first is baseline.
///
/// # Panics
///
/// Panics if allocation fails.
#[must_use]
pub fn tenants(specs: &[(&str, u32)]) -> TenantTable {
    let specs: Vec<TenantSpec> = specs
        .iter()
        .enumerate()
        .map(|(i, (name, capacity))| {
            let spec = TenantSpec::new(*name, *capacity);
            if i == 0 {
                spec.master()
            } else {
                spec
            }
        })
        .collect();
    TenantTable::allocate(&specs).expect("fixture tenants must allocate")
}

/// A throwaway directory holding a manifest and content files.
///
/// Dropped with the value.
pub struct ContentDir {
    dir: TempDir,
    tenants: Vec<TenantEntry>,
}

impl ContentDir {
    /// Create an empty content directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
            tenants: Vec::new(),
        }
    }

    /// Root of the directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the root, creating parent directories.
    ///
    /// # Panics
    ///
    /// Panics on IO failure.
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create content dir");
        }
        fs::write(&path, contents).expect("write content file");
        path
    }

    /// Add a tenant whose files are `(relative path, contents)` pairs.
    pub fn tenant(&mut self, mut entry: TenantEntry, files: &[(&str, &str)]) -> &mut Self {
        for (relative, contents) in files {
            self.write(relative, contents);
            entry.files.push(PathBuf::from(relative));
        }
        self.tenants.push(entry);
        self
    }

    /// Manifest describing every tenant added so far.
    #[must_use]
    pub fn manifest(&self) -> Manifest {
        Manifest {
            tenants: self.tenants.clone(),
        }
    }

    /// Write `manifest.ron` and open it as a file-backed source.
    ///
    /// # Panics
    ///
    /// Panics if the manifest cannot be written.
    #[must_use]
    pub fn ron_manifest(&self) -> RonManifest {
        RonManifest::create(self.dir.path().join("manifest.ron"), self.manifest())
            .expect("write manifest")
    }
}

impl Default for ContentDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Baseline content: a few items, craft weapons and articles.
pub const BASELINE_RULES: &str = r#"{
    "ufopaedia_sections": [ "STR_XCOM_CRAFT_ARMAMENT", "STR_WEAPONS_AND_EQUIPMENT" ],
    "items": [
        { "type": "STR_PISTOL", "kind": "firearm", "big_sprite": 3, "hand_sprite": 0 },
        { "type": "STR_CANNON_UC", "kind": "craft_weapon", "list_order": 900 },
        { "type": "STR_STINGRAY_LAUNCHER", "kind": "craft_weapon", "list_order": 800 },
        { "type": "STR_CANNON_ROUNDS_X50", "kind": "ammo" },
    ],
    "craft_weapons": [
        { "type": "STR_CANNON", "launcher": "STR_CANNON_UC", "clip": "STR_CANNON_ROUNDS_X50" },
        { "type": "STR_STINGRAY", "launcher": "STR_STINGRAY_LAUNCHER" },
    ],
    "facilities": [
        { "type": "STR_ACCESS_LIFT", "lift": true, "sprite_facility": 17 },
    ],
    "ufopaedia": [
        { "type": "STR_PISTOL", "section": "STR_WEAPONS_AND_EQUIPMENT", "item": "STR_PISTOL" },
        { "type": "STR_CANNON", "section": "STR_XCOM_CRAFT_ARMAMENT" },
    ],
}"#;

/// A tenant that adds a laser line and one extra sprite.
pub const LASER_RULES: &str = r#"{
    "items": [
        { "new": "STR_LASER_CANNON_UC", "kind": "craft_weapon", "list_order": 850, "big_sprite": 60 },
        { "update": "STR_PISTOL", "cost_buy": 800 },
    ],
    "craft_weapons": [
        { "type": "STR_LASER_CANNON", "launcher": "STR_LASER_CANNON_UC" },
    ],
    "extra_sprites": [
        { "catalog": "BIGOBS.PCK", "files": { 60: "laser.png" } },
    ],
}"#;
