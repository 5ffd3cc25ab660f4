//! Resource catalogs that numeric references resolve into.
//!
//! The loader never looks inside a catalog. It only needs the name and the
//! size of the shared region every tenant sees identically.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CatalogFault;

/// Sprite sheet with large item pictures.
pub const BIG_OBJECTS: &str = "BIGOBS.PCK";
/// Sprite sheet with items lying on the floor.
pub const FLOOR_OBJECTS: &str = "FLOOROB.PCK";
/// Sprite sheet with items held in hand.
pub const HAND_OBJECTS: &str = "HANDOB.PCK";
/// Base facility tiles.
pub const BASE_BITS: &str = "BASEBITS.PCK";
/// Interception window icons.
pub const INTERCEPT_ICONS: &str = "INTICON.PCK";
/// Battlescape sound bank.
pub const BATTLE_SOUNDS: &str = "BATTLE.CAT";
/// Geoscape sound bank.
pub const GEO_SOUNDS: &str = "GEO.CAT";
/// Shared color transform tables, priced per table.
pub const RECOLOR: &str = "RECOLOR";

/// Built-in catalogs and the size of their shared regions.
pub const DEFAULT_CATALOGS: &[(&str, i64)] = &[
    (BIG_OBJECTS, 57),
    (FLOOR_OBJECTS, 73),
    (HAND_OBJECTS, 128),
    (BASE_BITS, 34),
    (INTERCEPT_ICONS, 11),
    (BATTLE_SOUNDS, 55),
    (GEO_SOUNDS, 14),
    (RECOLOR, 8),
];

/// A named pool of numeric slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Catalog name as used by content files.
    pub name: String,
    /// Values below this are shared by every tenant.
    pub shared_max: i64,
}

impl Catalog {
    /// Create a catalog.
    #[must_use]
    pub fn new(name: impl Into<String>, shared_max: i64) -> Self {
        Self {
            name: name.into(),
            shared_max,
        }
    }

    /// Check that the shared region is non-negative and no larger than
    /// `region`, the size of the smallest tenant region.
    ///
    /// # Errors
    ///
    /// Returns the [`CatalogFault`] describing the violated bound.
    pub fn check(&self, region: i64) -> Result<(), CatalogFault> {
        if self.shared_max < 0 {
            return Err(CatalogFault::NegativeShared {
                catalog: self.name.clone(),
                shared_max: self.shared_max,
            });
        }
        if self.shared_max > region {
            return Err(CatalogFault::SharedExceedsRegion {
                catalog: self.name.clone(),
                shared_max: self.shared_max,
                limit: region,
            });
        }
        Ok(())
    }
}

/// All catalogs known to a session, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSet {
    catalogs: BTreeMap<String, Catalog>,
}

impl Default for CatalogSet {
    fn default() -> Self {
        let mut set = Self::empty();
        for (name, shared_max) in DEFAULT_CATALOGS {
            set.insert(Catalog::new(*name, *shared_max));
        }
        set
    }
}

impl CatalogSet {
    /// A set with no catalogs at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            catalogs: BTreeMap::new(),
        }
    }

    /// Add or replace a catalog. Returns the previous definition.
    pub fn insert(&mut self, catalog: Catalog) -> Option<Catalog> {
        self.catalogs.insert(catalog.name.clone(), catalog)
    }

    /// Catalog by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Catalog> {
        self.catalogs.get(name)
    }

    /// All catalogs, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &Catalog> {
        self.catalogs.values()
    }

    /// Number of catalogs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    /// Check every catalog; see [`Catalog::check`].
    ///
    /// # Errors
    ///
    /// Returns the first failing catalog's fault.
    pub fn check(&self, region: i64) -> Result<(), CatalogFault> {
        self.iter().try_for_each(|catalog| catalog.check(region))
    }

    /// True when no catalog is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}
