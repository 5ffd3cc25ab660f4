//! Sample rule categories.
//!
//! These records exist to drive the loading protocol end to end: plain
//! weights, weights derived from a linked record, grouped ordering,
//! integrity links and catalog references with multipliers and size scales.
//! Their fields are deliberately small.

mod armor;
mod article;
mod craft_weapon;
pub mod fields;
mod facility;
mod item;

use serde::{Deserialize, Serialize};

pub use armor::ArmorRule;
pub use article::ArticleRule;
pub use craft_weapon::CraftWeaponRule;
pub use facility::FacilityRule;
pub use item::{ItemKind, ItemRule};

/// Tag identifying a rule category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Inventory items.
    Items,
    /// Weapons mounted on craft.
    CraftWeapons,
    /// Soldier armors.
    Armors,
    /// Base facilities.
    Facilities,
    /// Encyclopedia articles.
    Articles,
}

impl Category {
    /// Every category, in load dispatch order.
    pub const ALL: [Self; 5] = [
        Self::Items,
        Self::CraftWeapons,
        Self::Armors,
        Self::Facilities,
        Self::Articles,
    ];

    /// Top-level key of the category's list in content files.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Items => "items",
            Self::CraftWeapons => "craft_weapons",
            Self::Armors => "armors",
            Self::Facilities => "facilities",
            Self::Articles => "ufopaedia",
        }
    }

    /// Category for a top-level key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
