//! Craft weapon rules.
//!
//! A craft weapon is listed in the order of its launcher item, and the
//! launcher must be an item of kind [`ItemKind::CraftWeapon`](crate::rules::ItemKind).

use crate::catalog::{GEO_SOUNDS, INTERCEPT_ICONS};
use crate::document::Node;
use crate::error::RuleFault;
use crate::resolver::{AbsoluteIndex, Scale};
use crate::rules::fields::Fields;
use crate::rules::{Category, ItemRule};
use crate::table::{LoadContext, Rule, RuleRef};

/// A craft weapon definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CraftWeaponRule {
    /// Symbolic id.
    pub id: String,
    /// Own ordering weight (lists use the launcher's weight).
    pub list_order: i32,
    /// Item representing the weapon in base stores.
    pub launcher: Option<RuleRef<ItemRule>>,
    /// Item consumed when reloading.
    pub clip: Option<RuleRef<ItemRule>>,
    /// Damage per hit.
    pub damage: i32,
    /// Range in kilometers.
    pub range: i32,
    /// Icon in [`INTERCEPT_ICONS`].
    pub icon: Option<AbsoluteIndex>,
    /// Firing sound in [`GEO_SOUNDS`].
    pub sound: Option<AbsoluteIndex>,
}

impl CraftWeaponRule {
    /// Blank record for `id`.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            list_order: 0,
            launcher: None,
            clip: None,
            damage: 0,
            range: 0,
            icon: None,
            sound: None,
        }
    }
}

impl Rule for CraftWeaponRule {
    const CATEGORY: Category = Category::CraftWeapons;

    fn id(&self) -> &str {
        &self.id
    }

    fn list_order(&self) -> i32 {
        self.list_order
    }

    fn set_list_order(&mut self, order: i32) {
        self.list_order = order;
    }

    fn load(&mut self, node: &Node, ctx: &LoadContext<'_>) -> Result<(), RuleFault> {
        let fields = Fields::new(Self::CATEGORY, &self.id, node);
        fields.link("launcher", &mut self.launcher)?;
        fields.link("clip", &mut self.clip)?;
        fields.int("damage", &mut self.damage)?;
        fields.int("range", &mut self.range)?;
        fields.reference("icon", ctx, INTERCEPT_ICONS, Scale::ONE, &mut self.icon)?;
        fields.reference("sound", ctx, GEO_SOUNDS, Scale::ONE, &mut self.sound)?;
        Ok(())
    }
}
