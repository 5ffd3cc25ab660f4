//! Inventory item rules.

use serde::{Deserialize, Serialize};

use crate::catalog::{BATTLE_SOUNDS, BIG_OBJECTS, FLOOR_OBJECTS, HAND_OBJECTS};
use crate::document::Node;
use crate::error::RuleFault;
use crate::resolver::{AbsoluteIndex, Scale};
use crate::rules::fields::Fields;
use crate::rules::Category;
use crate::table::{LoadContext, Rule};

/// Frames per hand-held sprite strip (one per facing).
pub const HAND_SPRITE_FRAMES: i64 = 8;

/// Structural classification of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ItemKind {
    /// Plain item with no battle use.
    #[default]
    None,
    /// Gun carried by a soldier.
    Firearm,
    /// Ammunition clip.
    Ammo,
    /// Close combat weapon.
    Melee,
    /// Item that stands for a craft weapon in stores.
    CraftWeapon,
    /// Item that stands for an armor in stores.
    Armor,
}

impl ItemKind {
    /// Parse the authored name.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "none" => Some(Self::None),
            "firearm" => Some(Self::Firearm),
            "ammo" => Some(Self::Ammo),
            "melee" => Some(Self::Melee),
            "craft_weapon" => Some(Self::CraftWeapon),
            "armor" => Some(Self::Armor),
            _ => None,
        }
    }
}

/// An item definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRule {
    /// Symbolic id.
    pub id: String,
    /// Ordering weight.
    pub list_order: i32,
    /// Structural classification.
    pub kind: ItemKind,
    /// Purchase price (0 = cannot be bought).
    pub cost_buy: i32,
    /// Storage size in hundredths of a unit.
    pub size: i32,
    /// Picture in [`BIG_OBJECTS`].
    pub big_sprite: Option<AbsoluteIndex>,
    /// Picture in [`FLOOR_OBJECTS`].
    pub floor_sprite: Option<AbsoluteIndex>,
    /// First frame of the strip in [`HAND_OBJECTS`].
    pub hand_sprite: Option<AbsoluteIndex>,
    /// Firing sounds in [`BATTLE_SOUNDS`].
    pub fire_sounds: Vec<AbsoluteIndex>,
}

impl ItemRule {
    /// Blank record for `id`.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            list_order: 0,
            kind: ItemKind::None,
            cost_buy: 0,
            size: 20,
            big_sprite: None,
            floor_sprite: None,
            hand_sprite: None,
            fire_sounds: Vec::new(),
        }
    }
}

impl Rule for ItemRule {
    const CATEGORY: Category = Category::Items;

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
        fields.parsed("kind", &mut self.kind, ItemKind::parse)?;
        fields.int("cost_buy", &mut self.cost_buy)?;
        fields.int("size", &mut self.size)?;
        fields.reference("big_sprite", ctx, BIG_OBJECTS, Scale::ONE, &mut self.big_sprite)?;
        fields.reference("floor_sprite", ctx, FLOOR_OBJECTS, Scale::ONE, &mut self.floor_sprite)?;
        fields.reference(
            "hand_sprite",
            ctx,
            HAND_OBJECTS,
            Scale::multiplier(HAND_SPRITE_FRAMES),
            &mut self.hand_sprite,
        )?;
        fields.reference_list("fire_sound", ctx, BATTLE_SOUNDS, &mut self.fire_sounds)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogSet;
    use crate::document::parse_ron;
    use crate::resolver::Resolver;
    use crate::tenant::{TenantSpec, TenantTable};

    #[test]
    fn test_load_resolves_references_in_active_tenant() {
        let tenants = TenantTable::allocate(&[
            TenantSpec::new("xcom1", 1).master(),
            TenantSpec::new("mod", 2),
        ])
        .unwrap();
        let catalogs = CatalogSet::default();
        let active = tenants.by_name("mod").unwrap();
        let ctx = LoadContext::new(Resolver::new(&tenants, &catalogs), active);

        let node = parse_ron(
            r#"{
                "type": "STR_LASER",
                "kind": "firearm",
                "big_sprite": 60,
                "floor_sprite": 3,
                "hand_sprite": 17,
                "fire_sound": [12, { "index": 56, "tenant": "master" }],
            }"#,
        )
        .unwrap();

        let mut item = ItemRule::new("STR_LASER");
        item.load(&node, &ctx).unwrap();
        assert_eq!(item.kind, ItemKind::Firearm);
        assert_eq!(item.big_sprite, Some(1060));
        assert_eq!(item.floor_sprite, Some(3));
        assert_eq!(item.hand_sprite, Some(136 + 1000));
        assert_eq!(item.fire_sounds, vec![12, 56]);
        assert_eq!(item.size, 20);
    }

    #[test]
    fn test_unknown_kind() {
        let tenants = TenantTable::allocate(&[TenantSpec::new("xcom1", 1)]).unwrap();
        let catalogs = CatalogSet::default();
        let ctx = LoadContext::new(Resolver::new(&tenants, &catalogs), tenants.baseline());
        let node = parse_ron(r#"{ "type": "X", "kind": "laser" }"#).unwrap();
        let err = ItemRule::new("X").load(&node, &ctx).unwrap_err();
        assert!(matches!(err, RuleFault::Field { ref field, .. } if field == "kind"));
    }
}
