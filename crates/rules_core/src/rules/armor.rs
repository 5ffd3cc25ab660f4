//! Armor rules.

use crate::catalog::RECOLOR;
use crate::document::Node;
use crate::error::RuleFault;
use crate::resolver::{AbsoluteIndex, Scale};
use crate::rules::fields::Fields;
use crate::rules::{Category, ItemRule};
use crate::table::{LoadContext, Rule, RuleRef};

/// Recolor tables are accounted per table, not per slot.
pub const RECOLOR_SIZE_SCALE: i64 = 100;

/// An armor definition. Lists follow the order of the store item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmorRule {
    /// Symbolic id.
    pub id: String,
    /// Own ordering weight.
    pub list_order: i32,
    /// Item representing the armor in stores (`STR_NONE` for none).
    pub store_item: Option<RuleRef<ItemRule>>,
    /// Front armor value.
    pub front_armor: i32,
    /// Color transform table in [`RECOLOR`].
    pub recolor: Option<AbsoluteIndex>,
}

impl ArmorRule {
    /// Blank record for `id`.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            list_order: 0,
            store_item: None,
            front_armor: 0,
            recolor: None,
        }
    }
}

impl Rule for ArmorRule {
    const CATEGORY: Category = Category::Armors;

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
        fields.link("store_item", &mut self.store_item)?;
        fields.int("front_armor", &mut self.front_armor)?;
        fields.reference(
            "recolor",
            ctx,
            RECOLOR,
            Scale::size_scale(RECOLOR_SIZE_SCALE),
            &mut self.recolor,
        )?;
        Ok(())
    }
}
