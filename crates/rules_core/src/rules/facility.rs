//! Base facility rules.

use crate::catalog::BASE_BITS;
use crate::document::Node;
use crate::error::RuleFault;
use crate::resolver::{AbsoluteIndex, Scale};
use crate::rules::fields::Fields;
use crate::rules::Category;
use crate::table::{LoadContext, Rule};

/// A base facility definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityRule {
    /// Symbolic id.
    pub id: String,
    /// Ordering weight.
    pub list_order: i32,
    /// Footprint edge length in tiles.
    pub size: i32,
    /// Construction cost.
    pub build_cost: i32,
    /// Construction time in days.
    pub build_time: i32,
    /// Whether this is the base access lift.
    pub lift: bool,
    /// Outline tile in [`BASE_BITS`].
    pub sprite_shape: Option<AbsoluteIndex>,
    /// Finished facility tile in [`BASE_BITS`].
    pub sprite_facility: Option<AbsoluteIndex>,
}

impl FacilityRule {
    /// Blank record for `id`.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            list_order: 0,
            size: 1,
            build_cost: 0,
            build_time: 0,
            lift: false,
            sprite_shape: None,
            sprite_facility: None,
        }
    }
}

impl Rule for FacilityRule {
    const CATEGORY: Category = Category::Facilities;

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
        fields.int("size", &mut self.size)?;
        fields.int("build_cost", &mut self.build_cost)?;
        fields.int("build_time", &mut self.build_time)?;
        fields.boolean("lift", &mut self.lift)?;
        fields.reference("sprite_shape", ctx, BASE_BITS, Scale::ONE, &mut self.sprite_shape)?;
        fields.reference(
            "sprite_facility",
            ctx,
            BASE_BITS,
            Scale::ONE,
            &mut self.sprite_facility,
        )?;
        Ok(())
    }
}
