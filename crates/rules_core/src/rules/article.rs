//! Encyclopedia article rules.
//!
//! Articles are listed section by section, then by their own weight.

use crate::document::Node;
use crate::error::RuleFault;
use crate::rules::fields::Fields;
use crate::rules::{Category, ItemRule};
use crate::table::{LoadContext, Rule, RuleRef};

/// Section used when an article names none.
pub const DEFAULT_SECTION: &str = "STR_NOT_AVAILABLE";

/// An encyclopedia article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRule {
    /// Symbolic id.
    pub id: String,
    /// Ordering weight inside the section.
    pub list_order: i32,
    /// Section the article is filed under.
    pub section: String,
    /// Article text key.
    pub text: String,
    /// Item the article describes, if any.
    pub item: Option<RuleRef<ItemRule>>,
}

impl ArticleRule {
    /// Blank record for `id`.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            list_order: 0,
            section: DEFAULT_SECTION.to_string(),
            text: String::new(),
            item: None,
        }
    }
}

impl Rule for ArticleRule {
    const CATEGORY: Category = Category::Articles;

    fn id(&self) -> &str {
        &self.id
    }

    fn list_order(&self) -> i32 {
        self.list_order
    }

    fn set_list_order(&mut self, order: i32) {
        self.list_order = order;
    }

    fn load(&mut self, node: &Node, _ctx: &LoadContext<'_>) -> Result<(), RuleFault> {
        let fields = Fields::new(Self::CATEGORY, &self.id, node);
        fields.string("section", &mut self.section)?;
        fields.string("text", &mut self.text)?;
        fields.link("item", &mut self.item)?;
        Ok(())
    }
}
