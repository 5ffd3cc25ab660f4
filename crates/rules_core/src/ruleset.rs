//! The complete rule database of a session.
//!
//! A [`Ruleset`] owns one [`RuleTable`] per category, the encyclopedia
//! section weights and the resource bundles. It is `Clone` so the
//! orchestrator can snapshot it before each tenant and roll back a
//! quarantined tenant without a trace.

use std::path::Path;

use crate::document::Node;
use crate::error::{IntegrityFault, RuleFault};
use crate::ordering::{sort_by_link, sort_by_weight, sort_grouped, GroupOrder};
use crate::resources::ResourceStore;
use crate::rules::{
    ArmorRule, ArticleRule, Category, CraftWeaponRule, FacilityRule, ItemKind, ItemRule,
};
use crate::table::{ApplyStats, LoadContext, Presence, Rule, RuleRef, RuleTable};

/// Top-level key declaring encyclopedia section order.
pub const SECTIONS_KEY: &str = "ufopaedia_sections";
/// Top-level key for extra sprite bundles.
pub const EXTRA_SPRITES_KEY: &str = "extra_sprites";
/// Top-level key for extra sound bundles.
pub const EXTRA_SOUNDS_KEY: &str = "extra_sounds";

/// Every rule table plus section weights and resources.
#[derive(Debug, Clone)]
pub struct Ruleset {
    /// Inventory items.
    pub items: RuleTable<ItemRule>,
    /// Craft weapons.
    pub craft_weapons: RuleTable<CraftWeaponRule>,
    /// Armors.
    pub armors: RuleTable<ArmorRule>,
    /// Base facilities.
    pub facilities: RuleTable<FacilityRule>,
    /// Encyclopedia articles.
    pub articles: RuleTable<ArticleRule>,
    /// Encyclopedia section weights.
    pub sections: GroupOrder,
    /// Extra resource bundles.
    pub resources: ResourceStore,
}

impl Default for Ruleset {
    fn default() -> Self {
        Self::new()
    }
}

impl Ruleset {
    /// Empty ruleset with each table wired to its category factory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: RuleTable::new(ItemRule::new),
            craft_weapons: RuleTable::new(CraftWeaponRule::new),
            armors: RuleTable::new(ArmorRule::new),
            facilities: RuleTable::new(FacilityRule::new),
            articles: RuleTable::new(ArticleRule::new),
            sections: GroupOrder::new(),
            resources: ResourceStore::new(),
        }
    }

    /// Number of records in a category.
    #[must_use]
    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Items => self.items.len(),
            Category::CraftWeapons => self.craft_weapons.len(),
            Category::Armors => self.armors.len(),
            Category::Facilities => self.facilities.len(),
            Category::Articles => self.articles.len(),
        }
    }

    /// Ordered ids of a category.
    #[must_use]
    pub fn ids(&self, category: Category) -> &[String] {
        match category {
            Category::Items => self.items.ids(),
            Category::CraftWeapons => self.craft_weapons.ids(),
            Category::Armors => self.armors.ids(),
            Category::Facilities => self.facilities.ids(),
            Category::Articles => self.articles.ids(),
        }
    }

    /// Apply one decoded content file.
    ///
    /// Top-level keys are handled in document order. Unknown keys are
    /// logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuleFault`] raised by any section.
    pub fn load_document(
        &mut self,
        document: &Node,
        ctx: &LoadContext<'_>,
        source: &Path,
    ) -> Result<ApplyStats, RuleFault> {
        let sections = document.entries().ok_or_else(|| RuleFault::Section {
            section: "<document>".to_string(),
            detail: format!("must be a mapping, got {}", document.kind()),
        })?;
        let base_dir = source.parent().unwrap_or_else(|| Path::new(""));

        let mut stats = ApplyStats::default();
        for (key, node) in sections {
            match Category::from_key(key) {
                Some(category) => stats.merge(self.apply_list(category, node, ctx)?),
                None => match key.as_str() {
                    SECTIONS_KEY => self.declare_sections(node)?,
                    EXTRA_SPRITES_KEY | EXTRA_SOUNDS_KEY => {
                        let added = self.resources.load_section(key, node, ctx, base_dir)?;
                        tracing::debug!(
                            section = %key,
                            slots = added,
                            "Registered resource bundle"
                        );
                    }
                    _ => {
                        tracing::warn!(
                            key = %key,
                            file = %source.display(),
                            "Skipping unknown top-level key"
                        );
                    }
                },
            }
        }
        Ok(stats)
    }

    fn apply_list(
        &mut self,
        category: Category,
        list: &Node,
        ctx: &LoadContext<'_>,
    ) -> Result<ApplyStats, RuleFault> {
        match category {
            Category::Items => self.items.apply_list(list, ctx),
            Category::CraftWeapons => self.craft_weapons.apply_list(list, ctx),
            Category::Armors => self.armors.apply_list(list, ctx),
            Category::Facilities => self.facilities.apply_list(list, ctx),
            Category::Articles => self.articles.apply_list(list, ctx),
        }
    }

    fn declare_sections(&mut self, node: &Node) -> Result<(), RuleFault> {
        let shape = || RuleFault::Section {
            section: SECTIONS_KEY.to_string(),
            detail: "must be a sequence of strings".to_string(),
        };
        for name in node.as_seq().ok_or_else(shape)? {
            self.sections.declare(name.as_str().ok_or_else(shape)?);
        }
        Ok(())
    }

    /// Check every cross-category link.
    ///
    /// Returns all faults found; an empty vector means the ruleset holds
    /// together.
    #[must_use]
    pub fn validate(&self) -> Vec<IntegrityFault> {
        let mut faults = Vec::new();

        for weapon in self.craft_weapons.iter() {
            if let Some(launcher) = &weapon.launcher {
                match require(weapon, "launcher", launcher, &self.items) {
                    Ok(item) if item.kind != ItemKind::CraftWeapon => {
                        faults.push(IntegrityFault::KindMismatch {
                            from_category: CraftWeaponRule::CATEGORY.key(),
                            from_id: weapon.id.clone(),
                            field: "launcher",
                            to_category: ItemRule::CATEGORY.key(),
                            to_id: item.id.clone(),
                            detail: format!(
                                "item kind is {:?}, expected {:?}",
                                item.kind,
                                ItemKind::CraftWeapon
                            ),
                        });
                    }
                    Ok(_) => {}
                    Err(fault) => faults.push(fault),
                }
            }
            if let Some(clip) = &weapon.clip {
                if let Err(fault) = require(weapon, "clip", clip, &self.items) {
                    faults.push(fault);
                }
            }
        }

        for armor in self.armors.iter() {
            if let Some(item) = &armor.store_item {
                if let Err(fault) = require(armor, "store_item", item, &self.items) {
                    faults.push(fault);
                }
            }
        }

        for article in self.articles.iter() {
            if let Some(item) = &article.item {
                if let Err(fault) = require(article, "item", item, &self.items) {
                    faults.push(fault);
                }
            }
        }

        faults
    }

    /// Sort every category list.
    ///
    /// Sections not declared through `ufopaedia_sections` are declared here
    /// in order of first appearance.
    pub fn sort_lists(&mut self) {
        sort_by_weight(&mut self.items);
        sort_by_weight(&mut self.facilities);
        sort_by_link(&mut self.craft_weapons, &self.items, |w| w.launcher.as_ref());
        sort_by_link(&mut self.armors, &self.items, |a| a.store_item.as_ref());

        for article in self.articles.iter() {
            self.sections.declare(&article.section);
        }
        sort_grouped(&mut self.articles, &self.sections, |a| a.section.as_str());
    }
}

/// Look up a link target that must exist.
fn require<'t, F: Rule, T: Rule>(
    from: &F,
    field: &'static str,
    link: &RuleRef<T>,
    table: &'t RuleTable<T>,
) -> Result<&'t T, IntegrityFault> {
    match link.resolve(table, Presence::Required) {
        Ok(Some(target)) => Ok(target),
        _ => Err(IntegrityFault::MissingLink {
            from_category: F::CATEGORY.key(),
            from_id: from.id().to_string(),
            field,
            to_category: link.category().key(),
            to_id: link.id().to_string(),
        }),
    }
}
