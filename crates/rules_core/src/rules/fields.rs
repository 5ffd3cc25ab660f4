//! Field readers with patch semantics.
//!
//! Each reader overwrites its target only when the key is present in the
//! entry, so a later tenant can change one field of a record and leave the
//! rest alone.

use crate::document::Node;
use crate::error::RuleFault;
use crate::resolver::{AbsoluteIndex, Scale};
use crate::rules::Category;
use crate::table::{LoadContext, Rule, RuleRef, LIST_ORDER_KEY};

/// Marker for "no linked record" in link fields.
pub const NONE_ID: &str = "STR_NONE";

/// Reader over one rule entry.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    category: Category,
    id: &'a str,
    node: &'a Node,
}

impl<'a> Fields<'a> {
    /// Wrap the entry `node` of record `id`.
    #[must_use]
    pub const fn new(category: Category, id: &'a str, node: &'a Node) -> Self {
        Self { category, id, node }
    }

    fn fault(&self, field: &str, detail: String) -> RuleFault {
        RuleFault::Field {
            category: self.category.key(),
            id: self.id.to_string(),
            field: field.to_string(),
            detail,
        }
    }

    fn present(&self, key: &str) -> Option<&'a Node> {
        debug_assert_ne!(key, LIST_ORDER_KEY, "list order is applied by the table");
        self.node.get(key)
    }

    /// Overwrite an integer field.
    pub fn int(&self, key: &str, target: &mut i32) -> Result<(), RuleFault> {
        if let Some(node) = self.present(key) {
            *target = node
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| {
                    self.fault(key, format!("must be a 32-bit integer, got {}", node.kind()))
                })?;
        }
        Ok(())
    }

    /// Overwrite a boolean field.
    pub fn boolean(&self, key: &str, target: &mut bool) -> Result<(), RuleFault> {
        if let Some(node) = self.present(key) {
            *target = node
                .as_bool()
                .ok_or_else(|| self.fault(key, format!("must be a bool, got {}", node.kind())))?;
        }
        Ok(())
    }

    /// Overwrite a string field.
    pub fn string(&self, key: &str, target: &mut String) -> Result<(), RuleFault> {
        if let Some(node) = self.present(key) {
            let value = node
                .as_str()
                .ok_or_else(|| self.fault(key, format!("must be a string, got {}", node.kind())))?;
            value.clone_into(target);
        }
        Ok(())
    }

    /// Overwrite a field parsed from a string.
    pub fn parsed<T>(
        &self,
        key: &str,
        target: &mut T,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Result<(), RuleFault> {
        if let Some(node) = self.present(key) {
            let text = node
                .as_str()
                .ok_or_else(|| self.fault(key, format!("must be a string, got {}", node.kind())))?;
            *target = parse(text)
                .ok_or_else(|| self.fault(key, format!("has unknown value '{text}'")))?;
        }
        Ok(())
    }

    /// Overwrite a link to another category. [`NONE_ID`] clears the link.
    pub fn link<R: Rule>(
        &self,
        key: &str,
        target: &mut Option<RuleRef<R>>,
    ) -> Result<(), RuleFault> {
        if let Some(node) = self.present(key) {
            let id = node
                .as_str()
                .ok_or_else(|| {
                    let kind = node.kind();
                    self.fault(key, format!("must be a {} id, got {kind}", R::CATEGORY))
                })?;
            *target = (id != NONE_ID).then(|| RuleRef::new(id));
        }
        Ok(())
    }

    /// Overwrite a catalog reference.
    pub fn reference(
        &self,
        key: &str,
        ctx: &LoadContext<'_>,
        catalog: &str,
        scale: Scale,
        target: &mut Option<AbsoluteIndex>,
    ) -> Result<(), RuleFault> {
        if let Some(node) = self.present(key) {
            *target = ctx
                .resolve(key, node, catalog, scale)
                .map_err(|source| self.reference_fault(source))?;
        }
        Ok(())
    }

    /// Overwrite a list of catalog references.
    pub fn reference_list(
        &self,
        key: &str,
        ctx: &LoadContext<'_>,
        catalog: &str,
        target: &mut Vec<AbsoluteIndex>,
    ) -> Result<(), RuleFault> {
        if let Some(node) = self.present(key) {
            *target = ctx
                .resolve_list(key, node, catalog, Scale::ONE)
                .map_err(|source| self.reference_fault(source))?;
        }
        Ok(())
    }

    fn reference_fault(&self, source: crate::error::ReferenceFault) -> RuleFault {
        RuleFault::Reference {
            category: self.category.key(),
            id: self.id.to_string(),
            source,
        }
    }
}
