//! Post-load list ordering.
//!
//! Sorting happens once, after every tenant has loaded, because derived
//! weights look through links that may only exist at the very end. All
//! sorts are stable: equal weights keep declaration order.

use std::collections::HashMap;

use crate::table::{Presence, Rule, RuleRef, RuleTable};

/// Weights for a secondary classification (e.g. encyclopedia sections).
///
/// Names get the next weight the first time they are declared; declaring a
/// name again keeps its original weight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupOrder {
    weights: HashMap<String, i32>,
    names: Vec<String>,
}

impl GroupOrder {
    /// Empty order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` if unseen and return its weight.
    pub fn declare(&mut self, name: &str) -> i32 {
        if let Some(weight) = self.weights.get(name) {
            return *weight;
        }
        let weight = i32::try_from(self.names.len()).unwrap_or(i32::MAX);
        self.weights.insert(name.to_string(), weight);
        self.names.push(name.to_string());
        weight
    }

    /// Weight of `name`, if declared.
    #[must_use]
    pub fn weight(&self, name: &str) -> Option<i32> {
        self.weights.get(name).copied()
    }

    /// Declared names in weight order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Sort by each record's own weight.
pub fn sort_by_weight<R: Rule>(table: &mut RuleTable<R>) {
    table.reorder_by(|record| record.list_order());
}

/// Sort by the weight of a linked record in another table.
///
/// Records whose link is unset or dangling sort after every record with a
/// resolvable link, ordered among themselves by their own weight.
pub fn sort_by_link<R, L, F>(table: &mut RuleTable<R>, linked: &RuleTable<L>, link: F)
where
    R: Rule,
    L: Rule,
    F: Fn(&R) -> Option<&RuleRef<L>>,
{
    table.reorder_by(|record| {
        let target = link(record).map(|r| r.resolve(linked, Presence::Optional));
        match target {
            Some(Ok(Some(target))) => (false, target.list_order()),
            _ => (true, record.list_order()),
        }
    });
}

/// Sort by group weight first, then by each record's own weight.
///
/// Records in undeclared groups sort last.
pub fn sort_grouped<R, F>(table: &mut RuleTable<R>, groups: &GroupOrder, group: F)
where
    R: Rule,
    F: Fn(&R) -> &str,
{
    table.reorder_by(|record| {
        (
            groups.weight(group(record)).unwrap_or(i32::MAX),
            record.list_order(),
        )
    });
}
