//! Generic create/update/delete protocol for rule records.
//!
//! Every category keeps its records in a [`RuleTable`]: a map from id to
//! record plus an ordered id index. Loading the same id again, from the same
//! file or from a later tenant, hands back the same record so the field
//! loader can patch it in place. Deleting an id drops the record for good; a
//! later create starts from a blank record built by the category factory.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use crate::document::Node;
use crate::error::{LookupFault, ReferenceFault, RuleFault};
use crate::resolver::{AbsoluteIndex, Resolver, Scale};
use crate::rules::Category;
use crate::tenant::Tenant;

/// Distance between auto-assigned ordering weights.
pub const LIST_ORDER_STEP: i32 = 100;

/// Key holding an authored ordering weight.
pub const LIST_ORDER_KEY: &str = "list_order";

/// Everything a field loader may consult while loading one file.
///
/// The active tenant is carried here explicitly; nothing in the loader keeps
/// a global "current tenant".
#[derive(Debug, Clone, Copy)]
pub struct LoadContext<'a> {
    /// Resolver bound to the session's tenants and catalogs.
    pub resolver: Resolver<'a>,
    /// Tenant whose files are being loaded.
    pub active: &'a Tenant,
}

impl<'a> LoadContext<'a> {
    /// Bundle a resolver with the active tenant.
    #[must_use]
    pub const fn new(resolver: Resolver<'a>, active: &'a Tenant) -> Self {
        Self { resolver, active }
    }

    /// Resolve a reference node in the active tenant.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve_node`].
    pub fn resolve(
        &self,
        field: &str,
        node: &Node,
        catalog: &str,
        scale: Scale,
    ) -> Result<Option<AbsoluteIndex>, ReferenceFault> {
        self.resolver
            .resolve_node(field, node, self.active, catalog, scale)
    }

    /// Resolve a reference list in the active tenant.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve_list`].
    pub fn resolve_list(
        &self,
        field: &str,
        node: &Node,
        catalog: &str,
        scale: Scale,
    ) -> Result<Vec<AbsoluteIndex>, ReferenceFault> {
        self.resolver
            .resolve_list(field, node, self.active, catalog, scale)
    }
}

/// A record type stored in a [`RuleTable`].
pub trait Rule: Clone {
    /// Category this record type belongs to.
    const CATEGORY: Category;

    /// Symbolic id.
    fn id(&self) -> &str;

    /// Ordering weight.
    fn list_order(&self) -> i32;

    /// Replace the ordering weight.
    fn set_list_order(&mut self, order: i32);

    /// Overwrite the fields present in `node`; absent fields keep their value.
    ///
    /// # Errors
    ///
    /// Returns a [`RuleFault`] for malformed fields or failed references.
    fn load(&mut self, node: &Node, ctx: &LoadContext<'_>) -> Result<(), RuleFault>;
}

/// Whether a lookup accepts a missing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Absence is returned as `Ok(None)`.
    Optional,
    /// Absence is a [`LookupFault`].
    Required,
}

/// The action an entry asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    /// Get or create, then load fields.
    Type(&'a str),
    /// Create; the id must not exist yet.
    New(&'a str),
    /// Load fields into an existing record; the id must exist.
    Override(&'a str),
    /// Load fields into an existing record if there is one.
    Update(&'a str),
    /// Remove the record.
    Delete(&'a str),
    /// Skip the entry.
    Ignore,
}

impl<'a> Directive<'a> {
    /// Keys that carry the id of the record they act on.
    pub const KEYS: [&'static str; 5] = ["type", "new", "override", "update", "delete"];

    /// Boolean key that switches an entry off.
    pub const IGNORE_KEY: &'static str = "ignore";

    /// Read the directive of an entry.
    ///
    /// `ignore: true` skips the entry whatever else it carries; `ignore:
    /// false` has no effect. Returns `Ok(None)` when the entry has no id key.
    ///
    /// # Errors
    ///
    /// - [`RuleFault::Field`] for a non-string id or a non-bool `ignore`.
    /// - [`RuleFault::ConflictingDirectives`] when more than one id key is
    ///   present.
    pub fn of(entry: &'a Node, category: Category) -> Result<Option<Self>, RuleFault> {
        let field_fault = |field: &str, detail: String| RuleFault::Field {
            category: category.key(),
            id: String::new(),
            field: field.to_string(),
            detail,
        };

        if let Some(flag) = entry.get(Self::IGNORE_KEY) {
            let skip = flag.as_bool().ok_or_else(|| {
                field_fault(Self::IGNORE_KEY, format!("must be a bool, got {}", flag.kind()))
            })?;
            if skip {
                return Ok(Some(Self::Ignore));
            }
        }

        let mut found: Option<(&'static str, &'a str)> = None;
        for key in Self::KEYS {
            let Some(value) = entry.get(key) else {
                continue;
            };
            let id = value.as_str().ok_or_else(|| {
                field_fault(key, format!("must be a string id, got {}", value.kind()))
            })?;
            if let Some((first, first_id)) = found {
                return Err(RuleFault::ConflictingDirectives {
                    category: category.key(),
                    id: first_id.to_string(),
                    first,
                    second: key,
                });
            }
            found = Some((key, id));
        }

        Ok(found.map(|(key, id)| match key {
            "delete" => Self::Delete(id),
            "new" => Self::New(id),
            "override" => Self::Override(id),
            "update" => Self::Update(id),
            _ => Self::Type(id),
        }))
    }
}

/// Outcome of applying one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// A blank record was created and loaded.
    Created,
    /// An existing record was patched.
    Patched,
    /// A record was removed.
    Deleted,
    /// The entry changed nothing.
    Skipped,
}

/// Per-document tally of applied entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    /// Records created.
    pub created: usize,
    /// Records patched.
    pub patched: usize,
    /// Records deleted.
    pub deleted: usize,
    /// Entries that changed nothing.
    pub skipped: usize,
}

impl ApplyStats {
    /// Count one outcome.
    pub fn record(&mut self, applied: Applied) {
        match applied {
            Applied::Created => self.created += 1,
            Applied::Patched => self.patched += 1,
            Applied::Deleted => self.deleted += 1,
            Applied::Skipped => self.skipped += 1,
        }
    }

    /// Add another tally to this one.
    pub fn merge(&mut self, other: Self) {
        self.created += other.created;
        self.patched += other.patched;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
    }

    /// Total entries seen.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.created + self.patched + self.deleted + self.skipped
    }
}

/// Records of one category with their ordered id index.
#[derive(Clone)]
pub struct RuleTable<R> {
    factory: fn(&str) -> R,
    records: HashMap<String, R>,
    index: Vec<String>,
    next_order: i32,
}

impl<R: Rule + fmt::Debug> fmt::Debug for RuleTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleTable")
            .field("category", &R::CATEGORY)
            .field("index", &self.index)
            .field("next_order", &self.next_order)
            .finish_non_exhaustive()
    }
}

impl<R: Rule> RuleTable<R> {
    /// Create an empty table whose blank records come from `factory`.
    #[must_use]
    pub fn new(factory: fn(&str) -> R) -> Self {
        Self {
            factory,
            records: HashMap::new(),
            index: Vec::new(),
            next_order: 0,
        }
    }

    /// Existing record for `id`, or a fresh blank one appended to the index.
    ///
    /// A new record receives the next auto-assigned ordering weight.
    pub fn get_or_create(&mut self, id: &str) -> &mut R {
        self.entry(id).0
    }

    fn entry(&mut self, id: &str) -> (&mut R, bool) {
        match self.records.entry(id.to_string()) {
            Entry::Occupied(slot) => (slot.into_mut(), false),
            Entry::Vacant(slot) => {
                let mut record = (self.factory)(id);
                self.next_order += LIST_ORDER_STEP;
                record.set_list_order(self.next_order);
                self.index.push(id.to_string());
                (slot.insert(record), true)
            }
        }
    }

    /// Remove `id` and its index entry. Missing ids are ignored.
    pub fn delete(&mut self, id: &str) -> Option<R> {
        let removed = self.records.remove(id);
        if removed.is_some() {
            self.index.retain(|entry| entry != id);
        }
        removed
    }

    /// Look up a record, stating whether absence is acceptable.
    ///
    /// # Errors
    ///
    /// With [`Presence::Required`], a missing id is a [`LookupFault`].
    pub fn lookup(&self, id: &str, presence: Presence) -> Result<Option<&R>, LookupFault> {
        match (self.records.get(id), presence) {
            (Some(record), _) => Ok(Some(record)),
            (None, Presence::Optional) => Ok(None),
            (None, Presence::Required) => Err(LookupFault {
                category: R::CATEGORY.key(),
                id: id.to_string(),
            }),
        }
    }

    /// Mutable variant of [`RuleTable::lookup`].
    ///
    /// # Errors
    ///
    /// With [`Presence::Required`], a missing id is a [`LookupFault`].
    pub fn lookup_mut(
        &mut self,
        id: &str,
        presence: Presence,
    ) -> Result<Option<&mut R>, LookupFault> {
        match (self.records.get_mut(id), presence) {
            (Some(record), _) => Ok(Some(record)),
            (None, Presence::Optional) => Ok(None),
            (None, Presence::Required) => Err(LookupFault {
                category: R::CATEGORY.key(),
                id: id.to_string(),
            }),
        }
    }

    /// True if `id` is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Ids in index order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.index
    }

    /// Records in index order.
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.index.iter().filter_map(|id| self.records.get(id))
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the table holds no record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Apply one list entry.
    ///
    /// # Errors
    ///
    /// Fails on a missing or ambiguous directive, a `new` for an existing
    /// id, an `override` for a missing id, or any field loader fault.
    pub fn apply(
        &mut self,
        entry: &Node,
        position: usize,
        ctx: &LoadContext<'_>,
    ) -> Result<Applied, RuleFault> {
        let category = R::CATEGORY.key();
        let directive =
            Directive::of(entry, R::CATEGORY)?.ok_or(RuleFault::MissingDirective {
                category,
                position,
            })?;

        let applied = match directive {
            Directive::Ignore => Applied::Skipped,
            Directive::Delete(id) => match self.delete(id) {
                Some(_) => Applied::Deleted,
                None => Applied::Skipped,
            },
            Directive::Type(id) => {
                let (record, created) = self.entry(id);
                load_into(record, entry, ctx)?;
                if created {
                    Applied::Created
                } else {
                    Applied::Patched
                }
            }
            Directive::New(id) => {
                if self.contains(id) {
                    return Err(RuleFault::AlreadyExists {
                        category,
                        id: id.to_string(),
                    });
                }
                let (record, _) = self.entry(id);
                load_into(record, entry, ctx)?;
                Applied::Created
            }
            Directive::Override(id) => {
                let Ok(Some(record)) = self.lookup_mut(id, Presence::Required) else {
                    return Err(RuleFault::NotFound {
                        category,
                        id: id.to_string(),
                    });
                };
                load_into(record, entry, ctx)?;
                Applied::Patched
            }
            Directive::Update(id) => match self.lookup_mut(id, Presence::Optional) {
                Ok(Some(record)) => {
                    load_into(record, entry, ctx)?;
                    Applied::Patched
                }
                _ => Applied::Skipped,
            },
        };

        tracing::trace!(category, ?directive, ?applied, "Applied rule entry");
        Ok(applied)
    }

    /// Apply every entry of a category list.
    ///
    /// # Errors
    ///
    /// Stops at the first failing entry; see [`RuleTable::apply`].
    pub fn apply_list(
        &mut self,
        list: &Node,
        ctx: &LoadContext<'_>,
    ) -> Result<ApplyStats, RuleFault> {
        let entries = list.as_seq().ok_or_else(|| RuleFault::Section {
            section: R::CATEGORY.key().to_string(),
            detail: format!("must be a sequence, got {}", list.kind()),
        })?;

        let mut stats = ApplyStats::default();
        for (position, entry) in entries.iter().enumerate() {
            stats.record(self.apply(entry, position, ctx)?);
        }
        Ok(stats)
    }

    /// Reorder the id index by `key`, keeping the current order on ties.
    pub fn reorder_by<K: Ord>(&mut self, mut key: impl FnMut(&R) -> K) {
        let records = &self.records;
        let mut keyed: Vec<(K, String)> = self
            .index
            .drain(..)
            .filter_map(|id| records.get(&id).map(|record| (key(record), id)))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        self.index = keyed.into_iter().map(|(_, id)| id).collect();
        debug_assert_eq!(self.index.len(), self.records.len());
    }
}

/// Run the category loader, then apply an authored weight if present.
fn load_into<R: Rule>(
    record: &mut R,
    entry: &Node,
    ctx: &LoadContext<'_>,
) -> Result<(), RuleFault> {
    record.load(entry, ctx)?;
    if let Some(node) = entry.get(LIST_ORDER_KEY) {
        let order = node
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| RuleFault::Field {
                category: R::CATEGORY.key(),
                id: record.id().to_string(),
                field: LIST_ORDER_KEY.to_string(),
                detail: format!("must be a 32-bit integer, got {}", node.kind()),
            })?;
        record.set_list_order(order);
    }
    Ok(())
}

/// Typed weak reference to a record of another category.
///
/// Only the id is stored; the target is looked up through its table when
/// needed and may legitimately be missing until validation.
pub struct RuleRef<R> {
    id: String,
    marker: PhantomData<fn() -> R>,
}

impl<R: Rule> RuleRef<R> {
    /// Reference the record `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            marker: PhantomData,
        }
    }

    /// Target id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Target category.
    #[must_use]
    pub const fn category(&self) -> Category {
        R::CATEGORY
    }

    /// Look the target up in its table.
    ///
    /// # Errors
    ///
    /// With [`Presence::Required`], a missing target is a [`LookupFault`].
    pub fn resolve<'t>(
        &self,
        table: &'t RuleTable<R>,
        presence: Presence,
    ) -> Result<Option<&'t R>, LookupFault> {
        table.lookup(&self.id, presence)
    }
}

impl<R> Clone for RuleRef<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            marker: PhantomData,
        }
    }
}

impl<R> PartialEq for RuleRef<R> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<R> Eq for RuleRef<R> {}

impl<R: Rule> fmt::Debug for RuleRef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", R::CATEGORY.key(), self.id)
    }
}
