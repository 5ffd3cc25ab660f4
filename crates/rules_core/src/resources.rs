//! Resource bundles and deferred materialization.
//!
//! Tenants may add files to catalogs through `extra_sprites` and
//! `extra_sounds` sections. Slot keys are catalog references and go through
//! the resolver at load time, so a tenant's `60` lands in its own region.
//! The files themselves are only registered when a slot of the catalog is
//! first requested; each bundle carries a `loaded` flag so materializing
//! twice is a no-op.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogSet;
use crate::document::Node;
use crate::error::{ReferenceFault, RuleFault};
use crate::resolver::{AbsoluteIndex, RawRef};
use crate::table::LoadContext;
use crate::tenant::Tenant;

/// Where a slot's content comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceSource {
    /// Built into the baseline tenant.
    Builtin,
    /// A file contributed by a tenant.
    File {
        /// Contributing tenant.
        tenant: String,
        /// File path, resolved against the declaring document.
        path: PathBuf,
    },
}

/// Files one tenant adds to one catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBundle {
    /// Contributing tenant.
    pub tenant: String,
    /// Target catalog.
    pub catalog: String,
    /// Absolute slot to file.
    pub files: BTreeMap<AbsoluteIndex, PathBuf>,
    loaded: bool,
}

impl ResourceBundle {
    /// Whether the bundle has been materialized.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Register the bundle's files into `slots`.
    ///
    /// Returns false when the bundle was already loaded.
    pub fn materialize(&mut self, slots: &mut BTreeMap<AbsoluteIndex, ResourceSource>) -> bool {
        if self.loaded {
            return false;
        }
        for (index, path) in &self.files {
            slots.insert(
                *index,
                ResourceSource::File {
                    tenant: self.tenant.clone(),
                    path: path.clone(),
                },
            );
        }
        self.loaded = true;
        tracing::debug!(
            tenant = %self.tenant,
            catalog = %self.catalog,
            files = self.files.len(),
            "Materialized resource bundle"
        );
        true
    }
}

static BUILTIN: ResourceSource = ResourceSource::Builtin;

/// All bundles of a session plus the slots materialized so far.
///
/// The baseline is kept as one shared threshold per catalog; only slots
/// contributed by bundles are stored individually.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceStore {
    bundles: Vec<ResourceBundle>,
    slots: BTreeMap<String, BTreeMap<AbsoluteIndex, ResourceSource>>,
    shared: BTreeMap<String, i64>,
    baseline_loaded: bool,
}

impl ResourceStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the shared region of every catalog as built into the baseline.
    ///
    /// Returns false if the baseline was already materialized.
    pub fn materialize_baseline(&mut self, catalogs: &CatalogSet, baseline: &Tenant) -> bool {
        if self.baseline_loaded {
            return false;
        }
        for catalog in catalogs.iter() {
            self.shared.insert(catalog.name.clone(), catalog.shared_max);
        }
        self.baseline_loaded = true;
        tracing::info!(
            tenant = %baseline.name,
            catalogs = catalogs.len(),
            "Materialized baseline resources"
        );
        true
    }

    /// Whether the baseline has been materialized.
    #[must_use]
    pub const fn baseline_loaded(&self) -> bool {
        self.baseline_loaded
    }

    /// Read an `extra_sprites` / `extra_sounds` section.
    ///
    /// Each entry is `{ "catalog": name, "files": { slot: path, .. } }`.
    /// Paths are taken relative to `base_dir`.
    ///
    /// # Errors
    ///
    /// Fails on malformed entries and on slot references that do not fit
    /// into the active tenant's region.
    pub fn load_section(
        &mut self,
        section: &str,
        node: &Node,
        ctx: &LoadContext<'_>,
        base_dir: &Path,
    ) -> Result<usize, RuleFault> {
        let shape = |detail: String| RuleFault::Section {
            section: section.to_string(),
            detail,
        };

        let entries = node
            .as_seq()
            .ok_or_else(|| shape(format!("must be a sequence, got {}", node.kind())))?;

        let mut added = 0;
        for entry in entries {
            let catalog = entry
                .get("catalog")
                .and_then(Node::as_str)
                .ok_or_else(|| shape("entry needs a string 'catalog'".to_string()))?;
            let files = entry
                .get("files")
                .and_then(Node::entries)
                .ok_or_else(|| shape("entry needs a 'files' mapping".to_string()))?;

            let mut bundle = ResourceBundle {
                tenant: ctx.active.name.clone(),
                catalog: catalog.to_string(),
                files: BTreeMap::new(),
                loaded: false,
            };
            for (slot, path) in files {
                let value: i64 = slot.parse().map_err(|_| {
                    reference_fault(section, ReferenceFault::Shape {
                        field: format!("{catalog}[{slot}]"),
                        detail: "slot key must be an integer".to_string(),
                    })
                })?;
                let path = path
                    .as_str()
                    .ok_or_else(|| shape(format!("path for slot {slot} must be a string")))?;
                let field = format!("{catalog}[{slot}]");
                let index = ctx
                    .resolver
                    .resolve(&field, &RawRef::Bare(value), ctx.active, catalog, Default::default())
                    .map_err(|source| reference_fault(section, source))?;
                if let Some(index) = index {
                    bundle.files.insert(index, base_dir.join(path));
                }
            }
            added += bundle.files.len();
            self.bundles.push(bundle);
        }
        Ok(added)
    }

    /// Content source for a slot, materializing the catalog's bundles on
    /// first access.
    ///
    /// Bundles are applied in declaration order, so a later tenant's file
    /// replaces an earlier one for the same slot. A shared slot no bundle
    /// touched is [`ResourceSource::Builtin`] once the baseline is
    /// materialized.
    pub fn slot(&mut self, catalog: &str, index: AbsoluteIndex) -> Option<&ResourceSource> {
        let shared = self.shared.get(catalog).copied().unwrap_or(0);
        let slots = self.slots.entry(catalog.to_string()).or_default();
        for bundle in self.bundles.iter_mut().filter(|b| b.catalog == catalog) {
            bundle.materialize(slots);
        }
        slots
            .get(&index)
            .or_else(|| (0..shared).contains(&index).then_some(&BUILTIN))
    }

    /// Materialize every bundle. Returns how many were newly loaded.
    pub fn materialize_all(&mut self) -> usize {
        let mut count = 0;
        for bundle in &mut self.bundles {
            let slots = self.slots.entry(bundle.catalog.clone()).or_default();
            if bundle.materialize(slots) {
                count += 1;
            }
        }
        count
    }

    /// All declared bundles.
    #[must_use]
    pub fn bundles(&self) -> &[ResourceBundle] {
        &self.bundles
    }
}

fn reference_fault(section: &str, source: ReferenceFault) -> RuleFault {
    RuleFault::Reference {
        category: "resources",
        id: section.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, BIG_OBJECTS};
    use crate::document::parse_ron;
    use crate::resolver::Resolver;
    use crate::tenant::{TenantSpec, TenantTable};

    fn setup() -> (TenantTable, CatalogSet) {
        let tenants =
            TenantTable::allocate(&[TenantSpec::new("xcom1", 1), TenantSpec::new("mod", 1)])
                .unwrap();
        let mut catalogs = CatalogSet::empty();
        catalogs.insert(Catalog::new(BIG_OBJECTS, 57));
        (tenants, catalogs)
    }

    #[test]
    fn test_bundle_slots_resolve_into_tenant_region() {
        let (tenants, catalogs) = setup();
        let ctx = LoadContext::new(
            Resolver::new(&tenants, &catalogs),
            tenants.by_name("mod").unwrap(),
        );
        let node = parse_ron(
            r#"[ { "catalog": "BIGOBS.PCK", "files": { 3: "fix.png", 60: "laser.png" } } ]"#,
        )
        .unwrap();

        let mut store = ResourceStore::new();
        let added = store
            .load_section("extra_sprites", &node, &ctx, Path::new("mods/mod"))
            .unwrap();
        assert_eq!(added, 2);
        assert!(!store.bundles()[0].is_loaded());

        store.materialize_baseline(&catalogs, tenants.baseline());
        let source = store.slot(BIG_OBJECTS, 1060).cloned();
        assert_eq!(
            source,
            Some(ResourceSource::File {
                tenant: "mod".to_string(),
                path: PathBuf::from("mods/mod/laser.png"),
            })
        );
        // A shared slot is patched in place.
        assert!(matches!(
            store.slot(BIG_OBJECTS, 3),
            Some(ResourceSource::File { .. })
        ));
        assert_eq!(store.slot(BIG_OBJECTS, 4), Some(&ResourceSource::Builtin));
        assert!(store.bundles()[0].is_loaded());
    }

    #[test]
    fn test_materialize_is_idempotent() {
        let (tenants, catalogs) = setup();
        let ctx = LoadContext::new(Resolver::new(&tenants, &catalogs), tenants.baseline());
        let node =
            parse_ron(r#"[ { "catalog": "BIGOBS.PCK", "files": { 70: "a.png" } } ]"#).unwrap();
        let mut store = ResourceStore::new();
        store
            .load_section("extra_sprites", &node, &ctx, Path::new(""))
            .unwrap();

        assert_eq!(store.materialize_all(), 1);
        assert_eq!(store.materialize_all(), 0);
        assert!(store.materialize_baseline(&catalogs, tenants.baseline()));
        assert!(!store.materialize_baseline(&catalogs, tenants.baseline()));
    }

    #[test]
    fn test_baseline_is_a_threshold() {
        let tenants = TenantTable::allocate(&[TenantSpec::new("xcom1", 10_000)]).unwrap();
        let mut catalogs = CatalogSet::empty();
        catalogs.insert(Catalog::new(BIG_OBJECTS, 5_000_000));

        let mut store = ResourceStore::new();
        assert_eq!(store.slot(BIG_OBJECTS, 0), None);
        assert!(store.materialize_baseline(&catalogs, tenants.baseline()));
        assert_eq!(store.slot(BIG_OBJECTS, 0), Some(&ResourceSource::Builtin));
        assert_eq!(
            store.slot(BIG_OBJECTS, 4_999_999),
            Some(&ResourceSource::Builtin)
        );
        assert_eq!(store.slot(BIG_OBJECTS, 5_000_000), None);
        assert_eq!(store.slot(BIG_OBJECTS, -1), None);
        assert_eq!(store.slot("NOPE.PCK", 0), None);
    }

    #[test]
    fn test_slot_outside_region_fails() {
        let (tenants, catalogs) = setup();
        let ctx = LoadContext::new(Resolver::new(&tenants, &catalogs), tenants.baseline());
        let node =
            parse_ron(r#"[ { "catalog": "BIGOBS.PCK", "files": { 1001: "a.png" } } ]"#).unwrap();
        let err = ResourceStore::new()
            .load_section("extra_sprites", &node, &ctx, Path::new(""))
            .unwrap_err();
        assert!(matches!(
            err,
            RuleFault::Reference {
                source: ReferenceFault::ExceedsCapacity { .. },
                ..
            }
        ));
    }
}
