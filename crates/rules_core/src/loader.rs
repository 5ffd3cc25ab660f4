//! The load orchestrator.
//!
//! A session runs these phases strictly in order:
//!
//! 1. **Allocate** tenant offsets from the enabled manifest entries.
//! 2. **Pre-baseline**: apply resource configs of baseline-capable tenants.
//! 3. **Baseline**: materialize the shared region of every catalog.
//! 4. **Tenants**: load each tenant's files. A failing tenant is rolled
//!    back and quarantined, or aborts the session in strict mode.
//! 5. **Validate** cross-category links with the baseline context restored.
//! 6. **Sort** every category list.
//! 7. **Deferred** resource bundles stay unloaded until first access.

use std::fmt;
use std::path::Path;

use crate::catalog::CatalogSet;
use crate::config::{LoadOptions, ResourceConfig};
use crate::document::read_document;
use crate::error::{AllocationFault, FileFault, LoadError, ManifestError, Result, TenantLoadFault};
use crate::manifest::{ManifestSource, TenantEntry};
use crate::resolver::{AbsoluteIndex, Resolver};
use crate::resources::ResourceSource;
use crate::ruleset::Ruleset;
use crate::table::{ApplyStats, LoadContext};
use crate::tenant::{TenantSpec, TenantTable};

/// Stages of a load session, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Tenant offsets are assigned.
    Allocate,
    /// Resource configs adjust the catalogs.
    PreBaseline,
    /// Built-in resources are registered.
    Baseline,
    /// Tenant files are loaded.
    Tenants,
    /// Cross-category links are checked.
    Validate,
    /// Lists are ordered.
    Sort,
    /// Bundles wait for first access.
    Deferred,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Allocate => "allocate",
            Self::PreBaseline => "pre-baseline",
            Self::Baseline => "baseline",
            Self::Tenants => "tenants",
            Self::Validate => "validate",
            Self::Sort => "sort",
            Self::Deferred => "deferred",
        };
        f.write_str(name)
    }
}

/// What happened during a session.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Tenants whose files all loaded, in load order.
    pub loaded: Vec<String>,
    /// Tenants rolled back and disabled, with the cause.
    pub quarantined: Vec<TenantLoadFault>,
    /// Content files read.
    pub files: usize,
    /// Entry tally over every loaded tenant.
    pub stats: ApplyStats,
}

impl LoadReport {
    /// True if `name` was quarantined.
    #[must_use]
    pub fn is_quarantined(&self, name: &str) -> bool {
        self.quarantined
            .iter()
            .any(|fault| fault.manifest_name.as_deref() == Some(name))
    }
}

/// A finished load: tenants, catalogs, sorted rules and the report.
#[derive(Debug)]
pub struct Session {
    tenants: TenantTable,
    catalogs: CatalogSet,
    ruleset: Ruleset,
    report: LoadReport,
}

impl Session {
    /// Allocated tenants.
    #[must_use]
    pub const fn tenants(&self) -> &TenantTable {
        &self.tenants
    }

    /// Catalogs after resource configs were applied.
    #[must_use]
    pub const fn catalogs(&self) -> &CatalogSet {
        &self.catalogs
    }

    /// The sorted rule database.
    #[must_use]
    pub const fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    /// Session report.
    #[must_use]
    pub const fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Resolver bound to this session.
    #[must_use]
    pub const fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.tenants, &self.catalogs)
    }

    /// Content of a resource slot, materializing its catalog on first use.
    pub fn resource(&mut self, catalog: &str, index: AbsoluteIndex) -> Option<&ResourceSource> {
        self.ruleset.resources.slot(catalog, index)
    }

    /// Materialize every pending bundle. Returns how many were loaded.
    pub fn materialize_all(&mut self) -> usize {
        self.ruleset.resources.materialize_all()
    }

    /// Split into the rule database and the report.
    #[must_use]
    pub fn into_parts(self) -> (TenantTable, CatalogSet, Ruleset, LoadReport) {
        (self.tenants, self.catalogs, self.ruleset, self.report)
    }
}

/// Allocation requests for the given entries.
///
/// # Errors
///
/// Returns [`AllocationFault::NoBaseline`] when the list is empty or its
/// first entry is not baseline-capable.
pub fn tenant_specs(
    entries: &[&TenantEntry],
) -> std::result::Result<Vec<TenantSpec>, AllocationFault> {
    match entries.first() {
        Some(first) if first.master => Ok(entries.iter().map(|entry| entry.spec()).collect()),
        _ => Err(AllocationFault::NoBaseline),
    }
}

/// Allocate the enabled entries of a manifest without loading anything.
///
/// # Errors
///
/// See [`tenant_specs`] and [`TenantTable::allocate`].
pub fn allocate_manifest<M: ManifestSource + ?Sized>(
    manifest: &M,
) -> std::result::Result<TenantTable, AllocationFault> {
    TenantTable::allocate(&tenant_specs(&manifest.enabled())?)
}

/// Apply the resource configs of baseline-capable tenants to `catalogs`.
///
/// `entries` must be the entries `tenants` was allocated from, in order.
///
/// # Errors
///
/// Returns [`FileFault`] for a config that cannot be read or parsed, or
/// that declares a threshold outside the smallest tenant region.
pub fn apply_resource_configs(
    tenants: &TenantTable,
    entries: &[TenantEntry],
    base_dir: &Path,
    catalogs: &mut CatalogSet,
) -> std::result::Result<(), FileFault> {
    let region = tenants.min_size();
    for (tenant, entry) in tenants.iter().zip(entries) {
        if let (true, Some(path)) = (tenant.master, &entry.resource_config) {
            let path = base_dir.join(path);
            let config = ResourceConfig::load(&path)?;
            let changed = config
                .apply(catalogs, region)
                .map_err(|source| FileFault::Catalog {
                    path: path.clone(),
                    source,
                })?;
            tracing::debug!(
                tenant = %tenant.name,
                file = %path.display(),
                changed,
                "Applied resource config"
            );
        }
    }
    Ok(())
}

/// Drives one load session over a manifest.
pub struct LoadOrchestrator<'m, M: ManifestSource + ?Sized> {
    manifest: &'m mut M,
    options: LoadOptions,
}

impl<'m, M: ManifestSource + ?Sized> LoadOrchestrator<'m, M> {
    /// Prepare a session.
    pub fn new(manifest: &'m mut M, options: LoadOptions) -> Self {
        Self { manifest, options }
    }

    /// Run every phase.
    ///
    /// # Errors
    ///
    /// - [`LoadError::Allocation`] if offsets cannot be assigned; the
    ///   offending entry is disabled in the manifest first.
    /// - [`LoadError::Catalog`] if a catalog threshold does not fit the
    ///   smallest tenant region.
    /// - [`LoadError::File`] if a resource config cannot be read or is out
    ///   of bounds.
    /// - [`LoadError::TenantLoad`] for a failing tenant in strict mode.
    /// - [`LoadError::Integrity`] if links do not hold after loading.
    /// - [`LoadError::Manifest`] if a quarantine cannot be persisted.
    pub fn run(self) -> Result<Session> {
        let Self { manifest, options } = self;
        let strict = options.strict;
        let mut catalogs = options.catalogs;
        let entries: Vec<TenantEntry> = manifest.enabled().into_iter().cloned().collect();
        let base_dir = manifest.base_dir().to_path_buf();

        tracing::info!(
            phase = %Phase::Allocate,
            tenants = entries.len(),
            strict,
            "Starting load session"
        );
        let tenants = match allocate_manifest(&*manifest) {
            Ok(tenants) => tenants,
            Err(fault) => {
                if let Some(name) = fault.offending_tenant() {
                    tracing::warn!(tenant = %name, "Disabling tenant that failed allocation");
                    manifest.disable(name)?;
                }
                tracing::error!(error = %fault, "Load session aborted");
                return Err(fault.into());
            }
        };
        for tenant in tenants.iter() {
            tracing::debug!(
                tenant = %tenant.name,
                offset = tenant.offset,
                end = tenant.end(),
                "Allocated tenant region"
            );
        }

        tracing::info!(phase = %Phase::PreBaseline, "Applying resource configs");
        if let Err(fault) = catalogs.check(tenants.min_size()) {
            tracing::error!(error = %fault, "Load session aborted");
            return Err(fault.into());
        }
        apply_resource_configs(&tenants, &entries, &base_dir, &mut catalogs)?;

        let mut ruleset = Ruleset::new();
        tracing::info!(
            phase = %Phase::Baseline,
            tenant = %tenants.baseline().name,
            "Materializing baseline"
        );
        ruleset
            .resources
            .materialize_baseline(&catalogs, tenants.baseline());

        tracing::info!(phase = %Phase::Tenants, "Loading tenants");
        let resolver = Resolver::new(&tenants, &catalogs);
        let mut report = LoadReport::default();
        for (tenant, entry) in tenants.iter().zip(&entries) {
            let _span = tracing::info_span!("tenant", name = %tenant.name).entered();
            let snapshot = ruleset.clone();
            let ctx = LoadContext::new(resolver, tenant);

            match load_tenant(&mut ruleset, entry, &ctx, &base_dir) {
                Ok((files, stats)) => {
                    tracing::info!(
                        tenant = %tenant.display_name,
                        files,
                        created = stats.created,
                        patched = stats.patched,
                        deleted = stats.deleted,
                        "Loaded tenant"
                    );
                    report.files += files;
                    report.stats.merge(stats);
                    report.loaded.push(tenant.name.clone());
                }
                Err(source) => {
                    let fault = TenantLoadFault {
                        tenant: tenant.display_name.clone(),
                        manifest_name: Some(tenant.name.clone()),
                        source,
                    };
                    if strict {
                        tracing::error!(error = %fault, "Load session aborted");
                        return Err(fault.into());
                    }
                    tracing::warn!(error = %fault, "Quarantining tenant");
                    ruleset = snapshot;
                    quarantine(&mut *manifest, &fault)?;
                    report.quarantined.push(fault);
                }
            }
        }

        let baseline = tenants.baseline();
        tracing::info!(phase = %Phase::Validate, tenant = %baseline.name, "Validating links");
        let faults = ruleset.validate();
        if !faults.is_empty() {
            for fault in &faults {
                tracing::error!(%fault, "Integrity fault");
            }
            return Err(LoadError::Integrity(faults));
        }

        tracing::info!(phase = %Phase::Sort, "Sorting lists");
        ruleset.sort_lists();

        tracing::info!(
            phase = %Phase::Deferred,
            bundles = ruleset.resources.bundles().len(),
            loaded = report.loaded.len(),
            quarantined = report.quarantined.len(),
            "Load session complete"
        );

        Ok(Session {
            tenants,
            catalogs,
            ruleset,
            report,
        })
    }
}

/// Load one tenant's files in order.
fn load_tenant(
    ruleset: &mut Ruleset,
    entry: &TenantEntry,
    ctx: &LoadContext<'_>,
    base_dir: &Path,
) -> std::result::Result<(usize, ApplyStats), FileFault> {
    let mut stats = ApplyStats::default();
    for file in &entry.files {
        let path = base_dir.join(file);
        let document = read_document(&path)?;
        let applied = ruleset
            .load_document(&document, ctx, &path)
            .map_err(|source| FileFault::Rule {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(file = %path.display(), entries = applied.total(), "Loaded file");
        stats.merge(applied);
    }
    Ok((entry.files.len(), stats))
}

/// Durably disable the tenant behind `fault`, or every tenant when it
/// cannot be identified.
fn quarantine<M: ManifestSource + ?Sized>(
    manifest: &mut M,
    fault: &TenantLoadFault,
) -> std::result::Result<(), ManifestError> {
    let disabled = match &fault.manifest_name {
        Some(name) => manifest.disable(name)?,
        None => false,
    };
    if !disabled {
        tracing::warn!(tenant = %fault.tenant, "Tenant not found in manifest, disabling all");
        manifest.disable_all()?;
    }
    Ok(())
}

/// Run a session with `options`.
///
/// # Errors
///
/// See [`LoadOrchestrator::run`].
pub fn load<M: ManifestSource + ?Sized>(manifest: &mut M, options: LoadOptions) -> Result<Session> {
    LoadOrchestrator::new(manifest, options).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::error::CatalogFault;
    use crate::manifest::MemoryManifest;

    fn master(name: &str) -> TenantEntry {
        TenantEntry {
            master: true,
            ..TenantEntry::new(name)
        }
    }

    /// Manifest that cannot find a tenant by name.
    struct Unaddressable(MemoryManifest);

    impl ManifestSource for Unaddressable {
        fn entries(&self) -> &[TenantEntry] {
            self.0.entries()
        }

        fn base_dir(&self) -> &Path {
            self.0.base_dir()
        }

        fn disable(&mut self, _name: &str) -> std::result::Result<bool, ManifestError> {
            Ok(false)
        }

        fn disable_all(&mut self) -> std::result::Result<(), ManifestError> {
            self.0.disable_all()
        }
    }

    #[test]
    fn test_phase_order() {
        assert!(Phase::Allocate < Phase::PreBaseline);
        assert!(Phase::Tenants < Phase::Validate);
        assert!(Phase::Sort < Phase::Deferred);
        assert_eq!(Phase::PreBaseline.to_string(), "pre-baseline");
    }

    #[test]
    fn test_first_entry_must_be_baseline() {
        let mut manifest = MemoryManifest::new(vec![TenantEntry::new("mod"), master("xcom1")]);
        let err = load(&mut manifest, LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Allocation(AllocationFault::NoBaseline)));
    }

    #[test]
    fn test_duplicate_disables_later_entry_and_aborts() {
        let mut manifest = MemoryManifest::new(vec![
            master("xcom1"),
            TenantEntry::new("lasers"),
            TenantEntry::new("lasers"),
        ]);
        let err = load(&mut manifest, LoadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Allocation(AllocationFault::DuplicateTenant { ref name }) if name == "lasers"
        ));
        let flags: Vec<bool> = manifest.entries().iter().map(|e| e.enabled).collect();
        assert_eq!(flags, vec![true, true, false]);
    }

    #[test]
    fn test_missing_file_quarantines_tenant() {
        let mut broken = TenantEntry::new("broken");
        broken.files.push("does/not/exist.ron".into());
        let mut manifest = MemoryManifest::new(vec![master("xcom1"), broken]);

        let session = load(&mut manifest, LoadOptions::default().strict(false)).unwrap();
        assert!(session.report().is_quarantined("broken"));
        assert_eq!(session.report().loaded, vec!["xcom1".to_string()]);
        assert!(!manifest.entries()[1].enabled);
    }

    #[test]
    fn test_unidentified_tenant_disables_every_entry() {
        let mut broken = TenantEntry::new("broken");
        broken.files.push("does/not/exist.ron".into());
        let mut manifest = Unaddressable(MemoryManifest::new(vec![
            master("xcom1"),
            TenantEntry::new("other"),
            broken,
        ]));

        let session = load(&mut manifest, LoadOptions::default().strict(false)).unwrap();
        assert!(session.report().is_quarantined("broken"));
        assert_eq!(session.report().loaded, vec!["xcom1", "other"]);
        assert!(manifest.entries().iter().all(|entry| !entry.enabled));
    }

    #[test]
    fn test_out_of_bounds_catalog_aborts() {
        let mut manifest = MemoryManifest::new(vec![master("xcom1")]);
        let options = LoadOptions::default().catalog(Catalog::new("X.PCK", 1001));
        let err = load(&mut manifest, options).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Catalog(CatalogFault::SharedExceedsRegion { limit: 1000, .. })
        ));
    }

    #[test]
    fn test_missing_file_aborts_in_strict_mode() {
        let mut broken = TenantEntry::new("broken");
        broken.files.push("does/not/exist.ron".into());
        let mut manifest = MemoryManifest::new(vec![master("xcom1"), broken]);

        let err = load(&mut manifest, LoadOptions::default().strict(true)).unwrap_err();
        assert!(matches!(err, LoadError::TenantLoad(ref fault) if fault.tenant == "broken"));
        assert!(manifest.entries()[1].enabled);
    }
}
