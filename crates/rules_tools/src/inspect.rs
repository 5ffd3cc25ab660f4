//! Offset listing and one-off reference resolution.

use rules_core::config::LoadOptions;
use rules_core::loader::{allocate_manifest, apply_resource_configs};
use rules_core::manifest::{ManifestSource, TenantEntry};
use rules_core::resolver::{AbsoluteIndex, RawRef, Resolver, Scale};

use crate::error::{Result, ToolError};
use crate::report::TenantRow;

/// Allocate the enabled tenants of a manifest.
///
/// # Errors
///
/// Returns [`ToolError::Allocation`] if the manifest cannot be allocated.
pub fn offsets<M: ManifestSource + ?Sized>(manifest: &M) -> Result<Vec<TenantRow>> {
    let tenants = allocate_manifest(manifest)?;
    Ok(tenants.iter().map(TenantRow::from).collect())
}

/// A single reference to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Tenant the value is authored in (name, `master` or `current`).
    pub tenant: String,
    /// Catalog name.
    pub catalog: String,
    /// Authored value.
    pub value: i64,
    /// Slots per authored unit.
    pub multiplier: i64,
    /// Capacity divisor.
    pub size_scale: i64,
}

/// Resolve one value as if it were authored by `request.tenant`.
///
/// Resource configs of baseline-capable tenants are applied first, so the
/// thresholds match what a full session would use.
///
/// # Errors
///
/// Fails if the manifest cannot be allocated, a catalog threshold is out of
/// bounds, a resource config cannot be read, the tenant is unknown or the
/// reference does not resolve.
pub fn resolve<M: ManifestSource + ?Sized>(
    manifest: &M,
    options: &LoadOptions,
    request: &ResolveRequest,
) -> Result<Option<AbsoluteIndex>> {
    let tenants = allocate_manifest(manifest)?;
    let entries: Vec<TenantEntry> = manifest.enabled().into_iter().cloned().collect();
    let mut catalogs = options.catalogs.clone();
    catalogs.check(tenants.min_size())?;
    apply_resource_configs(&tenants, &entries, manifest.base_dir(), &mut catalogs)?;

    let active = tenants
        .lookup_alias(&request.tenant, tenants.baseline())
        .ok_or_else(|| ToolError::UnknownTenant(request.tenant.clone()))?;
    let scale = Scale {
        multiplier: request.multiplier,
        size_scale: request.size_scale,
    };
    let resolved = Resolver::new(&tenants, &catalogs).resolve(
        "value",
        &RawRef::Bare(request.value),
        active,
        &request.catalog,
        scale,
    )?;
    tracing::debug!(tenant = %active.name, ?resolved, "Resolved reference");
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rules_core::catalog::Catalog;
    use rules_core::error::{CatalogFault, ReferenceFault};
    use rules_core::manifest::MemoryManifest;

    fn manifest() -> MemoryManifest {
        let mut a = TenantEntry::new("A");
        a.master = true;
        a.reserved_space = 2;
        let mut b = TenantEntry::new("B");
        b.reserved_space = 3;
        MemoryManifest::new(vec![a, b])
    }

    fn request(value: i64) -> ResolveRequest {
        ResolveRequest {
            tenant: "B".to_string(),
            catalog: "TEST.PCK".to_string(),
            value,
            multiplier: 1,
            size_scale: 1,
        }
    }

    #[test]
    fn test_offsets_lists_regions() {
        let rows = offsets(&manifest()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[1].offset, rows[1].end), (2000, 5000));
    }

    #[test]
    fn test_resolve_scenario() {
        let options = LoadOptions::default().catalog(Catalog::new("TEST.PCK", 300));
        let manifest = manifest();
        assert_eq!(resolve(&manifest, &options, &request(50)).unwrap(), Some(50));
        assert_eq!(resolve(&manifest, &options, &request(310)).unwrap(), Some(2310));
        assert!(matches!(
            resolve(&manifest, &options, &request(3100)),
            Err(ToolError::Reference(_))
        ));
    }

    #[test]
    fn test_zero_multiplier_rejected() {
        let mut req = request(50);
        req.multiplier = 0;
        let options = LoadOptions::default().catalog(Catalog::new("TEST.PCK", 300));
        let err = resolve(&manifest(), &options, &req).unwrap_err();
        assert!(matches!(
            err,
            ToolError::Reference(ReferenceFault::InvalidScale { multiplier: 0, .. })
        ));
    }

    #[test]
    fn test_out_of_bounds_catalog_rejected() {
        let options = LoadOptions::default().catalog(Catalog::new("TEST.PCK", 2500));
        let err = resolve(&manifest(), &options, &request(50)).unwrap_err();
        assert!(matches!(
            err,
            ToolError::Catalog(CatalogFault::SharedExceedsRegion { limit: 2000, .. })
        ));
    }

    #[test]
    fn test_unknown_tenant() {
        let mut req = request(1);
        req.tenant = "C".to_string();
        let err = resolve(&manifest(), &LoadOptions::default(), &req).unwrap_err();
        assert!(matches!(err, ToolError::UnknownTenant(name) if name == "C"));
    }
}
