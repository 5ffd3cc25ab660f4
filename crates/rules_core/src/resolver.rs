//! Cross-tenant reference resolution.
//!
//! An authored catalog reference is either a bare integer, resolved against
//! the tenant currently loading, or an explicit `{ "index": n, "tenant": t }`
//! mapping that addresses another tenant's region.
//!
//! Values below a catalog's `shared_max` are shared by every tenant and are
//! returned unchanged; two tenants writing `12` both mean baseline slot 12.
//! Anything else is shifted into the addressed tenant's private region.

use crate::catalog::{Catalog, CatalogSet};
use crate::document::Node;
use crate::error::ReferenceFault;
use crate::tenant::{Tenant, TenantTable};

/// Sentinel for "no reference".
pub const UNSET: i64 = -1;

/// Absolute slot inside a catalog.
pub type AbsoluteIndex = i64;

/// A reference as written by an author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRef {
    /// Bare scalar, interpreted in the active tenant.
    Bare(i64),
    /// Explicit value in a named tenant (`master`, `current` or a tenant name).
    Explicit {
        /// Authored value.
        index: i64,
        /// Tenant name or alias.
        tenant: String,
    },
}

impl RawRef {
    /// Read a reference from a document node.
    ///
    /// Accepts an integer or a mapping with `index` and `tenant` keys
    /// (`mod` is accepted as an alias of `tenant`).
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceFault::Shape`] for any other node.
    pub fn from_node(field: &str, node: &Node) -> Result<Self, ReferenceFault> {
        if let Some(value) = node.as_i64() {
            return Ok(Self::Bare(value));
        }

        let shape = |detail: String| ReferenceFault::Shape {
            field: field.to_string(),
            detail,
        };

        if node.entries().is_none() {
            return Err(shape(format!("expected integer or mapping, got {}", node.kind())));
        }
        let index = node
            .get("index")
            .and_then(Node::as_i64)
            .ok_or_else(|| shape("mapping needs an integer 'index'".to_string()))?;
        let tenant = node
            .get("tenant")
            .or_else(|| node.get("mod"))
            .and_then(Node::as_str)
            .ok_or_else(|| shape("mapping needs a string 'tenant'".to_string()))?;

        Ok(Self::Explicit {
            index,
            tenant: tenant.to_string(),
        })
    }

    /// The authored value regardless of form.
    #[must_use]
    pub fn value(&self) -> i64 {
        match self {
            Self::Bare(v) | Self::Explicit { index: v, .. } => *v,
        }
    }
}

/// Scaling applied during resolution. Both factors must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scale {
    /// Raw slots per authored unit.
    pub multiplier: i64,
    /// Divisor applied to tenant capacity and offset.
    pub size_scale: i64,
}

impl Default for Scale {
    fn default() -> Self {
        Self::ONE
    }
}

impl Scale {
    /// Identity scale.
    pub const ONE: Self = Self {
        multiplier: 1,
        size_scale: 1,
    };

    /// Scale with a multiplier only.
    #[must_use]
    pub const fn multiplier(multiplier: i64) -> Self {
        Self {
            multiplier,
            size_scale: 1,
        }
    }

    /// Scale with a size divisor only.
    #[must_use]
    pub const fn size_scale(size_scale: i64) -> Self {
        Self {
            multiplier: 1,
            size_scale,
        }
    }

    /// True when both factors are positive.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.multiplier > 0 && self.size_scale > 0
    }
}

/// Resolve one reference.
///
/// This is a pure function of its inputs: the active tenant is passed in,
/// never read from ambient state.
///
/// # Errors
///
/// - [`ReferenceFault::InvalidScale`] for a zero or negative scale factor.
/// - [`ReferenceFault::Malformed`] for values below `-1`.
/// - [`ReferenceFault::UnknownTenant`] for an explicit unknown tenant.
/// - [`ReferenceFault::ExceedsCapacity`] when the scaled value does not fit
///   into the effective tenant's reserved space.
pub fn resolve(
    field: &str,
    raw: &RawRef,
    active: &Tenant,
    tenants: &TenantTable,
    catalog: &Catalog,
    scale: Scale,
) -> Result<Option<AbsoluteIndex>, ReferenceFault> {
    if !scale.is_valid() {
        return Err(ReferenceFault::InvalidScale {
            field: field.to_string(),
            catalog: catalog.name.clone(),
            multiplier: scale.multiplier,
            size_scale: scale.size_scale,
        });
    }

    let value = raw.value();
    if value < UNSET {
        return Err(ReferenceFault::Malformed {
            field: field.to_string(),
            catalog: catalog.name.clone(),
            value,
        });
    }

    if value == UNSET {
        return Ok(None);
    }

    let effective = match raw {
        RawRef::Bare(_) => active,
        RawRef::Explicit { tenant, .. } => {
            tenants
                .lookup_alias(tenant, active)
                .ok_or_else(|| ReferenceFault::UnknownTenant {
                    field: field.to_string(),
                    catalog: catalog.name.clone(),
                    tenant: tenant.clone(),
                })?
        }
    };

    let size_scale = scale.size_scale;
    let scaled = value.saturating_mul(scale.multiplier);
    let limit = effective.size() / size_scale;
    if scaled > limit {
        return Err(ReferenceFault::ExceedsCapacity {
            field: field.to_string(),
            tenant: effective.name.clone(),
            catalog: catalog.name.clone(),
            value: scaled,
            limit,
        });
    }

    if scaled < catalog.shared_max {
        Ok(Some(scaled))
    } else {
        Ok(Some(scaled + effective.offset / size_scale))
    }
}

/// Resolver bound to one session's tenants and catalogs.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    tenants: &'a TenantTable,
    catalogs: &'a CatalogSet,
}

impl<'a> Resolver<'a> {
    /// Bind a resolver.
    #[must_use]
    pub const fn new(tenants: &'a TenantTable, catalogs: &'a CatalogSet) -> Self {
        Self { tenants, catalogs }
    }

    /// The session's tenants.
    #[must_use]
    pub const fn tenants(&self) -> &'a TenantTable {
        self.tenants
    }

    /// The session's catalogs.
    #[must_use]
    pub const fn catalogs(&self) -> &'a CatalogSet {
        self.catalogs
    }

    fn catalog(&self, field: &str, name: &str) -> Result<&'a Catalog, ReferenceFault> {
        self.catalogs
            .get(name)
            .ok_or_else(|| ReferenceFault::UnknownCatalog {
                field: field.to_string(),
                catalog: name.to_string(),
            })
    }

    /// Resolve an already decoded reference into the named catalog.
    ///
    /// # Errors
    ///
    /// See [`resolve`]; also fails for an undeclared catalog.
    pub fn resolve(
        &self,
        field: &str,
        raw: &RawRef,
        active: &Tenant,
        catalog: &str,
        scale: Scale,
    ) -> Result<Option<AbsoluteIndex>, ReferenceFault> {
        let catalog = self.catalog(field, catalog)?;
        resolve(field, raw, active, self.tenants, catalog, scale)
    }

    /// Decode and resolve a reference node.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`] and [`RawRef::from_node`].
    pub fn resolve_node(
        &self,
        field: &str,
        node: &Node,
        active: &Tenant,
        catalog: &str,
        scale: Scale,
    ) -> Result<Option<AbsoluteIndex>, ReferenceFault> {
        let raw = RawRef::from_node(field, node)?;
        self.resolve(field, &raw, active, catalog, scale)
    }

    /// Resolve a field holding one reference or a sequence of them.
    ///
    /// Unset entries are dropped; the first fault aborts the whole list.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve_node`].
    pub fn resolve_list(
        &self,
        field: &str,
        node: &Node,
        active: &Tenant,
        catalog: &str,
        scale: Scale,
    ) -> Result<Vec<AbsoluteIndex>, ReferenceFault> {
        match node.as_seq() {
            Some(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(index) = self.resolve_node(field, item, active, catalog, scale)? {
                        out.push(index);
                    }
                }
                Ok(out)
            }
            None => Ok(self
                .resolve_node(field, node, active, catalog, scale)?
                .into_iter()
                .collect()),
        }
    }
}
