//! Tenant definitions and offset allocation.
//!
//! Every catalog's index space is split into a shared region and one
//! private region per tenant. The allocator walks the manifest in order and
//! hands each tenant a base offset directly after its predecessor's
//! reserved space:
//!
//! ```text
//! offset[0] = 0
//! offset[i] = offset[i - 1] + capacity[i - 1] * BLOCK
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::AllocationFault;

/// Raw slots per declared capacity unit.
pub const BLOCK: i64 = 1000;

/// Name that addresses the baseline tenant in explicit references.
pub const MASTER_ALIAS: &str = "master";

/// Name that addresses the tenant currently being loaded.
pub const CURRENT_ALIAS: &str = "current";

/// Returns true for names content authors may not use.
#[must_use]
pub fn is_reserved_name(name: &str) -> bool {
    name == MASTER_ALIAS || name == CURRENT_ALIAS
}

/// Stable position of a tenant inside its [`TenantTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub usize);

impl TenantId {
    /// The baseline tenant is always allocated first.
    pub const BASELINE: Self = Self(0);
}

/// Declaration of a tenant before offsets are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantSpec {
    /// Unique manifest name.
    pub name: String,
    /// Human readable name for diagnostics.
    pub display_name: String,
    /// Reserved capacity in [`BLOCK`] units.
    pub capacity: u32,
    /// Whether this tenant may act as the baseline.
    pub master: bool,
}

impl TenantSpec {
    /// Create a spec whose display name equals its manifest name.
    #[must_use]
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            capacity,
            master: false,
        }
    }

    /// Mark the spec as baseline-capable.
    #[must_use]
    pub fn master(mut self) -> Self {
        self.master = true;
        self
    }
}

/// A tenant with its assigned region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    /// Position in the allocation order.
    pub id: TenantId,
    /// Unique manifest name.
    pub name: String,
    /// Human readable name for diagnostics.
    pub display_name: String,
    /// Reserved capacity in [`BLOCK`] units.
    pub capacity: u32,
    /// Whether this tenant may act as the baseline.
    pub master: bool,
    /// First raw slot of the private region.
    pub offset: i64,
}

impl Tenant {
    /// Reserved capacity in raw slots.
    #[must_use]
    pub const fn size(&self) -> i64 {
        self.capacity as i64 * BLOCK
    }

    /// One past the last raw slot of the private region.
    #[must_use]
    pub const fn end(&self) -> i64 {
        self.offset + self.size()
    }

    /// True for the first allocated tenant.
    #[must_use]
    pub fn is_baseline(&self) -> bool {
        self.id == TenantId::BASELINE
    }
}

/// Immutable result of allocation: tenants in load order with their offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantTable {
    tenants: Vec<Tenant>,
}

impl TenantTable {
    /// Assign offsets to `specs` in order.
    ///
    /// The first spec becomes the baseline tenant.
    ///
    /// # Errors
    ///
    /// Fails on an empty list, a duplicate or reserved name, or a zero
    /// capacity. Nothing is allocated in that case.
    pub fn allocate(specs: &[TenantSpec]) -> Result<Self, AllocationFault> {
        if specs.is_empty() {
            return Err(AllocationFault::NoBaseline);
        }

        let mut seen = HashSet::with_capacity(specs.len());
        for spec in specs {
            if is_reserved_name(&spec.name) {
                return Err(AllocationFault::ReservedName {
                    name: spec.name.clone(),
                });
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(AllocationFault::DuplicateTenant {
                    name: spec.name.clone(),
                });
            }
            if spec.capacity == 0 {
                return Err(AllocationFault::ZeroCapacity {
                    name: spec.name.clone(),
                });
            }
        }

        Ok(Self {
            tenants: compute_offsets(specs),
        })
    }

    /// The baseline tenant.
    #[must_use]
    pub fn baseline(&self) -> &Tenant {
        &self.tenants[TenantId::BASELINE.0]
    }

    /// Tenant by id.
    #[must_use]
    pub fn get(&self, id: TenantId) -> Option<&Tenant> {
        self.tenants.get(id.0)
    }

    /// Tenant by manifest name. Aliases are not accepted here.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Tenant> {
        self.tenants.iter().find(|t| t.name == name)
    }

    /// Resolve a name as written inside an explicit reference.
    ///
    /// `master` maps to the baseline and `current` to `active`.
    #[must_use]
    pub fn lookup_alias<'a>(&'a self, name: &str, active: &'a Tenant) -> Option<&'a Tenant> {
        match name {
            MASTER_ALIAS => Some(self.baseline()),
            CURRENT_ALIAS => Some(active),
            _ => self.by_name(name),
        }
    }

    /// Size of the smallest private region, in raw slots.
    #[must_use]
    pub fn min_size(&self) -> i64 {
        self.tenants.iter().map(Tenant::size).min().unwrap_or(0)
    }

    /// All tenants in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = &Tenant> {
        self.tenants.iter()
    }

    /// Number of allocated tenants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    /// Always false for an allocated table; kept for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

/// Lay out tenants back to back, baseline at zero.
fn compute_offsets(specs: &[TenantSpec]) -> Vec<Tenant> {
    let mut offset = 0i64;
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let tenant = Tenant {
                id: TenantId(index),
                name: spec.name.clone(),
                display_name: spec.display_name.clone(),
                capacity: spec.capacity,
                master: spec.master,
                offset,
            };
            offset += tenant.size();
            tenant
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> Vec<TenantSpec> {
        vec![
            TenantSpec::new("xcom1", 1).master(),
            TenantSpec::new("A", 2),
            TenantSpec::new("B", 3),
        ]
    }

    #[test]
    fn test_offsets_are_packed() {
        let table = TenantTable::allocate(&specs()).unwrap();
        let offsets: Vec<_> = table.iter().map(|t| t.offset).collect();
        assert_eq!(offsets, vec![0, 1000, 3000]);
        assert_eq!(table.by_name("B").unwrap().end(), 6000);
    }

    #[test]
    fn test_two_tenant_scenario() {
        let table =
            TenantTable::allocate(&[TenantSpec::new("A", 2), TenantSpec::new("B", 3)]).unwrap();
        assert_eq!(table.by_name("A").unwrap().offset, 0);
        assert_eq!(table.by_name("B").unwrap().offset, 2000);
        assert_eq!(table.by_name("B").unwrap().size(), 3000);
        assert_eq!(table.min_size(), 2000);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut list = specs();
        list.push(TenantSpec::new("A", 1));
        let err = TenantTable::allocate(&list).unwrap_err();
        assert_eq!(
            err,
            AllocationFault::DuplicateTenant {
                name: "A".to_string()
            }
        );
        assert_eq!(err.offending_tenant(), Some("A"));
    }

    #[test]
    fn test_reserved_names_rejected() {
        for name in [MASTER_ALIAS, CURRENT_ALIAS] {
            let err = TenantTable::allocate(&[TenantSpec::new(name, 1)]).unwrap_err();
            assert!(matches!(err, AllocationFault::ReservedName { .. }));
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = TenantTable::allocate(&[TenantSpec::new("A", 0)]).unwrap_err();
        assert!(matches!(err, AllocationFault::ZeroCapacity { .. }));
    }

    #[test]
    fn test_empty_manifest() {
        assert_eq!(
            TenantTable::allocate(&[]).unwrap_err(),
            AllocationFault::NoBaseline
        );
    }

    #[test]
    fn test_alias_lookup() {
        let table = TenantTable::allocate(&specs()).unwrap();
        let active = table.by_name("B").unwrap();
        assert_eq!(table.lookup_alias("master", active).unwrap().name, "xcom1");
        assert_eq!(table.lookup_alias("current", active).unwrap().name, "B");
        assert_eq!(table.lookup_alias("A", active).unwrap().name, "A");
        assert!(table.lookup_alias("nope", active).is_none());
    }
}
