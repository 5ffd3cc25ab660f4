//! Proptest strategies for the loader.
//!
//! These generate tenant layouts, catalogs and reference values for
//! property-based tests of allocation and resolution.

use proptest::prelude::*;
use rules_core::catalog::Catalog;
use rules_core::tenant::{TenantSpec, BLOCK};

/// Capacity in units (1-15).
pub fn arb_capacity() -> impl Strategy<Value = u32> {
    1u32..16u32
}

/// Tenant specs with unique names, the first one baseline-capable.
pub fn arb_tenant_specs(max_tenants: usize) -> impl Strategy<Value = Vec<TenantSpec>> {
    proptest::collection::vec(arb_capacity(), 1..max_tenants).prop_map(|capacities| {
        capacities
            .into_iter()
            .enumerate()
            .map(|(i, capacity)| {
                let spec = TenantSpec::new(format!("tenant{i}"), capacity);
                if i == 0 {
                    spec.master()
                } else {
                    spec
                }
            })
            .collect()
    })
}

/// A catalog whose shared region fits inside one block.
pub fn arb_catalog() -> impl Strategy<Value = Catalog> {
    (1i64..BLOCK).prop_map(|shared_max| Catalog::new("TEST.PCK", shared_max))
}

/// A valid bare value for a tenant with `capacity` units.
pub fn arb_value_within(capacity: u32) -> impl Strategy<Value = i64> {
    0i64..=i64::from(capacity) * BLOCK
}

/// A value below -1, always malformed.
pub fn arb_malformed_value() -> impl Strategy<Value = i64> {
    i64::MIN / 2..-1i64
}
