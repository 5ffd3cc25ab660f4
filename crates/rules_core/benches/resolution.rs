//! Resolution and sorting benchmarks for rules_core.
//!
//! Run with: `cargo bench -p rules_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rules_core::catalog::{CatalogSet, BIG_OBJECTS};
use rules_core::ordering::sort_by_link;
use rules_core::resolver::{RawRef, Resolver, Scale};
use rules_core::rules::{CraftWeaponRule, ItemRule};
use rules_core::table::{RuleRef, RuleTable};
use rules_test_utils::fixtures::tenants;

/// Resolve bare and explicit references across a wide tenant table.
pub fn resolution_benchmark(c: &mut Criterion) {
    let names: Vec<String> = (0..64).map(|i| format!("tenant{i}")).collect();
    let specs: Vec<(&str, u32)> = names.iter().map(|name| (name.as_str(), 2)).collect();
    let tenants = tenants(&specs);
    let catalogs = CatalogSet::default();
    let resolver = Resolver::new(&tenants, &catalogs);
    let active = tenants.by_name("tenant40").expect("tenant exists");

    c.bench_function("resolve_bare", |b| {
        b.iter(|| {
            for value in 0..1000 {
                let _ = black_box(resolver.resolve(
                    "big_sprite",
                    &RawRef::Bare(value),
                    active,
                    BIG_OBJECTS,
                    Scale::ONE,
                ));
            }
        });
    });

    let explicit = RawRef::Explicit {
        index: 500,
        tenant: "tenant63".to_string(),
    };
    c.bench_function("resolve_explicit", |b| {
        b.iter(|| {
            black_box(resolver.resolve("big_sprite", &explicit, active, BIG_OBJECTS, Scale::ONE))
        });
    });
}

/// Derived sort of craft weapons by their launcher item.
pub fn sorting_benchmark(c: &mut Criterion) {
    let mut items = RuleTable::new(ItemRule::new);
    let mut weapons = RuleTable::new(CraftWeaponRule::new);
    for i in 0..2000 {
        let item_id = format!("STR_ITEM_{i}");
        items.get_or_create(&item_id).list_order = (i * 7919) % 2000;
        weapons.get_or_create(&format!("STR_WEAPON_{i}")).launcher = Some(RuleRef::new(item_id));
    }

    c.bench_function("sort_by_link_2000", |b| {
        b.iter(|| {
            let mut weapons = weapons.clone();
            sort_by_link(&mut weapons, &items, |w| w.launcher.as_ref());
            black_box(weapons.len())
        });
    });
}

criterion_group!(benches, resolution_benchmark, sorting_benchmark);
criterion_main!(benches);
