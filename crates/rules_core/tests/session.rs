//! End-to-end load sessions over real content directories.

use rules_core::catalog::Catalog;
use rules_core::config::LoadOptions;
use rules_core::error::{CatalogFault, FileFault, IntegrityFault, LoadError};
use rules_core::loader::load;
use rules_core::manifest::{ManifestSource, RonManifest};
use rules_core::resources::ResourceSource;
use rules_core::rules::Category;
use rules_core::table::Presence;
use rules_test_utils::fixtures::{
    master_entry, tenant_entry, ContentDir, BASELINE_RULES, LASER_RULES,
};

fn non_strict() -> LoadOptions {
    LoadOptions::default().strict(false)
}

#[test]
fn test_full_session_resolves_patches_and_sorts() {
    let mut content = ContentDir::new();
    content
        .tenant(master_entry("xcom1"), &[("xcom1/rules.ron", BASELINE_RULES)])
        .tenant(tenant_entry("lasers", 2), &[("lasers/rules.ron", LASER_RULES)]);
    let mut manifest = content.ron_manifest();

    let mut session = load(&mut manifest, non_strict()).unwrap();
    assert_eq!(session.report().loaded, vec!["xcom1", "lasers"]);
    assert!(session.report().quarantined.is_empty());

    let rules = session.ruleset();
    let laser = rules
        .items
        .lookup("STR_LASER_CANNON_UC", Presence::Required)
        .unwrap()
        .unwrap();
    assert_eq!(laser.big_sprite, Some(1060));

    let pistol = rules.items.lookup("STR_PISTOL", Presence::Required).unwrap().unwrap();
    assert_eq!(pistol.cost_buy, 800);
    assert_eq!(pistol.big_sprite, Some(3));

    assert_eq!(
        rules.ids(Category::Items),
        &[
            "STR_PISTOL",
            "STR_CANNON_ROUNDS_X50",
            "STR_STINGRAY_LAUNCHER",
            "STR_LASER_CANNON_UC",
            "STR_CANNON_UC",
        ]
    );
    assert_eq!(
        rules.ids(Category::CraftWeapons),
        &["STR_STINGRAY", "STR_LASER_CANNON", "STR_CANNON"]
    );
    assert_eq!(rules.ids(Category::Articles), &["STR_CANNON", "STR_PISTOL"]);

    assert!(!rules.resources.bundles()[0].is_loaded());
    let sprite = session.resource("BIGOBS.PCK", 1060).cloned();
    assert_eq!(
        sprite,
        Some(ResourceSource::File {
            tenant: "lasers".to_string(),
            path: content.path().join("lasers").join("laser.png"),
        })
    );
    assert_eq!(session.resource("BIGOBS.PCK", 3), Some(&ResourceSource::Builtin));
    assert_eq!(session.materialize_all(), 0);
}

const BROKEN_FIRST: &str = r#"{
    "items": [
        { "type": "STR_BROKEN_ITEM", "cost_buy": 5 },
        { "update": "STR_PISTOL", "size": 99 },
    ],
}"#;

const BROKEN_SECOND: &str = r#"{
    "items": [ { "cost_buy": 10 } ],
}"#;

fn content_with_broken_tenant() -> ContentDir {
    let mut content = ContentDir::new();
    content
        .tenant(master_entry("xcom1"), &[("xcom1/rules.ron", BASELINE_RULES)])
        .tenant(
            tenant_entry("broken", 1),
            &[
                ("broken/first.ron", BROKEN_FIRST),
                ("broken/second.ron", BROKEN_SECOND),
            ],
        )
        .tenant(tenant_entry("lasers", 1), &[("lasers/rules.ron", LASER_RULES)]);
    content
}

#[test]
fn test_quarantined_tenant_leaves_no_trace() {
    let content = content_with_broken_tenant();
    let mut manifest = content.ron_manifest();

    let session = load(&mut manifest, non_strict()).unwrap();
    let report = session.report();
    assert!(report.is_quarantined("broken"));
    assert_eq!(report.loaded, vec!["xcom1", "lasers"]);

    let fault = report.quarantined[0].to_string();
    assert!(fault.contains("broken"), "{fault}");

    let rules = session.ruleset();
    assert!(!rules.items.contains("STR_BROKEN_ITEM"));
    let pistol = rules.items.lookup("STR_PISTOL", Presence::Required).unwrap().unwrap();
    assert_eq!(pistol.size, 20);
    assert_eq!(pistol.cost_buy, 800);

    // The quarantined tenant keeps its region for this session.
    let laser = rules
        .items
        .lookup("STR_LASER_CANNON_UC", Presence::Required)
        .unwrap()
        .unwrap();
    assert_eq!(laser.big_sprite, Some(2060));

    let reloaded = RonManifest::load(manifest.path()).unwrap();
    let flags: Vec<(&str, bool)> = reloaded
        .entries()
        .iter()
        .map(|entry| (entry.name.as_str(), entry.enabled))
        .collect();
    assert_eq!(flags, vec![("xcom1", true), ("broken", false), ("lasers", true)]);
}

#[test]
fn test_strict_mode_aborts_with_context() {
    let content = content_with_broken_tenant();
    let mut manifest = content.ron_manifest();

    let err = load(&mut manifest, LoadOptions::default().strict(true)).unwrap_err();
    match &err {
        LoadError::TenantLoad(fault) => {
            assert_eq!(fault.tenant, "broken");
            assert!(fault.to_string().contains("second.ron"), "{fault}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(manifest.entries().iter().all(|entry| entry.enabled));
}

#[test]
fn test_second_session_skips_quarantined_tenant() {
    let content = content_with_broken_tenant();
    let mut manifest = content.ron_manifest();
    load(&mut manifest, non_strict()).unwrap();

    let mut reloaded = RonManifest::load(manifest.path()).unwrap();
    let session = load(&mut reloaded, non_strict()).unwrap();
    assert!(session.report().quarantined.is_empty());
    assert_eq!(session.tenants().len(), 2);
    // Offsets close up once the broken tenant is gone.
    assert_eq!(session.tenants().by_name("lasers").unwrap().offset, 1000);
}

#[test]
fn test_broken_link_fails_session() {
    let mut content = ContentDir::new();
    content
        .tenant(master_entry("xcom1"), &[("xcom1/rules.ron", BASELINE_RULES)])
        .tenant(
            tenant_entry("cleanup", 1),
            &[("cleanup/rules.ron", r#"{ "items": [ { "delete": "STR_CANNON_UC" } ] }"#)],
        );
    let mut manifest = content.ron_manifest();

    let err = load(&mut manifest, non_strict()).unwrap_err();
    let LoadError::Integrity(faults) = err else {
        panic!("expected integrity failure");
    };
    assert_eq!(
        faults,
        vec![IntegrityFault::MissingLink {
            from_category: "craft_weapons",
            from_id: "STR_CANNON".to_string(),
            field: "launcher",
            to_category: "items",
            to_id: "STR_CANNON_UC".to_string(),
        }]
    );
}

#[test]
fn test_delete_then_create_starts_fresh() {
    let mut content = ContentDir::new();
    content
        .tenant(master_entry("xcom1"), &[("xcom1/rules.ron", BASELINE_RULES)])
        .tenant(
            tenant_entry("rework", 1),
            &[(
                "rework/rules.ron",
                r#"{ "items": [ { "delete": "STR_PISTOL" }, { "type": "STR_PISTOL", "cost_buy": 50 } ] }"#,
            )],
        );
    let mut manifest = content.ron_manifest();

    let session = load(&mut manifest, non_strict()).unwrap();
    let pistol = session
        .ruleset()
        .items
        .lookup("STR_PISTOL", Presence::Required)
        .unwrap()
        .unwrap();
    assert_eq!(pistol.cost_buy, 50);
    assert_eq!(pistol.big_sprite, None);
    // The recreated record takes the next auto weight.
    assert_eq!(
        session.ruleset().ids(Category::Items),
        &["STR_CANNON_ROUNDS_X50", "STR_PISTOL", "STR_STINGRAY_LAUNCHER", "STR_CANNON_UC"]
    );
}

#[test]
fn test_explicit_cross_tenant_reference() {
    let mut content = ContentDir::new();
    content
        .tenant(master_entry("xcom1"), &[("xcom1/rules.ron", BASELINE_RULES)])
        .tenant(tenant_entry("lasers", 2), &[("lasers/rules.ron", LASER_RULES)])
        .tenant(
            tenant_entry("addon", 1),
            &[(
                "addon/rules.ron",
                r#"{ "items": [
                    { "type": "STR_SHARED", "big_sprite": { "index": 70, "tenant": "lasers" } },
                    { "type": "STR_OWN", "big_sprite": 70 },
                    { "type": "STR_BASE", "big_sprite": { "index": 70, "mod": "master" } },
                ] }"#,
            )],
        );
    let mut manifest = content.ron_manifest();

    let session = load(&mut manifest, non_strict()).unwrap();
    let sprite = |id: &str| {
        session
            .ruleset()
            .items
            .lookup(id, Presence::Required)
            .unwrap()
            .unwrap()
            .big_sprite
    };
    assert_eq!(sprite("STR_SHARED"), Some(1070));
    assert_eq!(sprite("STR_OWN"), Some(3070));
    assert_eq!(sprite("STR_BASE"), Some(70));
}

#[test]
fn test_resource_config_adjusts_threshold_before_loading() {
    let mut content = ContentDir::new();
    content.write(
        "xcom1/resources.ron",
        r#"ResourceConfig(catalogs: [Catalog(name: "BIGOBS.PCK", shared_max: 100)])"#,
    );
    let mut xcom1 = master_entry("xcom1");
    xcom1.resource_config = Some("xcom1/resources.ron".into());
    content
        .tenant(xcom1, &[("xcom1/rules.ron", BASELINE_RULES)])
        .tenant(tenant_entry("lasers", 1), &[("lasers/rules.ron", LASER_RULES)]);
    let mut manifest = content.ron_manifest();

    let session = load(&mut manifest, non_strict()).unwrap();
    assert_eq!(session.catalogs().get("BIGOBS.PCK").map(|c| c.shared_max), Some(100));
    let laser = session
        .ruleset()
        .items
        .lookup("STR_LASER_CANNON_UC", Presence::Required)
        .unwrap()
        .unwrap();
    assert_eq!(laser.big_sprite, Some(60));
}

#[test]
fn test_missing_resource_config_is_fatal() {
    let mut content = ContentDir::new();
    let mut xcom1 = master_entry("xcom1");
    xcom1.resource_config = Some("xcom1/missing.ron".into());
    content.tenant(xcom1, &[("xcom1/rules.ron", BASELINE_RULES)]);
    let mut manifest = content.ron_manifest();

    let err = load(&mut manifest, non_strict()).unwrap_err();
    assert!(matches!(err, LoadError::File(_)));
}

#[test]
fn test_out_of_bounds_resource_config_is_fatal() {
    for shared_max in [-5, 5_000_000] {
        let mut content = ContentDir::new();
        content.write(
            "xcom1/resources.ron",
            &format!(
                r#"ResourceConfig(catalogs: [Catalog(name: "BIGOBS.PCK", shared_max: {shared_max})])"#
            ),
        );
        let mut xcom1 = master_entry("xcom1");
        xcom1.resource_config = Some("xcom1/resources.ron".into());
        content.tenant(xcom1, &[("xcom1/rules.ron", BASELINE_RULES)]);
        let mut manifest = content.ron_manifest();

        let err = load(&mut manifest, non_strict()).unwrap_err();
        assert!(
            matches!(
                err,
                LoadError::File(FileFault::Catalog {
                    source: CatalogFault::NegativeShared { .. }
                        | CatalogFault::SharedExceedsRegion { .. },
                    ..
                })
            ),
            "{err}"
        );
    }
}

#[test]
fn test_negative_threshold_in_options_is_fatal() {
    let mut content = ContentDir::new();
    content.tenant(master_entry("xcom1"), &[("xcom1/rules.ron", BASELINE_RULES)]);
    let mut manifest = content.ron_manifest();

    let options = non_strict().catalog(Catalog::new("BIGOBS.PCK", -5));
    let err = load(&mut manifest, options).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Catalog(CatalogFault::NegativeShared { shared_max: -5, .. })
    ));
}
