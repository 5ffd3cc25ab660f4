//! # Rules Core
//!
//! Multi-tenant rule database loader.
//!
//! Independently authored content packages ("tenants") are merged into one
//! rule database. Each tenant gets a private region of every resource
//! catalog so its numeric references never collide with another tenant's,
//! and later files patch, replace or delete records created by earlier
//! ones while list order stays stable.
//!
//! Loading is a one-shot, single-threaded preparation step:
//! - No global "current tenant"; the active tenant is passed explicitly
//! - No runtime mutation after the session finishes
//!
//! ## Crate Structure
//!
//! - [`tenant`] - Tenant regions and offset allocation
//! - [`catalog`] - Resource catalogs and their shared thresholds
//! - [`resolver`] - Authored reference to absolute index
//! - [`table`] - Generic create/update/delete record protocol
//! - [`rules`] - Sample rule categories
//! - [`ordering`] - Post-load list sorting
//! - [`resources`] - Extra resource bundles with deferred loading
//! - [`ruleset`] - All tables of a session
//! - [`manifest`] - Tenant manifests
//! - [`loader`] - The load orchestrator
//! - [`config`] - Session options
//! - [`document`] - Ordered document tree for content files

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod catalog;
pub mod config;
pub mod document;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod ordering;
pub mod resolver;
pub mod resources;
pub mod rules;
pub mod ruleset;
pub mod table;
pub mod tenant;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{Catalog, CatalogSet};
    pub use crate::config::{LoadOptions, ResourceConfig, SessionConfig};
    pub use crate::document::Node;
    pub use crate::error::{
        AllocationFault, CatalogFault, FileFault, IntegrityFault, LoadError, LookupFault,
        ReferenceFault, Result, RuleFault, TenantLoadFault,
    };
    pub use crate::loader::{load, LoadOrchestrator, LoadReport, Session};
    pub use crate::manifest::{ManifestSource, MemoryManifest, RonManifest, TenantEntry};
    pub use crate::resolver::{AbsoluteIndex, RawRef, Resolver, Scale};
    pub use crate::rules::{
        ArmorRule, ArticleRule, Category, CraftWeaponRule, FacilityRule, ItemKind, ItemRule,
    };
    pub use crate::ruleset::Ruleset;
    pub use crate::table::{LoadContext, Presence, Rule, RuleRef, RuleTable};
    pub use crate::tenant::{Tenant, TenantSpec, TenantTable, BLOCK};
}
