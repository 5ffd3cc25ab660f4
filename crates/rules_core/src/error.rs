//! Error types for the rule loading pipeline.
//!
//! Faults are split by blast radius:
//!
//! - [`AllocationFault`], [`CatalogFault`] and [`IntegrityFault`] are fatal
//!   to the whole session.
//! - [`ReferenceFault`] and [`RuleFault`] are fatal to the tenant being loaded
//!   and surface as [`TenantLoadFault`].
//! - [`TenantLoadFault`] quarantines the tenant unless strict mode is active.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`LoadError`].
pub type Result<T> = std::result::Result<T, LoadError>;

/// Failure while assigning tenant offsets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationFault {
    /// Two manifest entries share a name.
    #[error("Duplicate tenant name '{name}'")]
    DuplicateTenant {
        /// The repeated name.
        name: String,
    },

    /// A tenant used a name reserved for resolver addressing.
    #[error("Tenant name '{name}' is reserved")]
    ReservedName {
        /// The reserved name.
        name: String,
    },

    /// A tenant declared no reserved space.
    #[error("Tenant '{name}' declares zero reserved space")]
    ZeroCapacity {
        /// Tenant name.
        name: String,
    },

    /// No enabled tenant is left to act as the baseline.
    #[error("No baseline tenant in manifest")]
    NoBaseline,
}

impl AllocationFault {
    /// Name of the manifest entry that caused the fault, if any.
    #[must_use]
    pub fn offending_tenant(&self) -> Option<&str> {
        match self {
            Self::DuplicateTenant { name }
            | Self::ReservedName { name }
            | Self::ZeroCapacity { name } => Some(name),
            Self::NoBaseline => None,
        }
    }
}

/// A numeric catalog reference that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceFault {
    /// The authored value is below the `-1` sentinel.
    #[error("Field '{field}' has malformed value {value} for catalog '{catalog}'")]
    Malformed {
        /// Field being loaded.
        field: String,
        /// Target catalog.
        catalog: String,
        /// Authored value.
        value: i64,
    },

    /// The reference names a tenant that is not registered.
    #[error("Field '{field}' references unknown tenant '{tenant}' in catalog '{catalog}'")]
    UnknownTenant {
        /// Field being loaded.
        field: String,
        /// Catalog being addressed.
        catalog: String,
        /// Name given by the author.
        tenant: String,
    },

    /// The reference does not fit into the tenant's reserved space.
    #[error(
        "Field '{field}' value {value} exceeds reserved space {limit} of tenant '{tenant}' in catalog '{catalog}'"
    )]
    ExceedsCapacity {
        /// Field being loaded.
        field: String,
        /// Tenant whose region was addressed.
        tenant: String,
        /// Target catalog.
        catalog: String,
        /// Scaled authored value.
        value: i64,
        /// Largest value allowed for the tenant.
        limit: i64,
    },

    /// The multiplier or size divisor is not positive.
    #[error(
        "Field '{field}' uses invalid scale (multiplier {multiplier}, size scale {size_scale}) for catalog '{catalog}'"
    )]
    InvalidScale {
        /// Field being loaded.
        field: String,
        /// Target catalog.
        catalog: String,
        /// Requested multiplier.
        multiplier: i64,
        /// Requested size divisor.
        size_scale: i64,
    },

    /// The catalog is not declared.
    #[error("Field '{field}' references unknown catalog '{catalog}'")]
    UnknownCatalog {
        /// Field being loaded.
        field: String,
        /// Catalog name.
        catalog: String,
    },

    /// The node is neither an integer nor an `{index, tenant}` mapping.
    #[error("Field '{field}' is not a valid reference: {detail}")]
    Shape {
        /// Field being loaded.
        field: String,
        /// What was wrong with the node.
        detail: String,
    },
}

/// A catalog whose shared threshold cannot be honoured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogFault {
    /// The shared region would be empty and shift every value.
    #[error("Catalog '{catalog}' has negative shared_max {shared_max}")]
    NegativeShared {
        /// Catalog name.
        catalog: String,
        /// Declared threshold.
        shared_max: i64,
    },

    /// The shared region would overlap a tenant's private region.
    #[error(
        "Catalog '{catalog}' shared_max {shared_max} exceeds the smallest tenant region of {limit} slots"
    )]
    SharedExceedsRegion {
        /// Catalog name.
        catalog: String,
        /// Declared threshold.
        shared_max: i64,
        /// Size of the smallest allocated tenant region.
        limit: i64,
    },
}

/// A rule entry that violates the create/update/delete protocol or its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleFault {
    /// The entry carries no directive key.
    #[error("Entry #{position} in '{category}' has no type/new/override/update/delete/ignore key")]
    MissingDirective {
        /// Category list key.
        category: &'static str,
        /// Zero-based position inside the list.
        position: usize,
    },

    /// The entry carries more than one id-bearing directive.
    #[error("'{category}' entry '{id}' has conflicting directives '{first}' and '{second}'")]
    ConflictingDirectives {
        /// Category list key.
        category: &'static str,
        /// Id carried by the first directive.
        id: String,
        /// First directive key found.
        first: &'static str,
        /// Second directive key found.
        second: &'static str,
    },

    /// `new` used for an id that already exists.
    #[error("'{category}' entry '{id}' already exists and cannot be created with 'new'")]
    AlreadyExists {
        /// Category list key.
        category: &'static str,
        /// Record id.
        id: String,
    },

    /// `override` used for an id that does not exist.
    #[error("'{category}' entry '{id}' does not exist and cannot be overridden")]
    NotFound {
        /// Category list key.
        category: &'static str,
        /// Record id.
        id: String,
    },

    /// A field had the wrong shape.
    #[error("'{category}' entry '{id}': field '{field}' {detail}")]
    Field {
        /// Category list key.
        category: &'static str,
        /// Record id.
        id: String,
        /// Field name.
        field: String,
        /// What was expected.
        detail: String,
    },

    /// A top-level section had the wrong shape.
    #[error("Section '{section}' {detail}")]
    Section {
        /// Top-level key.
        section: String,
        /// What was expected.
        detail: String,
    },

    /// A catalog reference inside a record failed.
    #[error("'{category}' entry '{id}': {source}")]
    Reference {
        /// Category list key.
        category: &'static str,
        /// Record id.
        id: String,
        /// Underlying fault.
        #[source]
        source: ReferenceFault,
    },
}

/// A required record is absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Required {category} '{id}' not found")]
pub struct LookupFault {
    /// Category searched.
    pub category: &'static str,
    /// Id that was requested.
    pub id: String,
}

/// A symbolic link between two categories that does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityFault {
    /// The link target does not exist.
    #[error("{from_category} '{from_id}' field '{field}' links to missing {to_category} '{to_id}'")]
    MissingLink {
        /// Category of the linking record.
        from_category: &'static str,
        /// Id of the linking record.
        from_id: String,
        /// Field that holds the link.
        field: &'static str,
        /// Category of the target.
        to_category: &'static str,
        /// Id of the missing target.
        to_id: String,
    },

    /// Both ends exist but disagree on their structural kind.
    #[error(
        "{from_category} '{from_id}' field '{field}' links to {to_category} '{to_id}': {detail}"
    )]
    KindMismatch {
        /// Category of the linking record.
        from_category: &'static str,
        /// Id of the linking record.
        from_id: String,
        /// Field that holds the link.
        field: &'static str,
        /// Category of the target.
        to_category: &'static str,
        /// Id of the target.
        to_id: String,
        /// Which classification disagreed.
        detail: String,
    },
}

/// Failure while reading or decoding a content file.
#[derive(Debug, Error)]
pub enum FileFault {
    /// Failed to read file.
    #[error("Failed to read file '{path}': {source}")]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse RON file.
    #[error("Failed to parse RON file '{path}': {source}")]
    Parse {
        /// Path to the file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// A resource config declared an unusable catalog.
    #[error("In '{path}': {source}")]
    Catalog {
        /// Path to the file.
        path: PathBuf,
        /// Underlying catalog fault.
        #[source]
        source: CatalogFault,
    },

    /// The file decoded but broke a rule.
    #[error("In '{path}': {source}")]
    Rule {
        /// Path to the file.
        path: PathBuf,
        /// Underlying rule fault.
        #[source]
        source: RuleFault,
    },
}

/// Any failure raised while one tenant's files were loading.
#[derive(Debug, Error)]
#[error("Failed to load tenant '{tenant}': {source}")]
pub struct TenantLoadFault {
    /// Display name of the tenant.
    pub tenant: String,
    /// Manifest name of the tenant, when known.
    pub manifest_name: Option<String>,
    /// Underlying cause.
    #[source]
    pub source: FileFault,
}

/// Failure reading or writing the tenant manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read or write the manifest file.
    #[error("Manifest IO error for '{path}': {source}")]
    Io {
        /// Manifest path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the manifest file.
    #[error("Failed to parse manifest '{path}': {source}")]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// Failed to serialize the manifest back to disk.
    #[error("Failed to write manifest '{path}': {source}")]
    Serialize {
        /// Manifest path.
        path: PathBuf,
        /// Underlying serialization error.
        #[source]
        source: ron::Error,
    },
}

/// Top-level error type for a load session.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Tenant offsets could not be assigned.
    #[error(transparent)]
    Allocation(#[from] AllocationFault),

    /// A tenant failed to load in strict mode.
    #[error(transparent)]
    TenantLoad(#[from] TenantLoadFault),

    /// Cross-category validation failed.
    #[error("Integrity check failed: {}", summarize(.0))]
    Integrity(Vec<IntegrityFault>),

    /// The session's catalogs do not fit the allocated tenants.
    #[error(transparent)]
    Catalog(#[from] CatalogFault),

    /// A resource config or bundle file failed outside a tenant phase.
    #[error(transparent)]
    File(#[from] FileFault),

    /// The manifest source failed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

fn summarize(faults: &[IntegrityFault]) -> String {
    match faults {
        [] => "no faults recorded".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}
