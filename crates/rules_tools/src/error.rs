//! Error types for the tools.

use rules_core::error::{
    AllocationFault, CatalogFault, FileFault, LoadError, ManifestError, ReferenceFault,
};
use thiserror::Error;

/// Result type for tool commands.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Failure of a tool command.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No manifest was given and none could be found.
    #[error("No manifest given and none found via RULES_DATA_DIR, data/ or assets/data/")]
    NoManifest,

    /// The manifest could not be read or written.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The load session failed.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Offsets could not be assigned.
    #[error(transparent)]
    Allocation(#[from] AllocationFault),

    /// A catalog threshold is out of bounds.
    #[error(transparent)]
    Catalog(#[from] CatalogFault),

    /// A config file could not be read.
    #[error(transparent)]
    File(#[from] FileFault),

    /// The tenant named on the command line is not allocated.
    #[error("Unknown tenant '{0}'")]
    UnknownTenant(String),

    /// The reference did not resolve.
    #[error(transparent)]
    Reference(#[from] ReferenceFault),

    /// The JSON report could not be encoded.
    #[error("Failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}
