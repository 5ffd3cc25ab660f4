//! Manifest validation.

use std::path::Path;

use rules_core::config::LoadOptions;
use rules_core::error::LoadError;
use rules_core::loader::load;
use rules_core::manifest::{ManifestSource, MemoryManifest, RonManifest};

use crate::error::Result;
use crate::report::ValidationReport;

/// Run a full load session over the manifest at `path`.
///
/// A failed session is reported in the returned report, not as an error.
/// Unless `dry_run` is set, quarantined tenants are disabled in the
/// manifest file just as a normal session would.
///
/// # Errors
///
/// Returns [`crate::ToolError::Manifest`] if the manifest cannot be read.
pub fn validate_manifest(
    path: &Path,
    options: LoadOptions,
    dry_run: bool,
) -> Result<ValidationReport> {
    let mut manifest = RonManifest::load(path)?;
    if dry_run {
        let mut scratch = MemoryManifest::new(manifest.entries().to_vec())
            .with_base_dir(manifest.base_dir());
        Ok(run_session(path, &mut scratch, options))
    } else {
        Ok(run_session(path, &mut manifest, options))
    }
}

fn run_session<M: ManifestSource + ?Sized>(
    path: &Path,
    manifest: &mut M,
    options: LoadOptions,
) -> ValidationReport {
    let strict = options.strict;
    match load(manifest, options) {
        Ok(session) => {
            let report = ValidationReport::from_session(path.to_path_buf(), strict, &session);
            if !report.quarantined.is_empty() {
                tracing::warn!(count = report.quarantined.len(), "Tenants quarantined");
            }
            report
        }
        Err(LoadError::Integrity(faults)) => ValidationReport::from_error(
            path.to_path_buf(),
            strict,
            faults.iter().map(ToString::to_string).collect(),
        ),
        Err(error) => {
            ValidationReport::from_error(path.to_path_buf(), strict, vec![error.to_string()])
        }
    }
}
