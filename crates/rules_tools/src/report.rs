//! Human and machine readable session reports.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use rules_core::loader::Session;
use rules_core::rules::Category;
use rules_core::tenant::Tenant;
use serde::Serialize;

use crate::error::Result;

/// One allocated tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantRow {
    /// Manifest name.
    pub name: String,
    /// Diagnostic name.
    pub display_name: String,
    /// Reserved capacity units.
    pub capacity: u32,
    /// First private slot.
    pub offset: i64,
    /// One past the last private slot.
    pub end: i64,
    /// Baseline-capable.
    pub master: bool,
}

impl From<&Tenant> for TenantRow {
    fn from(tenant: &Tenant) -> Self {
        Self {
            name: tenant.name.clone(),
            display_name: tenant.display_name.clone(),
            capacity: tenant.capacity,
            offset: tenant.offset,
            end: tenant.end(),
            master: tenant.master,
        }
    }
}

/// A tenant disabled during the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuarantineRow {
    /// Diagnostic name.
    pub tenant: String,
    /// Full cause.
    pub reason: String,
}

/// Outcome of `validate`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Manifest that was validated.
    pub manifest: PathBuf,
    /// True when the session completed.
    pub ok: bool,
    /// Whether strict mode was on.
    pub strict: bool,
    /// Allocated tenants.
    pub tenants: Vec<TenantRow>,
    /// Record count per category key.
    pub records: BTreeMap<String, usize>,
    /// Content files read.
    pub files: usize,
    /// Resource bundles declared.
    pub bundles: usize,
    /// Quarantined tenants.
    pub quarantined: Vec<QuarantineRow>,
    /// Fatal session errors, one per line.
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Report for a completed session.
    #[must_use]
    pub fn from_session(manifest: PathBuf, strict: bool, session: &Session) -> Self {
        let ruleset = session.ruleset();
        let report = session.report();
        Self {
            manifest,
            ok: true,
            strict,
            tenants: session.tenants().iter().map(TenantRow::from).collect(),
            records: Category::ALL
                .into_iter()
                .map(|category| (category.key().to_string(), ruleset.count(category)))
                .collect(),
            files: report.files,
            bundles: ruleset.resources.bundles().len(),
            quarantined: report
                .quarantined
                .iter()
                .map(|fault| QuarantineRow {
                    tenant: fault.tenant.clone(),
                    reason: fault.to_string(),
                })
                .collect(),
            errors: Vec::new(),
        }
    }

    /// Report for a session that aborted.
    #[must_use]
    pub fn from_error(manifest: PathBuf, strict: bool, errors: Vec<String>) -> Self {
        Self {
            manifest,
            strict,
            errors,
            ..Self::default()
        }
    }

    /// Pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ToolError::Json`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Plain text summary.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let status = if self.ok { "OK" } else { "FAILED" };
        let _ = writeln!(out, "{status}: {}", self.manifest.display());

        if !self.tenants.is_empty() {
            out.push_str(&render_tenants(&self.tenants));
        }
        for (category, count) in &self.records {
            let _ = writeln!(out, "  {category:<16} {count}");
        }
        if self.ok {
            let _ = writeln!(out, "  files: {}, bundles: {}", self.files, self.bundles);
        }
        for row in &self.quarantined {
            let _ = writeln!(out, "  quarantined {}: {}", row.tenant, row.reason);
        }
        for error in &self.errors {
            let _ = writeln!(out, "  error: {error}");
        }
        out
    }
}

/// Offset table, one tenant per line.
#[must_use]
pub fn render_tenants(rows: &[TenantRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let marker = if row.master { "*" } else { " " };
        let _ = writeln!(
            out,
            "{marker} {:<20} {:>8}..{:<8} ({} units)",
            row.name, row.offset, row.end, row.capacity
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_report_is_not_ok() {
        let report = ValidationReport::from_error(
            PathBuf::from("manifest.ron"),
            true,
            vec!["Duplicate tenant name 'a'".to_string()],
        );
        assert!(!report.ok);
        let text = report.render_text();
        assert!(text.starts_with("FAILED: manifest.ron"));
        assert!(text.contains("error: Duplicate tenant name 'a'"));

        let json = report.to_json().unwrap();
        assert!(json.contains("\"ok\": false"));
    }

    #[test]
    fn test_tenant_rows_render_marker() {
        let rows = vec![
            TenantRow {
                name: "xcom1".to_string(),
                display_name: "X-COM".to_string(),
                capacity: 1,
                offset: 0,
                end: 1000,
                master: true,
            },
            TenantRow {
                name: "lasers".to_string(),
                display_name: "lasers".to_string(),
                capacity: 2,
                offset: 1000,
                end: 3000,
                master: false,
            },
        ];
        let text = render_tenants(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("* xcom1"));
        assert!(lines[1].starts_with("  lasers"));
        assert!(lines[1].contains("1000..3000"));
    }
}
