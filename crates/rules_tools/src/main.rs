//! Rules loader - Development Tools

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use rules_core::config::{default_manifest, LoadOptions, SessionConfig};
use rules_core::manifest::RonManifest;
use rules_tools::inspect::{self, ResolveRequest};
use rules_tools::report::render_tenants;
use rules_tools::{Result, ToolError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rules-tools")]
#[command(about = "Development tools for multi-tenant rule content")]
struct Cli {
    /// Session config file (RON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every tenant and report quarantines and integrity faults
    Validate {
        /// Path to the manifest
        manifest: Option<PathBuf>,
        /// Abort on the first tenant fault
        #[arg(long)]
        strict: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Do not write quarantines back to the manifest
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the region assigned to each tenant
    Offsets {
        /// Path to the manifest
        manifest: Option<PathBuf>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve one authored value to its absolute index
    Resolve {
        /// Path to the manifest
        manifest: Option<PathBuf>,
        /// Tenant the value is authored in
        #[arg(long)]
        tenant: String,
        /// Catalog name, e.g. BIGOBS.PCK
        #[arg(long)]
        catalog: String,
        /// Authored value
        #[arg(long, allow_hyphen_values = true)]
        value: i64,
        /// Slots per authored unit
        #[arg(long, default_value_t = 1)]
        multiplier: i64,
        /// Capacity divisor
        #[arg(long, default_value_t = 1)]
        size_scale: i64,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    }
}

/// Returns whether the command succeeded.
fn run(cli: Cli) -> Result<bool> {
    let config = cli.config.as_deref().map(SessionConfig::load).transpose()?;
    let options = config
        .as_ref()
        .map(SessionConfig::to_options)
        .transpose()?
        .unwrap_or_else(LoadOptions::from_env);
    let config_manifest = config.and_then(|config| config.manifest);
    let manifest_path = |arg: Option<PathBuf>| {
        arg.or_else(|| config_manifest.clone())
            .or_else(default_manifest)
            .ok_or(ToolError::NoManifest)
    };

    match cli.command {
        Commands::Validate {
            manifest,
            strict,
            json,
            dry_run,
        } => {
            let path = manifest_path(manifest)?;
            tracing::info!("Validating manifest: {}", path.display());
            let options = if strict { options.strict(true) } else { options };
            let report = rules_tools::validate::validate_manifest(&path, options, dry_run)?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report.render_text());
            }
            if report.ok {
                tracing::info!("Validation passed");
            } else {
                tracing::error!("Validation failed");
            }
            Ok(report.ok)
        }
        Commands::Offsets { manifest, json } => {
            let manifest = open(&manifest_path(manifest)?)?;
            let rows = inspect::offsets(&manifest)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", render_tenants(&rows));
            }
            Ok(true)
        }
        Commands::Resolve {
            manifest,
            tenant,
            catalog,
            value,
            multiplier,
            size_scale,
        } => {
            let manifest = open(&manifest_path(manifest)?)?;
            let request = ResolveRequest {
                tenant,
                catalog,
                value,
                multiplier,
                size_scale,
            };
            match inspect::resolve(&manifest, &options, &request)? {
                Some(index) => println!("{index}"),
                None => println!("none"),
            }
            Ok(true)
        }
    }
}

fn open(path: &Path) -> Result<RonManifest> {
    Ok(RonManifest::load(path)?)
}
