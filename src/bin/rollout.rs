//! # Rollout CLI
//!
//! Single entry point for driving a deployment run from a manifest: pass the
//! target version, choose sequential or parallel platform deployment, and
//! optionally skip pre-flight validation. Exits 0 on full success, non-zero
//! on any stage failure.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::error;

use rollout_core::config::OrchestratorConfig;
use rollout_core::logging;
use rollout_core::manifest::RolloutManifest;
use rollout_core::orchestration::Orchestrator;
use rollout_core::store::StatusStore;

#[derive(Parser)]
#[command(name = "rollout")]
#[command(about = "Deploy infrastructure, services, and platform widgets from a manifest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Target version or tag to deploy
    version: String,

    /// Deploy platform widgets in parallel instead of sequentially
    #[arg(long)]
    parallel: bool,

    /// Skip pre-flight validation checks
    #[arg(long)]
    skip_validation: bool,

    /// Path to the rollout manifest
    #[arg(short, long, default_value = "rollout.yml")]
    manifest: PathBuf,

    /// Status record directory (default: from config/environment)
    #[arg(long)]
    status_dir: Option<PathBuf>,

    /// Report output path (default: from config/environment)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.verbose {
        0 => logging::init_structured_logging(),
        1 => logging::init_with_level("debug"),
        _ => logging::init_with_level("trace"),
    }

    if let Err(err) = run(cli).await {
        error!(error = %err, "❌ Rollout failed");
        eprintln!("rollout: {err:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = OrchestratorConfig::from_env()?;
    if let Some(dir) = cli.status_dir {
        config.status_dir = dir;
    }

    let manifest = RolloutManifest::load(&cli.manifest)
        .with_context(|| format!("loading manifest '{}'", cli.manifest.display()))?;

    let store = Arc::new(StatusStore::open(&config.status_dir)?);
    let notifier = manifest.build_notifier();

    let mut request = manifest.to_request(&cli.version, cli.parallel, cli.skip_validation);
    request.report_path = cli.report;

    let orchestrator = Orchestrator::new(store, config, notifier);
    let summary = orchestrator.run(request).await?;

    println!("{}", summary.report);
    Ok(())
}
