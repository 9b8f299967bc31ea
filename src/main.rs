//! cdrlog: log the time window of every CDR file dropped into the watched paths.
//!
//! Default mode watches the configured paths and logs files as they arrive.
//! With `--scan`, walks every path once and logs only the files the loading
//! log does not know yet.

use anyhow::{Context, Result};
use cdrlog::db::Db;
use cdrlog::ingest::{plan, reconcile, ReconcileReport};
use cdrlog::watch::run_watcher;
use cdrlog::Config;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cdrlog")]
#[command(about = "Log begin/end times of CDR files, live or by reconciling directories")]
struct Args {
    /// Configuration file (defaults to $CDRLOG_CONFIG, then ./config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scan all paths once and load files not found in the database, then exit
    #[arg(short, long)]
    scan: bool,

    /// With --scan: list the files that would be loaded without processing them
    #[arg(long, requires = "scan")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", &config.cdrlog.log_level),
    )
    .init();

    log::info!("Starting cdrlog");
    log::info!("Database path: {}", config.db_path().display());

    let db = Db::new(config.db_path());
    let applied = db
        .initialize()
        .await
        .context("Failed to initialize the loading log database")?;
    if let Some(version) = applied.last() {
        log::info!("Loading log schema upgraded to version {}", version);
    }

    let catalog = config.catalog()?;
    log::info!("{} CDR formats loaded", catalog.formats().len());

    if !args.scan {
        log::info!("Watching for new CDR files (Ctrl+C to stop)");
        run_watcher(
            &catalog,
            &db,
            config.paths().to_vec(),
            config.watch.debounce_ms,
        )
        .await
        .context("Live watch failed")?;
        return Ok(());
    }

    if args.dry_run {
        for root in config.paths() {
            let plan = plan(&db, root).await?;
            log::info!(
                "{}: {} file(s), {} not yet logged",
                root.display(),
                plan.discovered.len(),
                plan.missing.len()
            );
            for path in &plan.missing {
                println!("{}", path.display());
            }
        }
        return Ok(());
    }

    let mut total = ReconcileReport::default();
    for root in config.paths() {
        // A store or walk failure on one path must not stop the others
        match reconcile(&catalog, &db, root, config.reconcile.workers).await {
            Ok(report) => {
                total.discovered += report.discovered;
                total.already_logged += report.already_logged;
                total.processed += report.processed;
                total.entries += report.entries;
                total.unrecognized += report.unrecognized;
                total.empty += report.empty;
                total.failed += report.failed;
            }
            Err(e) => log::error!("Error scanning {}: {}", root.display(), e),
        }
    }

    log::info!("=== Reconciliation Complete ===");
    log::info!("Files discovered: {}", total.discovered);
    log::info!("  Already logged (skipped): {}", total.already_logged);
    log::info!("  Logged: {} ({} segments)", total.processed, total.entries);
    log::info!("  Empty: {}", total.empty);
    log::info!("  Unrecognized: {}", total.unrecognized);
    log::info!("  Failed: {}", total.failed);
    if total.failed > 0 {
        log::warn!("Some files failed to load. Check logs above for details.");
    }

    Ok(())
}
