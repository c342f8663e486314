use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ybh_storage::{pg::PgStore, MemoryStore, Store};
use ybh_sync::{build_scheduler, SyncConfig, SyncContext};
use ybh_web::AppState;

#[derive(Debug, Parser)]
#[command(name = "ybh-cli")]
#[command(about = "Youth Benefit Hub command-line interface")]
struct Cli {
    /// Optional YAML config overriding environment-derived settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one full sync over all four sources.
    Sync {
        /// Seed an empty store with small page bounds; no-op if data exists.
        #[arg(long)]
        bootstrap: bool,
    },
    /// Serve the JSON API, with the cron scheduler when enabled.
    Serve {
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    /// Apply pending database migrations.
    Migrate {
        #[arg(long, default_value = "migrations")]
        dir: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    let config = SyncConfig::from_env();
    match path {
        Some(path) => config.with_file_overrides(path),
        None => Ok(config),
    }
}

async fn open_store(config: &SyncConfig) -> Result<Arc<dyn Store>> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url)
                .await
                .context("connecting to database")?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set; using a process-local in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Sync { bootstrap: false }) {
        Commands::Sync { bootstrap } => {
            let store = open_store(&config).await?;
            let ctx = SyncContext::from_config(config, store)?;
            if bootstrap {
                match ctx.run_bootstrap().await? {
                    Some(summary) => print_summary(&summary),
                    None => println!("store already seeded; nothing to do"),
                }
            } else {
                print_summary(&ctx.run_all().await);
            }
        }
        Commands::Serve { port } => {
            let store = open_store(&config).await?;
            let ctx = Arc::new(SyncContext::from_config(config, store.clone())?);
            if let Some(mut scheduler) = build_scheduler(ctx.clone()).await? {
                scheduler.start().await.context("starting scheduler")?;
                info!("sync scheduler started");
            }
            ybh_web::serve(AppState::new(store, Some(ctx)), port).await?;
        }
        Commands::Migrate { dir } => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for migrate")?;
            let store = PgStore::connect(url).await.context("connecting to database")?;
            store.migrate(&dir).await.context("running migrations")?;
            println!("migrations applied");
        }
    }

    Ok(())
}

fn print_summary(summary: &ybh_sync::SyncRunSummary) {
    println!(
        "sync complete: run_id={} sources={}",
        summary.run_id,
        summary.reports.len()
    );
    for report in &summary.reports {
        println!(
            "  {:<24} pages={} inserted={} updated={} skipped={}{}",
            report.source,
            report.pages,
            report.inserted,
            report.updated,
            report.skipped,
            report
                .failure
                .as_deref()
                .map(|f| format!(" failure={f}"))
                .unwrap_or_default()
        );
    }
}
