use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use donorflow::{router, AppState};
use donorflow_core::config::AppConfig;
use donorflow_core::db::{self, PgDonorStore};
use donorflow_core::ingestion::ingest_csv;
use donorflow_core::store::{DonorStore, MemoryDonorStore};
use donorflow_core::upload::{check_upload, RejectionBody, UploadFile, UploadResponse};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Donor CSV ingestion service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API
    Serve(ServeArgs),
    /// Run database migrations
    Migrate,
    /// Ingest a local CSV file and print the upload report
    Import(ImportArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Keep donors in process memory instead of Postgres
    #[arg(long)]
    in_memory: bool,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// CSV file to ingest
    path: PathBuf,
    /// Validate and merge against an empty in-memory store; nothing is written
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Command::Serve(args) => serve(&config, args).await,
        Command::Migrate => {
            let store = connect_store(&config).await?;
            db::run_migrations(store.pool()).await?;
            info!("Database migrations applied");
            Ok(())
        }
        Command::Import(args) => import(&config, args).await,
    }
}

async fn connect_store(config: &AppConfig) -> Result<PgDonorStore> {
    let database_url = config.require_database_url()?;
    let pool = db::connect(database_url, config.db_max_connections).await?;
    Ok(PgDonorStore::new(pool))
}

async fn migrated_store(config: &AppConfig) -> Result<PgDonorStore> {
    let store = connect_store(config).await?;
    db::run_migrations(store.pool()).await?;
    Ok(store)
}

async fn serve(config: &AppConfig, args: ServeArgs) -> Result<()> {
    let store: Arc<dyn DonorStore> = if args.in_memory {
        warn!("Serving from an in-memory store; donors are lost on exit");
        Arc::new(MemoryDonorStore::new())
    } else {
        Arc::new(migrated_store(config).await?)
    };

    let state = AppState::new(store).with_max_upload_bytes(config.max_upload_bytes);
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}

async fn import(config: &AppConfig, args: ImportArgs) -> Result<()> {
    let bytes = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    let file = UploadFile {
        filename: Some(args.path.display().to_string()),
        content_type: None,
        bytes,
    };
    let content = check_upload(Some(&file), config.max_upload_bytes)?;

    let store: Box<dyn DonorStore> = if args.dry_run {
        info!(path = %args.path.display(), "dry run; nothing will be written");
        Box::new(MemoryDonorStore::new())
    } else {
        Box::new(migrated_store(config).await?)
    };

    match ingest_csv(store.as_ref(), content, Utc::now()).await {
        Ok(report) => {
            let response = UploadResponse::from(report);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&RejectionBody::from(&err))?);
            bail!("import of {} rejected: {err}", args.path.display())
        }
    }
}
