//! Galleria CLI: operator commands for the school media gallery.
//!
//! Reads the same environment as the services (`DATABASE_URL`,
//! `STORAGE_BACKEND`, `S3_*` or `LOCAL_STORAGE_*`); a `.env` file is loaded
//! when present.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use galleria_cli::{format_item_table, init_tracing};
use galleria_core::{GalleryConfig, GalleryItemPatch, MediaKind, StorageBackend};
use galleria_db::{connect, run_migrations, PostgresGalleryLedger};
use galleria_services::{
    create_storage, EditOutcome, GalleryService, IngestRequest, OrphanReconciler,
    ReconcileConfig, RetireOutcome,
};
use galleria_storage::{LocalStorage, Storage};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "galleria", about = "School media gallery operations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest an image or video file into the gallery
    Ingest {
        /// Path to the source file
        file: PathBuf,
        /// Media kind: image or video
        #[arg(long, default_value = "image")]
        kind: MediaKind,
        /// Optional title (at most 255 characters)
        #[arg(long)]
        title: Option<String>,
        /// Content type; inferred from the file when omitted
        #[arg(long)]
        content_type: Option<String>,
        /// Thumbnail image for a video
        #[arg(long)]
        thumbnail: Option<PathBuf>,
        /// Uploader UUID
        #[arg(long)]
        uploaded_by: Option<Uuid>,
    },
    /// List active gallery items
    List {
        /// Filter by kind: image or video
        #[arg(long)]
        kind: Option<MediaKind>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Edit title, featured flag or order of an item
    Update {
        id: Uuid,
        #[arg(long, conflicts_with = "clear_title")]
        title: Option<String>,
        /// Remove the title
        #[arg(long)]
        clear_title: bool,
        #[arg(long)]
        featured: Option<bool>,
        #[arg(long)]
        order: Option<i32>,
    },
    /// Retire an item and delete its stored objects
    Retire { id: Uuid },
    /// Show quota usage per kind
    Quota,
    /// Delete stored objects no active item references
    Reconcile {
        /// Report orphans without deleting them
        #[arg(long)]
        dry_run: bool,
        /// Keep running, sweeping every RECONCILE_INTERVAL_SECS
        #[arg(long)]
        watch: bool,
    },
    /// Create (local) or verify (S3) the configured bucket
    InitStorage,
    /// Apply database migrations
    Migrate,
}

async fn gallery_service(config: &GalleryConfig) -> anyhow::Result<GalleryService> {
    let pool = connect(config).await?;
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage backend")?;
    let ledger = Arc::new(PostgresGalleryLedger::new(pool));
    Ok(GalleryService::new(storage, ledger, config))
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

async fn init_storage(config: &GalleryConfig) -> anyhow::Result<()> {
    match config.storage_backend {
        StorageBackend::Local => {
            let base_path = config
                .local_storage_path
                .clone()
                .context("LOCAL_STORAGE_PATH not configured")?;
            let base_url = config
                .local_storage_base_url
                .clone()
                .context("LOCAL_STORAGE_BASE_URL not configured")?;
            let storage =
                LocalStorage::new(base_path, config.local_storage_bucket.clone(), base_url).await?;
            storage.create_bucket().await?;
            println!("Bucket '{}' ready", config.local_storage_bucket);
        }
        StorageBackend::S3 => {
            let storage = create_storage(config).await?;
            if !storage.bucket_exists().await? {
                bail!(
                    "Bucket '{}' does not exist; create it with your S3 provider first",
                    storage.bucket()
                );
            }
            println!("Bucket '{}' reachable", storage.bucket());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = GalleryConfig::from_env().context("Failed to load configuration")?;
    config.validate()?;
    tracing::debug!(
        environment = %config.environment,
        storage_backend = %config.storage_backend,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Ingest {
            file,
            kind,
            title,
            content_type,
            thumbnail,
            uploaded_by,
        } => {
            let service = gallery_service(&config).await?;

            let mut request = IngestRequest::from_file(kind, &file);
            if let Some(name) = file.file_name() {
                request = request.with_filename(name.to_string_lossy());
            }
            if let Some(title) = title {
                request = request.with_title(title);
            }
            if let Some(content_type) = content_type {
                request = request.with_content_type(content_type);
            }
            if let Some(uploader) = uploaded_by {
                request = request.with_uploader(uploader);
            }
            if let Some(path) = thumbnail {
                let data = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("Failed to read thumbnail {}", path.display()))?;
                request = request.with_thumbnail(data);
            }

            let progress = |percent: u8, label: &str| {
                tracing::info!(percent, stage = label, "Ingest progress");
            };
            let item = service.ingest(request, &progress).await?;
            print_json(&item)?;
        }
        Commands::List { kind, json } => {
            let service = gallery_service(&config).await?;
            let items = service.list_active(kind).await?;
            if json {
                print_json(&items)?;
            } else {
                println!("{}", format_item_table(&items).trim_end());
            }
        }
        Commands::Update {
            id,
            title,
            clear_title,
            featured,
            order,
        } => {
            let service = gallery_service(&config).await?;
            let title = if clear_title { Some(None) } else { title.map(Some) };
            let patch = GalleryItemPatch {
                title,
                featured,
                order_index: order,
            };
            match service.update(id, patch).await? {
                EditOutcome::Updated(item) => print_json(&item)?,
                EditOutcome::NotFound => bail!("Gallery item {} not found", id),
            }
        }
        Commands::Retire { id } => {
            let service = gallery_service(&config).await?;
            match service.retire(id).await? {
                RetireOutcome::Retired(report) => {
                    println!(
                        "Retired {} ({} object(s) deleted, {} failed)",
                        id,
                        report.deleted_keys.len(),
                        report.failed.len()
                    );
                    for failure in &report.failed {
                        println!("  left for reconciliation: {} ({})", failure.key, failure.reason);
                    }
                }
                RetireOutcome::NotFound => println!("Gallery item {} not found or already retired", id),
            }
        }
        Commands::Quota => {
            let service = gallery_service(&config).await?;
            for kind in MediaKind::ALL {
                let status = service.quota_status(kind).await?;
                println!(
                    "{:<6} {:>3}/{:<3} ({} remaining{})",
                    kind.as_str(),
                    status.current(),
                    status.limit(),
                    status.remaining(),
                    if service.is_enabled(kind) { "" } else { ", disabled" }
                );
            }
        }
        Commands::Reconcile { dry_run, watch } => {
            let pool = connect(&config).await?;
            let storage = create_storage(&config).await?;
            let ledger = Arc::new(PostgresGalleryLedger::new(pool));
            let reconcile_config = ReconcileConfig {
                dry_run,
                ..ReconcileConfig::from_config(&config)
            };
            let reconciler = Arc::new(OrphanReconciler::new(storage, ledger, reconcile_config));

            if watch {
                reconciler.start().await?;
                return Ok(());
            }

            let report = reconciler.sweep().await?;
            println!(
                "Scanned {} object(s): {} referenced, {} within grace period, {} orphan(s){}, {} failed",
                report.scanned,
                report.referenced,
                report.too_recent,
                report.orphans.len(),
                if dry_run { " (dry run)" } else { " deleted" },
                report.failed.len()
            );
            for key in &report.orphans {
                println!("  {}", key);
            }
        }
        Commands::InitStorage => init_storage(&config).await?,
        Commands::Migrate => {
            let pool = connect(&config).await?;
            run_migrations(&pool).await?;
            println!("Migrations applied");
        }
    }

    Ok(())
}
