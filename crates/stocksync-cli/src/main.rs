mod feed;
mod sync;
mod track;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use stocksync_core::AppConfig;
use stocksync_feed::FeedCache;
use stocksync_updater::{EngineSettings, SyncEngine};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stocksync-cli")]
#[command(about = "Supplier stock sync command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one sync cycle over every supplier-stocked product
    Sync,
    /// Reconcile a single product against the supplier feed
    Product {
        /// Catalog id of the product or variation
        id: i64,
    },
    /// Inspect the supplier feed
    Feed {
        #[command(subcommand)]
        command: FeedCommands,
    },
    /// List recent sync runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Opt a product in to supplier stock sync
    Track {
        id: i64,
        /// SKU to look up in the feed instead of the product's own SKU
        #[arg(long)]
        supplier_sku: Option<String>,
        /// Minimum supplier quantity that allows backorders for this product
        #[arg(long)]
        threshold: Option<u32>,
    },
    /// Opt a product out of supplier stock sync
    Untrack {
        id: i64,
        /// Also remove the supplier SKU and threshold overrides
        #[arg(long)]
        clear: bool,
    },
    /// Apply pending database migrations
    Migrate,
}

#[derive(Debug, Subcommand)]
enum FeedCommands {
    /// Download the feed and list its entries
    Show {
        /// Maximum number of entries to print
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Download the feed and print parse statistics
    Stats,
    /// Parse a local CSV export and print a data-loss diagnosis
    Inspect { path: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("stocksync-cli: run with --help to list commands");
        return Ok(());
    };

    // Local inspection needs neither configuration nor network access.
    if let Commands::Feed {
        command: FeedCommands::Inspect { path },
    } = &command
    {
        init_tracing("warn")?;
        return feed::run_feed_inspect(path);
    }

    let config = stocksync_core::load_app_config()?;
    init_tracing(&config.log_level)?;

    match command {
        Commands::Feed { command } => {
            let cache = FeedCache::from_config(&config)?;
            match command {
                FeedCommands::Show { limit } => {
                    feed::run_feed_show(&cache, limit).await;
                    Ok(())
                }
                FeedCommands::Stats => feed::run_feed_stats(&cache).await,
                FeedCommands::Inspect { path } => feed::run_feed_inspect(&path),
            }
        }
        Commands::Sync => {
            let pool = connect(&config).await?;
            let engine = build_engine(&config, pool.clone())?;
            sync::run_sync(&pool, &engine).await
        }
        Commands::Product { id } => {
            let pool = connect(&config).await?;
            let engine = build_engine(&config, pool)?;
            sync::run_product_sync(&engine, id).await
        }
        Commands::Runs { limit } => {
            let pool = connect(&config).await?;
            sync::run_list_runs(&pool, limit).await
        }
        Commands::Track {
            id,
            supplier_sku,
            threshold,
        } => {
            let pool = connect(&config).await?;
            track::run_track(&pool, id, supplier_sku.as_deref(), threshold).await
        }
        Commands::Untrack { id, clear } => {
            let pool = connect(&config).await?;
            track::run_untrack(&pool, id, clear).await
        }
        Commands::Migrate => {
            let pool = connect(&config).await?;
            let applied = stocksync_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
            Ok(())
        }
    }
}

fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = stocksync_db::PoolConfig::from_app_config(config);
    Ok(stocksync_db::connect_pool(&config.database_url, pool_config).await?)
}

fn build_engine(config: &AppConfig, pool: sqlx::PgPool) -> anyhow::Result<SyncEngine> {
    let feed = Arc::new(FeedCache::from_config(config)?);
    Ok(SyncEngine::new(
        Arc::new(stocksync_db::PgCatalog::new(pool)),
        feed,
        EngineSettings::from_config(config),
    ))
}
