//! tierstore CLI
//!
//! Operator access to the tiered entity store.
//!
//! # Usage
//!
//! ```bash
//! # Look up an entity
//! tierstore get 665f1c2a9b3e4d0012ab34cd
//!
//! # Create an entity
//! tierstore create admin "on-call lead"
//!
//! # Change its description
//! tierstore edit 665f1c2a9b3e4d0012ab34cd "secondary on-call"
//!
//! # Without a Redis server
//! tierstore --memory-cache get 665f1c2a9b3e4d0012ab34cd
//! ```
//!
//! Configuration comes from `TIERSTORE_*` environment variables (a `.env`
//! file is loaded if present).

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tierstore::{
    CacheClient, Clock, EntityRepository, InMemoryEntityRepository, MemoryCacheClient,
    RedisCacheClient, ServiceError, StorageFactory, StoreConfig, SystemClock, TieredOrchestrator,
};

#[derive(Parser)]
#[command(name = "tierstore")]
#[command(about = "Tiered entity store CLI", long_about = None)]
struct Cli {
    /// Use an in-process cache instead of Redis
    #[arg(long)]
    memory_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up an entity by id
    Get {
        id: String,
    },
    /// Create an entity
    Create {
        /// "admin" for an admin, anything else for a regular user
        role: String,
        description: String,
    },
    /// Edit an entity's description
    Edit {
        id: String,
        /// New description; omit to rewrite the entity unchanged
        description: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = StoreConfig::from_env().context("invalid configuration")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let cache_client: Arc<dyn CacheClient> = if cli.memory_cache {
        Arc::new(MemoryCacheClient::new(
            config.cache.memory_max_capacity,
            Arc::clone(&clock),
        ))
    } else {
        Arc::new(
            RedisCacheClient::connect(&config.redis)
                .await
                .map_err(|e| anyhow::anyhow!(e))
                .context("failed to connect to Redis")?,
        )
    };

    let repository = repository(&config).await?;
    let factory = StorageFactory::new(config, cache_client, repository, clock);
    let orchestrator = TieredOrchestrator::new(&factory).await?;

    let outcome = match cli.command {
        Commands::Get { id } => orchestrator.lookup(&id).await.ok_or(ServiceError::NotFound),
        Commands::Create { role, description } => {
            orchestrator.create(&role, &description).await
        }
        Commands::Edit { id, description } => {
            orchestrator.edit(&id, description.as_deref()).await
        }
    };

    match outcome {
        Ok(entity) => println!("{}", serde_json::to_string_pretty(&entity)?),
        Err(ServiceError::NotFound) => {
            eprintln!("not found");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

#[cfg(feature = "postgres")]
async fn repository(config: &StoreConfig) -> anyhow::Result<Arc<dyn EntityRepository>> {
    if config.database.url.is_some() {
        let repo = tierstore::PgEntityRepository::connect(&config.database)
            .await
            .map_err(|e| anyhow::anyhow!(e))
            .context("failed to connect to the database")?;
        return Ok(Arc::new(repo));
    }
    tracing::warn!("TIERSTORE_DATABASE_URL not set; using an in-memory authoritative tier");
    Ok(Arc::new(InMemoryEntityRepository::new()))
}

#[cfg(not(feature = "postgres"))]
async fn repository(config: &StoreConfig) -> anyhow::Result<Arc<dyn EntityRepository>> {
    if config.database.url.is_some() {
        tracing::warn!("built without the postgres feature; ignoring TIERSTORE_DATABASE_URL");
    }
    Ok(Arc::new(InMemoryEntityRepository::new()))
}
