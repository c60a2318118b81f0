use clap::Parser;
use pointbridge::{
    Bridge, Config, MemoryModel, MemoryStore, NotificationSource, RedisStore, Store,
    load_point_map,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Keep a key-value store and a data-point model in sync", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Run against an in-process store instead of Redis
    #[arg(long)]
    memory_store: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Bridge failed: {}", e);
        eprintln!("pointbridge: {}", e);
        std::process::exit(1);
    }

    info!("Shutdown complete");
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_file(&args.config)?;
    info!("Starting point bridge");

    let records = load_point_map(&config.bridge.point_map)?;
    info!(
        "Read {} store-originated points from {:?}",
        records.len(),
        config.bridge.point_map
    );

    let model = Arc::new(MemoryModel::load(&config.bridge.model_file)?);

    if args.memory_store {
        info!("Using in-process store");
        serve(&config, &records, Arc::new(MemoryStore::new()), model).await
    } else {
        let store = Arc::new(RedisStore::open(&config.store)?);
        serve(&config, &records, store, model).await
    }
}

async fn serve<S>(
    config: &Config,
    records: &[pointbridge::PointRecord],
    store: Arc<S>,
    model: Arc<MemoryModel>,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: Store + NotificationSource + 'static,
{
    let bridge = Bridge::new(records, store, Arc::clone(&model))
        .with_reconnect_backoff(config.store.reconnect_backoff());
    model.set_listener(bridge.relay());
    info!("Write-back relay registered with the model");

    info!("Bridge running. Press Ctrl+C to stop.");
    bridge
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Cannot listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down...");
        })
        .await?;

    Ok(())
}
