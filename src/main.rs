use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epg_merger::{
    config::Config,
    database::Database,
    ingestor::{EpgIngestor, JobStatusTracker, SchedulerService},
    services::MergeService,
    storage::EpgFileStorage,
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "epg-merger")]
#[command(version)]
#[command(about = "Fetches XMLTV guides from several sources and merges them into combined EPG files")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("epg_merger={},tower_http=trace", cli.log_level)
    } else {
        format!("epg_merger={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting EPG Merger v{}", env!("CARGO_PKG_VERSION"));

    std::env::set_var("CONFIG_FILE", &cli.config);
    let mut config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    let database = Database::json_file(&config.storage.state_file);
    database.migrate().await?;
    let registry = database.snapshot().await?;
    info!(
        "Loaded {} sources and {} EPG files from {}",
        registry.sources.len(),
        registry.outputs.len(),
        config.storage.state_file.display()
    );

    let storage = EpgFileStorage::new(&config.storage.epg_files_path);
    storage.ensure_storage_dir().await?;

    let state_manager = JobStatusTracker::new();
    let fetcher = EpgIngestor::new(&config.fetch)?;
    let merge_service = Arc::new(MergeService::new(
        database.clone(),
        Arc::new(fetcher),
        storage,
        state_manager,
        config.generator.clone(),
    ));

    let scheduler = Arc::new(SchedulerService::new(
        merge_service.clone(),
        database.clone(),
    ));
    scheduler.start_if_configured().await?;

    let web_server = WebServer::new(AppState {
        config,
        database,
        merge_service,
        scheduler,
    })?;

    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );
    web_server.serve().await?;

    Ok(())
}
