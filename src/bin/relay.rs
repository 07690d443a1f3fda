//! pushrelay server
//!
//! Serves the device registry and outbound push API, and drains upstream
//! gateway traffic delivered by the connection bridge.

use anyhow::{bail, Context};
use clap::Parser;
use pushrelay::config::{
    load_config, load_config_with_path, validate_config, Config, LogFormat, StorageBackendType,
};
use pushrelay::gateway::{inbound_channel, BridgeXmppClient, GatewayListener, GcmHttpClient};
use pushrelay::registry::{init_pool, migrations, ClientStore, MemoryClientStore, PgClientStore, Registry};
use pushrelay::relay::{Dispatcher, LiveFeed, OutboundSender};
use pushrelay::server::{serve, AppState};
use pushrelay::VERSION;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pushrelay",
    version = VERSION,
    about = "Relay between a push-notification gateway and a device registry",
    long_about = None
)]
struct Args {
    /// Config file (json, json5 or toml)
    #[arg(long, short, env = "PUSHRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind the HTTP server to
    #[arg(long)]
    bind: Option<String>,

    /// Port to bind the HTTP server to
    #[arg(long, short)]
    port: Option<u16>,

    /// Validate configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            load_config_with_path(path)?
        }
        None => load_config()?,
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(&config);

    let validation = validate_config(&config);
    for warning in &validation.warnings {
        warn!("Config: {}", warning);
    }
    if !validation.valid {
        for issue in &validation.errors {
            error!("Config: {}", issue);
        }
        bail!("Invalid configuration ({} errors)", validation.errors.len());
    }
    if args.check {
        info!("Configuration OK");
        return Ok(());
    }

    info!("Starting pushrelay v{}", VERSION);

    let registry = Registry::new(build_store(&config).await?);
    info!(backend = registry.backend(), "Registry ready");

    let http = Arc::new(GcmHttpClient::new(&config.gateway)?);
    let xmpp = Arc::new(BridgeXmppClient::new(&config.gateway)?);
    let live = LiveFeed::new();

    let dispatcher = Dispatcher::new(
        registry.clone(),
        xmpp.clone(),
        live.clone(),
        Duration::from_secs(config.gateway.ack_timeout_secs),
    );
    let (inbound, inbound_rx) = inbound_channel(config.gateway.inbound_buffer);
    let listener = GatewayListener::spawn(inbound_rx, dispatcher);

    let state = AppState {
        registry,
        sender: OutboundSender::new(http, xmpp),
        live,
        inbound,
        bridge_secret: config.gateway.bridge_secret.clone(),
    };

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let tcp = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    serve(tcp, state, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped, draining gateway listener");
    listener.shutdown().await;
    info!("pushrelay stopped");

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    match config.log.format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn ClientStore>> {
    match config.storage.backend {
        StorageBackendType::Memory => Ok(Arc::new(MemoryClientStore::new())),
        StorageBackendType::Postgres => {
            let pg = config
                .storage
                .postgres
                .as_ref()
                .context("storage.postgres is required for the postgres backend")?;
            let pool = init_pool(pg)
                .await
                .context("Failed to connect to PostgreSQL")?;
            migrations::run(&pool).await?;
            Ok(Arc::new(PgClientStore::new(pool)))
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for ctrl-c: {}", e),
    }
}
