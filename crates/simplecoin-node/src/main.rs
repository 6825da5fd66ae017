use anyhow::Context;
use clap::Parser;
use simplecoin_core::chain::Chain;
use simplecoin_node::{
    api::{self, AppState},
    broadcast::Broadcaster,
    config::NodeConfig,
    constants::SEND_TIMEOUT,
    ingest,
};
use simplecoin_storage::{load_peers, JsonFileStore};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "simplecoin-node")]
#[command(about = "Single-ledger proof-of-work node")]
struct Args {
    /// JSON config file
    #[arg(long, default_value = "configs/node_config.json")]
    config: PathBuf,

    /// Operator API address, e.g. 127.0.0.1:8080 (overrides the config file)
    #[arg(long)]
    api_listen: Option<String>,

    /// Peer listener port (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Proof-of-work difficulty in leading zero hex digits (overrides the config file)
    #[arg(long)]
    difficulty: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = NodeConfig::load(&args.config)?;
    if let Some(api_listen) = args.api_listen {
        config.api_listen = api_listen;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(difficulty) = args.difficulty {
        config.difficulty = difficulty;
    }
    config.validate()?;

    let store = Arc::new(JsonFileStore::open(&config.blockchain_file)?);
    let chain = Chain::open(store, config.chain_params())
        .with_context(|| format!("cannot start from {}", config.blockchain_file))?;
    info!(
        node_id = %config.node_id,
        height = chain.tip().index,
        difficulty = config.difficulty,
        "chain ready"
    );

    let peers = load_peers(&config.peers_file, config.port)?;
    info!("{} peer(s) configured", peers.len());
    let broadcaster = Broadcaster::new(peers, SEND_TIMEOUT);

    let (_peer_addr, peer_task) = ingest::spawn_listener(&config.listen_addr(), chain.clone())
        .await
        .with_context(|| format!("binding peer listener on {}", config.listen_addr()))?;

    let app = api::router(AppState { chain, broadcaster });
    let api_listener = tokio::net::TcpListener::bind(&config.api_listen)
        .await
        .with_context(|| format!("binding operator api on {}", config.api_listen))?;
    info!("simplecoin-node operator api on http://{}", config.api_listen);
    axum::serve(api_listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    peer_task.abort();
    Ok(())
}
