use anyhow::Context;
use clap::Parser;
use sharded_kv::api::{Forwarder, ShardServer};
use sharded_kv::config::Config;
use sharded_kv::replication::{HttpLeaderClient, Replicator};
use sharded_kv::sharding::Topology;
use sharded_kv::storage::Database;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Notify, watch};

#[derive(Debug, Parser)]
#[command(name = "sharded-kv", about = "Statically sharded key-value node")]
struct Args {
    /// Path to the redb database file.
    #[arg(long)]
    db_location: PathBuf,

    /// HTTP address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    http_addr: SocketAddr,

    /// TOML file describing the static sharding.
    #[arg(long, default_value = "sharding.toml")]
    config_file: PathBuf,

    /// Name of the shard this node serves.
    #[arg(long)]
    shard: String,

    /// Run as a read-only replica of the shard's leader.
    #[arg(long)]
    replica: bool,

    /// Log at debug level.
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    // 1. Static topology:
    let config = Config::load(&args.config_file)
        .with_context(|| format!("loading {}", args.config_file.display()))?;
    let topology = Arc::new(
        Topology::build(&config.shards, &args.shard).context("invalid shard topology")?,
    );
    tracing::info!(
        "Shard count is {}, current shard index: {}",
        topology.shard_count(),
        topology.current_index()
    );

    // 2. Storage layer:
    let db = Arc::new(
        Database::open(&args.db_location, args.replica)
            .with_context(|| format!("opening database {}", args.db_location.display()))?,
    );
    tracing::info!(
        "Opened {} with {} keys, {} pending replication",
        args.db_location.display(),
        db.primary_len()?,
        db.outbox_len()?
    );

    // 3. Replication (replicas only):
    let (stop_tx, stop_rx) = watch::channel(false);
    let replication_failed = Arc::new(Notify::new());
    let replication = if args.replica {
        let leader_addr = topology
            .current_address()
            .context("no leader address for the current shard")?;
        tracing::info!("Running as replica of {}", leader_addr);

        let client = HttpLeaderClient::new(leader_addr, config.peer.request_timeout())?;
        let replicator = Replicator::new(db.clone(), client, &config.replication);
        let failed = replication_failed.clone();
        Some(tokio::spawn(async move {
            let result = replicator.run(stop_rx).await;
            if result.is_err() {
                failed.notify_one();
            }
            result
        }))
    } else {
        None
    };

    // 4. HTTP router:
    let forwarder = Forwarder::new(config.peer.request_timeout())?;
    let app = ShardServer::new(db.clone(), topology.clone(), forwarder).router();

    // 5. Start HTTP server:
    tracing::info!("HTTP server listening on {}", args.http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(args.http_addr)
        .await
        .with_context(|| format!("binding {}", args.http_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        tracing::error!("Failed to listen for shutdown signal: {}", e);
                    }
                }
                _ = replication_failed.notified() => {
                    tracing::error!("Replication stopped on a fatal error");
                }
            }
            tracing::info!("Shutting down");
        })
        .await?;

    // 6. Stop replication:
    let _ = stop_tx.send(true);
    if let Some(handle) = replication {
        handle.await?.context("replication loop failed")?;
    }

    Ok(())
}
