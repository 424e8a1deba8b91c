use anyhow::{Context, Result};
use shoaldns::config::Config;
use shoaldns::error::Error;
use shoaldns::node::Node;
use shoaldns::persistence::Persistence;
use shoaldns::store::Store;
use shoaldns::sync::Replicator;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let config = Arc::new(Config::from_env()?);
    tracing::info!("node id {}", &config.node_id);

    let persist = Persistence::open(&config.db_path, &config.migrations_dir)
        .await
        .context("open persistence")?;
    let store = Store::new();
    persist
        .load_all(&store)
        .await
        .context("restore state from database")?;

    let replicator = Replicator::new(&config)?;
    let node = Node::new(config.clone(), store.clone(), persist, replicator);

    tracing::info!("DNS listening on UDP {}", &config.dns_udp_listen);
    tracing::info!("DNS listening on TCP {}", &config.dns_tcp_listen);
    let dns_server = shoaldns::dns::server::new(config.clone(), store).await?;
    let mut dns_handle = tokio::spawn(dns_server.block_until_done());

    tracing::info!("HTTP listening on {}", &config.http_listen);
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    let api_server = shoaldns::api::server::new(node, async move {
        let _ = shutdown_rx.changed().await;
    });
    let mut api_handle = tokio::spawn(api_server);

    tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("shutting down on signal");
            let _ = shutdown_tx.send(true);
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut api_handle).await.is_err() {
                tracing::warn!("HTTP drain exceeded grace period");
                api_handle.abort();
            }
            dns_handle.abort();
        },
        dns_res = &mut dns_handle => {
            dns_res.context("dns server task")?.map_err(Error::Dns)?;
        },
        api_res = &mut api_handle => {
            api_res.context("api server task")??;
        },
    }
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shoaldns=info".into()),
        )
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
