use std::sync::Arc;

use shunpo::lcu::LcuConnector;
use shunpo::{AppError, Config, Orchestrator, Update, logging};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[tokio::main]
async fn main() {
    logging::init();

    info!("🥷 Starting...");

    if let Err(e) = run().await {
        error!(error = %e, "🥷 ❌ Fatal error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let client = Arc::new(LcuConnector::new(events_tx)?);
    tokio::spawn(client.metrics().log_loop());

    let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();
    let (orchestrator, handle) = Orchestrator::new(
        config.timings,
        config.connect.clone(),
        client,
        events_rx,
        updates_tx,
    );
    let orchestrator = orchestrator.start();

    match &config.watch_username {
        Some(username) => handle.watch(username.as_str()).await?,
        None => warn!("🥷 SHUNPO_WATCH_USERNAME not set, waiting for login requests"),
    }

    loop {
        tokio::select! {
            update = updates_rx.recv() => match update {
                Some(Update::SnapshotUpdated { username, snapshot }) => info!(
                    %username,
                    summoner = %snapshot.summoner_name,
                    solo = ?snapshot.solo_queue_rank.as_ref().map(|r| format!("{} {}", r.tier, r.division)),
                    flex = ?snapshot.flex_queue_rank.as_ref().map(|r| format!("{} {}", r.tier, r.division)),
                    champions = snapshot.owned_champions.len(),
                    "🥷 Snapshot received"
                ),
                Some(Update::ConnectionTimeout { username, attempts }) => {
                    warn!(%username, attempts, "🥷 ⚠️ Gave up waiting for the client")
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("🥷 Shutting down");
                break;
            }
        }
    }

    drop(handle);
    if let Err(e) = orchestrator.await {
        warn!(error = %e, "🥷 ⚠️ Orchestrator task ended abnormally");
    }

    Ok(())
}
