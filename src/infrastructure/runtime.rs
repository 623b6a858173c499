//! Engine runtime lifecycle.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::infrastructure::bootstrap::{build_engine, build_poller};
use crate::infrastructure::config::settings::Config;
use crate::application::scheduler::JobHandler;
use crate::port::RaceApi;

/// Run until Ctrl-C.
///
/// # Errors
///
/// Startup failures; see [`run_with_shutdown`].
pub async fn run(config: Config) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        let _ = shutdown_tx.send(true);
    });
    run_with_shutdown(config, shutdown_rx).await
}

/// Run with externally controlled shutdown signal.
///
/// Recovers in-flight tracks from storage, seeds the lobby, then runs the
/// job worker, the rate poller and the overdue-track sweep until `shutdown`
/// flips to true.
///
/// # Errors
///
/// Fails if the engine cannot be built or recovery cannot read storage.
pub async fn run_with_shutdown(config: Config, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    info!(
        storage = ?config.storage,
        chain = ?config.chain.mode,
        bots = config.bots.len(),
        "Starting racetrack"
    );

    let engine = build_engine(&config)?;
    let poller = build_poller(&config, &engine);
    let coordinator = engine.coordinator;

    let worker = tokio::spawn(
        engine
            .queue
            .run(Arc::clone(&coordinator) as Arc<dyn JobHandler>, shutdown.clone()),
    );
    let poller = poller.map(|p| tokio::spawn(p.run(shutdown.clone())));

    coordinator.recover().await?;
    match coordinator.get_tracks().await {
        Ok(tracks) => info!(tracks = tracks.len(), "Lobby seeded"),
        Err(e) => warn!(error = %e, "Lobby seeding failed"),
    }

    let mut sweep = tokio::time::interval(config.race.sweep_interval());
    sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            result = shutdown.changed() => {
                match result {
                    Ok(()) => {
                        if *shutdown.borrow() {
                            info!("Shutdown signal received");
                            break;
                        }
                    }
                    Err(_) => {
                        info!("Shutdown channel closed");
                        break;
                    }
                }
            }
            _ = sweep.tick() => {
                match coordinator.sweep().await {
                    Ok(0) => {}
                    Ok(n) => info!(finalized = n, "Sweep finalized overdue tracks"),
                    Err(e) => error!(error = %e, "Sweep failed"),
                }
            }
        }
    }

    if let Err(e) = worker.await {
        warn!(error = %e, "Job worker ended abnormally");
    }
    if let Some(handle) = poller {
        if let Err(e) = handle.await {
            warn!(error = %e, "Rate poller ended abnormally");
        }
    }
    info!("racetrack stopped");
    Ok(())
}
