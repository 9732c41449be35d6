//! Daemon lifecycle
//!
//! Validate options, build the Bridge, connect, run the initial sync, then
//! react to file events and timers until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use registrator_core::config::local_host_identity;
use registrator_core::{AdapterRegistry, Bridge, DaemonOptions, SyncReport};

use crate::error::{CliError, Result};
use crate::watch::{DirWatcher, FileAction, classify};

/// Run the daemon until SIGINT/SIGTERM.
pub async fn run(options: DaemonOptions) -> Result<()> {
    options.validate()?;
    if !options.config_dir.is_dir() {
        return Err(CliError::user(format!(
            "config directory {} does not exist",
            options.config_dir.display()
        )));
    }

    let adapters = AdapterRegistry::new();
    registrator_consul::register(&adapters);

    let host = local_host_identity()?;
    let bridge = Arc::new(Bridge::new(
        &options.registry_uri,
        options.bridge_config(host),
        &adapters,
    )?);

    bridge.connect(&options.retry_policy()).await?;
    info!("connected to registry");

    let report = bridge.sync(false).await?;
    log_report("initial sync", &report);

    let cancel = CancellationToken::new();
    let tasks = start(&bridge, &options, &cancel)?;

    shutdown_signal().await;
    info!("shutting down");
    cancel.cancel();
    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "background task ended abnormally");
        }
    }
    Ok(())
}

/// Spawn the watcher and the optional timers.
pub fn start(
    bridge: &Arc<Bridge>,
    options: &DaemonOptions,
    cancel: &CancellationToken,
) -> Result<Vec<JoinHandle<()>>> {
    let root = bridge.config().config_dir.clone();
    let watcher = DirWatcher::new(&root).map_err(|source| CliError::Watch {
        path: root.clone(),
        source,
    })?;
    info!(dir = %root.display(), "watching definitions");

    let mut tasks = vec![tokio::spawn(watch_loop(
        Arc::clone(bridge),
        watcher,
        cancel.clone(),
    ))];

    if let Some(period) = options.resync_interval() {
        let bridge = Arc::clone(bridge);
        tasks.push(tokio::spawn(every(period, cancel.clone(), move || {
            let bridge = Arc::clone(&bridge);
            async move {
                match bridge.sync(true).await {
                    Ok(report) => log_report("resync", &report),
                    Err(e) => error!(error = %e, "resync failed"),
                }
            }
        })));
    }

    if let Some(period) = options.refresh_interval() {
        let bridge = Arc::clone(bridge);
        tasks.push(tokio::spawn(every(period, cancel.clone(), move || {
            let bridge = Arc::clone(&bridge);
            async move {
                let refreshed = bridge.refresh().await;
                debug!(refreshed, "TTL refresh");
            }
        })));
    }

    Ok(tasks)
}

/// Apply one file action to the Bridge.
pub async fn dispatch(bridge: &Bridge, action: FileAction) {
    match action {
        FileAction::Add(path) => {
            bridge.add(&path).await;
        }
        FileAction::Remove(path) => {
            bridge.remove(&path).await;
        }
        FileAction::Change(path) => {
            bridge.apply_change(&path).await;
        }
    }
}

async fn watch_loop(bridge: Arc<Bridge>, mut watcher: DirWatcher, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = watcher.next_event() => match event {
                Some(Ok(event)) => {
                    for action in classify(&event, |path| path.exists()) {
                        if bridge.is_definition_file(action.path()) {
                            debug!(?action, "file event");
                            dispatch(&bridge, action).await;
                        }
                    }
                }
                Some(Err(e)) => warn!(error = %e, "watch error"),
                None => break,
            },
        }
    }
    debug!("watcher stopped");
}

async fn every<F, Fut>(period: Duration, cancel: CancellationToken, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => tick().await,
        }
    }
}

fn log_report(pass: &str, report: &SyncReport) {
    info!(
        pass,
        files = report.files,
        added = report.added,
        reasserted = report.reasserted,
        invalid = report.invalid,
        failed = report.failed,
        pruned = report.pruned,
        dangling = report.dangling.len(),
        "sync complete"
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
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
