use crate::fetch::JenkinsSource;
use crate::refresh::{Coordinator, RefreshOptions, RefreshReport};
use nodelog_common::api::Client;
use nodelog_common::config::ConfigFile;
use nodelog_common::errors::*;
use std::future;

pub mod actor;
pub mod db;
pub mod export;
pub mod fetch;
pub mod jobs;
pub mod models;
pub mod refresh;
pub mod schema;
pub mod store;
pub mod sync;

pub use crate::store::{Storage, Store, StoreError};

/// Resolves on ctrl-c, never if the signal handler can't be installed.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {:#}", err);
        future::pending::<()>().await;
    }
}

fn log_report(report: &RefreshReport) {
    for skipped in &report.skipped {
        warn!("Skipped job {:?}: {}", skipped.job, skipped.reason);
    }
    for degraded in &report.degraded {
        warn!(
            "Build {:?} #{} stored without host ({})",
            degraded.job, degraded.number, degraded.host
        );
    }
    for failed in &report.failed_writes {
        warn!(
            "Failed to write build {:?} #{}: {}",
            failed.job, failed.number, failed.reason
        );
    }
    if let Some(err) = &report.commit_error {
        error!("Refresh was not committed: {}", err);
    }
}

/// Refresh all tracked jobs on an interval until interrupted.
pub async fn run_daemon(config: ConfigFile, client: Client, once: bool) -> Result<()> {
    let store_path = config.store.path();
    let interval = config.refresh.interval();
    let update_existing = config.refresh.update_existing();

    let source = JenkinsSource::new(client, config.refresh.host_concurrency());
    let options = RefreshOptions::from(&config.refresh);
    let coordinator = Coordinator::new(&store_path, source, options);
    info!("Refreshing {:?} every {}s", store_path, interval.as_secs());

    loop {
        match coordinator
            .refresh_until(update_existing, shutdown_signal())
            .await
        {
            Ok(report) => {
                log_report(&report);
                if report.cancelled {
                    info!("Interrupted, shutting down");
                    break;
                }
            }
            Err(err) if once => {
                return Err(err).context("Refresh failed");
            }
            Err(err) => {
                error!("Refresh failed: {:#}", Error::from(err));
            }
        }

        if once {
            break;
        }

        debug!("Sleeping for {}s until the next refresh", interval.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(interval) => (),
            _ = shutdown_signal() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    Ok(())
}
