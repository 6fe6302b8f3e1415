use crate::actor::{self, StoreHandle, WriteFailure};
use crate::db::StoreLock;
use crate::fetch::BuildSource;
use crate::store::{Storage, Store, StoreError};
use crate::sync::{self, KnownBuilds};
use nodelog_common::config::RefreshConfig;
use nodelog_common::errors::*;
use nodelog_common::Job;
use std::collections::BTreeSet;
use std::future::{self, Future};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Jobs refreshed at the same time
    pub concurrency: usize,
    /// Capacity of each store actor channel
    pub channel_capacity: usize,
}

impl Default for RefreshOptions {
    fn default() -> RefreshOptions {
        RefreshOptions::from(&RefreshConfig::default())
    }
}

impl From<&RefreshConfig> for RefreshOptions {
    fn from(config: &RefreshConfig) -> RefreshOptions {
        RefreshOptions {
            concurrency: config.concurrency(),
            channel_capacity: config.channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedJob {
    pub job: String,
    pub reason: String,
}

/// A build that was written with a placeholder host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedBuild {
    pub job: String,
    pub number: i32,
    pub host: String,
}

#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Jobs that were refreshed without errors
    pub jobs: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: Vec<SkippedJob>,
    pub degraded: Vec<DegradedBuild>,
    pub failed_reads: Vec<String>,
    pub failed_writes: Vec<WriteFailure>,
    pub commit_error: Option<String>,
    pub cancelled: bool,
}

impl RefreshReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
            && self.degraded.is_empty()
            && self.failed_reads.is_empty()
            && self.failed_writes.is_empty()
            && self.commit_error.is_none()
            && !self.cancelled
    }
}

pub struct Coordinator<B> {
    store_path: PathBuf,
    source: Arc<B>,
    options: RefreshOptions,
}

impl<B: BuildSource> Coordinator<B> {
    pub fn new<P: Into<PathBuf>>(store_path: P, source: B, options: RefreshOptions) -> Self {
        Coordinator {
            store_path: store_path.into(),
            source: Arc::new(source),
            options,
        }
    }

    pub async fn refresh(&self, update_existing: bool) -> Result<RefreshReport, StoreError> {
        self.refresh_until(update_existing, future::pending()).await
    }

    /// Refresh all tracked jobs, stop early once `shutdown` resolves.
    ///
    /// Builds that were already handed to the store are committed in
    /// either case.
    pub async fn refresh_until<F>(
        &self,
        update_existing: bool,
        shutdown: F,
    ) -> Result<RefreshReport, StoreError>
    where
        F: Future<Output = ()>,
    {
        let lock = StoreLock::acquire(&self.store_path)?;
        let store = Store::open(&self.store_path)?;
        let report = run_refresh(
            store,
            self.source.clone(),
            &self.options,
            update_existing,
            shutdown,
        )
        .await;
        debug!("Releasing store lock {:?}", lock.path());
        report
    }
}

struct JobResult {
    job: String,
    result: Result<Vec<DegradedBuild>>,
}

async fn refresh_job<B: BuildSource>(
    source: &B,
    store: &StoreHandle,
    job: &Job,
    update_existing: bool,
) -> Result<Vec<DegradedBuild>> {
    let fetched = source
        .fetch_builds(job)
        .await
        .with_context(|| anyhow!("Failed to fetch builds of {:?}", job.name))?;

    let stored = store.get_builds(&job.name).await?;
    let known = KnownBuilds::from_stored(&stored);
    let puts = sync::plan(fetched, &known, update_existing);
    debug!(
        "Job {:?}: {} builds stored, {} writes queued",
        job.name,
        known.len(),
        puts.len()
    );

    let mut degraded = Vec::new();
    for put in puts {
        if !put.build.has_host() {
            degraded.push(DegradedBuild {
                job: put.build.job.clone(),
                number: put.build.number,
                host: put.build.host.clone(),
            });
        }
        store.put(put).await?;
    }

    Ok(degraded)
}

/// One refresh cycle against an already opened storage.
pub async fn run_refresh<S, B, F>(
    mut storage: S,
    source: Arc<B>,
    options: &RefreshOptions,
    update_existing: bool,
    shutdown: F,
) -> Result<RefreshReport, StoreError>
where
    S: Storage,
    B: BuildSource,
    F: Future<Output = ()>,
{
    let jobs = storage.list_jobs()?;
    info!("Refreshing {} tracked jobs", jobs.len());

    let (store, finished) = actor::spawn(storage, options.channel_capacity.max(1))?;
    let sem = Arc::new(Semaphore::new(options.concurrency.max(1)));

    let mut pending = BTreeSet::new();
    let mut set = JoinSet::new();
    for job in jobs {
        pending.insert(job.name.clone());
        let sem = sem.clone();
        let store = store.clone();
        let source = source.clone();
        set.spawn(async move {
            let result = match sem.acquire().await {
                Ok(_permit) => refresh_job(source.as_ref(), &store, &job, update_existing).await,
                Err(err) => Err(err.into()),
            };
            JobResult {
                job: job.name,
                result,
            }
        });
    }
    // workers hold the only remaining handles, the actor starts draining once they're done
    drop(store);

    let mut report = RefreshReport::default();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            joined = set.join_next() => match joined {
                Some(Ok(JobResult { job, result })) => {
                    pending.remove(&job);
                    match result {
                        Ok(degraded) => {
                            report.jobs += 1;
                            report.degraded.extend(degraded);
                        }
                        Err(err) => {
                            error!("Skipping job {:?}: {:#}", job, err);
                            report.skipped.push(SkippedJob {
                                job,
                                reason: format!("{:#}", err),
                            });
                        }
                    }
                }
                Some(Err(err)) if err.is_panic() => {
                    error!("Refresh worker panicked: {}", err);
                }
                Some(Err(_)) => (),
                None => break,
            },
            _ = &mut shutdown, if !report.cancelled => {
                warn!("Refresh interrupted, aborting {} remaining jobs", set.len());
                report.cancelled = true;
                set.abort_all();
            }
        }
    }

    // jobs that never reported back were either aborted or panicked
    let reason = if report.cancelled {
        "Refresh was cancelled"
    } else {
        "Refresh worker panicked"
    };
    for job in pending {
        report.skipped.push(SkippedJob {
            job,
            reason: reason.to_string(),
        });
    }

    let summary = finished.wait().await?;
    report.inserted = summary.inserted;
    report.updated = summary.updated;
    report.failed_reads = summary.failed_reads;
    report.failed_writes = summary.failed_writes;
    report.commit_error = summary.commit_error;

    info!(
        "Refreshed {} jobs: {} builds added, {} updated, {} jobs skipped",
        report.jobs,
        report.inserted,
        report.updated,
        report.skipped.len()
    );
    Ok(report)
}
