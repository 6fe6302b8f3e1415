use crate::store::{Storage, Store};
use nodelog_common::errors::*;
use nodelog_common::Job;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    NotFound,
    AlreadyTracked,
    Added,
    Failed(String),
}

impl fmt::Display for TrackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackOutcome::NotFound => write!(f, "not found on server"),
            TrackOutcome::AlreadyTracked => write!(f, "already tracked"),
            TrackOutcome::Added => write!(f, "added"),
            TrackOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Start tracking the jobs named in `names`, looked up in `remote`.
///
/// Jobs are immutable once stored, a name that's already tracked is left alone.
pub fn track_jobs<S: Storage>(
    store: &mut S,
    remote: &[Job],
    names: &[String],
) -> Vec<(String, TrackOutcome)> {
    names
        .iter()
        .map(|name| {
            let outcome = track_job(store, remote, name);
            match &outcome {
                TrackOutcome::Added => info!("Tracking job {:?}", name),
                TrackOutcome::Failed(reason) => error!("Failed to track {:?}: {}", name, reason),
                other => debug!("Not tracking {:?}: {}", name, other),
            }
            (name.clone(), outcome)
        })
        .collect()
}

fn track_job<S: Storage>(store: &mut S, remote: &[Job], name: &str) -> TrackOutcome {
    let Some(job) = remote.iter().find(|job| job.name == name) else {
        return TrackOutcome::NotFound;
    };

    match store.get_job(name) {
        Ok(Some(_)) => return TrackOutcome::AlreadyTracked,
        Ok(None) => (),
        Err(err) => return TrackOutcome::Failed(format!("{:#}", Error::from(err))),
    }

    match store.put_job(job) {
        Ok(()) => TrackOutcome::Added,
        Err(err) => TrackOutcome::Failed(format!("{:#}", Error::from(err))),
    }
}

/// Names of the tracked jobs in the store at `path`.
///
/// A store that doesn't exist yet tracks nothing and is not created.
pub fn tracked_names(path: &Path) -> Result<BTreeSet<String>> {
    if !path.exists() {
        debug!("No store at {:?}, nothing is tracked yet", path);
        return Ok(BTreeSet::new());
    }
    let mut store =
        Store::open(path).with_context(|| anyhow!("Failed to open store at {:?}", path))?;
    let names = store
        .list_jobs()?
        .into_iter()
        .map(|job| job.name)
        .collect();
    Ok(names)
}
