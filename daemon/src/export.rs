use crate::store::Store;
use nodelog_common::errors::*;
use nodelog_common::{Build, JobFilter};
use std::io::Write;

pub const CSV_HEADER: [&str; 6] = ["Job", "Number", "Host", "Duration", "Start", "Result"];

/// `Start` stays in epoch milliseconds, as jenkins reports it.
fn record(build: &Build) -> [String; 6] {
    [
        build.job.clone(),
        build.number.to_string(),
        build.host.clone(),
        build.duration.to_string(),
        build.start.to_string(),
        build.result.clone().unwrap_or_default(),
    ]
}

/// Write every stored build of the jobs matching `filter` as csv.
///
/// Rows are ordered by job name, then build number. Returns the number of rows.
pub fn export_csv<W: Write>(store: &mut Store, filter: &JobFilter, w: W) -> Result<usize> {
    let builds = store
        .list_all_builds()
        .context("Failed to read builds from store")?;

    let mut writer = csv::Writer::from_writer(w);
    writer.write_record(CSV_HEADER)?;
    let mut rows = 0;
    for build in builds.iter().filter(|b| filter.matches(&b.job)) {
        writer
            .write_record(record(build))
            .with_context(|| format!("Failed to write build {}", build))?;
        rows += 1;
    }
    writer.flush()?;

    debug!("Exported {} builds", rows);
    Ok(rows)
}
