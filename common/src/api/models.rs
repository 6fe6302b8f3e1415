use crate::{Build, Job};
use serde::Deserialize;

/// `GET {base}/api/json?tree=jobs[name,url]`
#[derive(Debug, Deserialize)]
pub struct JobDirectory {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

/// `GET {job}/api/json?tree=builds[..]`
#[derive(Debug, Deserialize)]
pub struct JobDetails {
    #[serde(default)]
    pub builds: Vec<RemoteBuild>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteBuild {
    pub number: i32,
    pub url: String,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub timestamp: i64,
    pub result: Option<String>,
    #[serde(default)]
    pub actions: Vec<Option<RemoteAction>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAction {
    #[serde(default)]
    pub fail_count: i32,
    #[serde(default)]
    pub total_count: i32,
}

impl RemoteBuild {
    /// `(failed, total)` of the last action that carries test counts.
    pub fn counts(&self) -> (Option<i32>, Option<i32>) {
        self.actions
            .iter()
            .flatten()
            .filter(|a| a.total_count > 0)
            .last()
            .map(|a| (Some(a.fail_count), Some(a.total_count)))
            .unwrap_or((None, None))
    }

    pub fn into_build(self, job: &str, host: String) -> Build {
        let (failed, total) = self.counts();
        Build {
            job: job.to_string(),
            number: self.number,
            start: self.timestamp,
            duration: self.duration,
            host,
            result: self.result,
            failed,
            total,
        }
    }
}
