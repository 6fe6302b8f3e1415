use crate::errors::*;
use chrono::{DateTime, Utc};
use colored::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod utils;

/// Prefix of the host column when the executing host couldn't be resolved.
pub const HOST_FAILURE_PREFIX: &str = "failure: ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub url: String,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job with name {} at {}", self.name, self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub job: String,
    pub number: i32,
    /// Milliseconds since epoch
    pub start: i64,
    /// Milliseconds
    pub duration: i64,
    pub host: String,
    /// `None` while jenkins hasn't finished the build
    pub result: Option<String>,
    pub failed: Option<i32>,
    pub total: Option<i32>,
}

impl Build {
    pub fn host_failure(err: &HostError) -> String {
        format!("{}{}", HOST_FAILURE_PREFIX, err)
    }

    pub fn has_host(&self) -> bool {
        !self.host.starts_with(HOST_FAILURE_PREFIX)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start)
    }

    pub fn fancy_result(&self) -> String {
        match self.result.as_deref() {
            Some("SUCCESS") => "SUCCESS".green().to_string(),
            Some(r @ ("FAILURE" | "ABORTED")) => r.red().to_string(),
            Some(r @ "UNSTABLE") => r.yellow().to_string(),
            Some(other) => other.to_string(),
            None => "RUNNING".blue().to_string(),
        }
    }
}

impl fmt::Display for Build {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} started {}, duration {} at {} status {}",
            self.job,
            self.number,
            self.start,
            self.duration,
            self.host,
            self.result.as_deref().unwrap_or("-"),
        )?;
        match (self.failed, self.total) {
            (Some(failed), Some(total)) => write!(f, " failed {} of {}", failed, total),
            _ => Ok(()),
        }
    }
}

/// Client side filter on job names.
#[derive(Debug, Clone, Default)]
pub enum JobFilter {
    #[default]
    All,
    Contains(String),
    Prefix(String),
    Regex(Regex),
}

impl JobFilter {
    pub fn regex(pattern: &str) -> Result<JobFilter> {
        let re = Regex::new(pattern)
            .with_context(|| anyhow!("Invalid job filter regex: {:?}", pattern))?;
        Ok(JobFilter::Regex(re))
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            JobFilter::All => true,
            JobFilter::Contains(needle) => name.contains(needle.as_str()),
            JobFilter::Prefix(prefix) => name.starts_with(prefix.as_str()),
            JobFilter::Regex(re) => re.is_match(name),
        }
    }
}
