use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use nodelog_common::api::Client;
use nodelog_common::errors::*;
use nodelog_common::{Build, Job};

/// Where a refresh gets its builds from.
#[async_trait]
pub trait BuildSource: Send + Sync + 'static {
    /// All builds of `job`, in the order the server listed them.
    ///
    /// Only fails if the build list itself can't be fetched, a build whose
    /// host can't be resolved is returned with a placeholder host.
    async fn fetch_builds(&self, job: &Job) -> Result<Vec<Build>, FetchError>;
}

pub struct JenkinsSource {
    client: Client,
    host_concurrency: usize,
}

impl JenkinsSource {
    pub fn new(client: Client, host_concurrency: usize) -> JenkinsSource {
        JenkinsSource {
            client,
            host_concurrency: host_concurrency.max(1),
        }
    }
}

#[async_trait]
impl BuildSource for JenkinsSource {
    async fn fetch_builds(&self, job: &Job) -> Result<Vec<Build>, FetchError> {
        let history = self.client.fetch_build_history(job).await?;

        let builds = stream::iter(history)
            .map(|remote| async move {
                let host = match self.client.fetch_host(&remote.url).await {
                    Ok(host) => host,
                    Err(err) => {
                        let placeholder = Build::host_failure(&err);
                        warn!(
                            "Failed to resolve host of {:?} #{}: {:#}",
                            job.name,
                            remote.number,
                            Error::from(err)
                        );
                        placeholder
                    }
                };
                remote.into_build(&job.name, host)
            })
            .buffered(self.host_concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(builds)
    }
}
