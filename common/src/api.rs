use crate::auth::{self, Credentials};
use crate::config::ConfigFile;
use crate::errors::*;
use crate::http;
use crate::{Job, JobFilter};
use futures_util::StreamExt;
use std::collections::BTreeMap;
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

pub mod console;
pub mod executors;
pub mod job_config;
pub mod models;

pub use executors::Executor;
pub use models::RemoteBuild;

const JOBS_TREE: &str = "api/json?tree=jobs[name,url]";
const BUILDS_TREE: &str =
    "api/json?tree=builds[number,url,duration,timestamp,result,actions[failCount,totalCount]]";

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// HTTP client for the jenkins surface nodelog consumes.
#[derive(Debug, Clone)]
pub struct Client {
    endpoint: String,
    client: HttpClient,
    credentials: Option<Credentials>,
}

impl Client {
    pub fn new(config: &ConfigFile, endpoint: Option<String>) -> Result<Client> {
        let endpoint = endpoint
            .or_else(|| config.jenkins.url.clone())
            .context("No jenkins url configured, use --endpoint or set `url` in [jenkins]")?;
        let (endpoint, credentials) = auth::find_credentials(&config.jenkins, &endpoint)?;

        debug!("setting jenkins endpoint to {:?}", endpoint);
        let client = http::client(config.jenkins.timeout())?;
        Ok(Client {
            endpoint,
            client,
            credentials,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        let req = self.client.get(url);
        if let Some(credentials) = &self.credentials {
            req.basic_auth(&credentials.user, Some(&credentials.password))
        } else {
            req
        }
    }

    async fn send(&self, url: &str) -> Result<Response, FetchError> {
        trace!("Sending request to {:?}", url);
        let response = self.get(url).send().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = self
            .send(url)
            .await?
            .bytes()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Json {
            url: url.to_string(),
            source,
        })
    }

    /// Stream a text resource line by line until `f` returns a value.
    async fn scan_lines<T, F>(&self, url: &str, mut f: F) -> Result<Option<T>, FetchError>
    where
        F: FnMut(&str) -> Option<T>,
    {
        let mut stream = self.send(url).await?.bytes_stream();
        let mut lines = console::LineBuffer::default();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;
            for line in lines.push(&chunk) {
                if let Some(found) = f(&line) {
                    return Ok(Some(found));
                }
            }
        }

        Ok(lines.finish().and_then(|line| f(&line)))
    }

    /// Append escaped path segments to the endpoint.
    fn endpoint_url(&self, segments: &[&str]) -> Result<String, FetchError> {
        let invalid = || FetchError::Url {
            url: self.endpoint.clone(),
        };
        let mut url = Url::parse(&self.endpoint).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url.to_string())
    }

    fn node_url(&self, node: &str, path: &[&str]) -> Result<String, FetchError> {
        let mut segments = vec!["computer", node];
        segments.extend(path);
        self.endpoint_url(&segments)
    }

    /// List the jobs jenkins knows about, filtered client side.
    pub async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, FetchError> {
        let url = join(&self.endpoint, JOBS_TREE);
        let directory = self.get_json::<models::JobDirectory>(&url).await?;
        let jobs = directory
            .jobs
            .into_iter()
            .filter(|job| filter.matches(&job.name))
            .collect::<Vec<_>>();
        debug!("Found {} matching jobs", jobs.len());
        Ok(jobs)
    }

    pub async fn fetch_build_history(&self, job: &Job) -> Result<Vec<RemoteBuild>, FetchError> {
        let url = join(&job.url, BUILDS_TREE);
        let details = self.get_json::<models::JobDetails>(&url).await?;
        debug!("Found {} builds for {:?}", details.builds.len(), job.name);
        Ok(details.builds)
    }

    /// Find the host a build ran on by scanning its console output.
    /// Fetch the top-level fields of a job's `config.xml`.
    pub async fn fetch_job_config(
        &self,
        name: &str,
    ) -> Result<BTreeMap<String, String>, FetchError> {
        let url = self.endpoint_url(&["job", name, "config.xml"])?;
        let xml = self
            .send(&url)
            .await?
            .text()
            .await
            .map_err(|source| FetchError::Http {
                url: url.clone(),
                source,
            })?;
        job_config::parse_job_config(&xml).map_err(|source| FetchError::Xml { url, source })
    }

    pub async fn fetch_host(&self, build_url: &str) -> Result<String, HostError> {
        let url = join(build_url, "consoleText");
        match self.scan_lines(&url, console::parse_host_line).await? {
            Some(host) => host,
            None => Err(HostError::NotFound),
        }
    }

    pub async fn list_executors(&self) -> Result<Vec<Executor>> {
        let url = join(&self.endpoint, "ajaxExecutors");
        let html = self
            .send(&url)
            .await?
            .text()
            .await
            .with_context(|| anyhow!("Failed to read executors page from {:?}", url))?;
        executors::parse_executors(&html)
    }

    pub async fn fetch_node_ip(&self, node: &str) -> Result<String, HostError> {
        let url = self.node_url(node, &["logText", "progressiveHtml"])?;
        self.scan_lines(&url, console::parse_ip_line)
            .await?
            .ok_or(HostError::NotFound)
    }
}
