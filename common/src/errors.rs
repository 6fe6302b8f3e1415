pub use anyhow::{anyhow, bail, format_err, Context, Error, Result};
pub use log::{debug, error, info, trace, warn};

/// Failure while talking to the CI server.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to request {url:?}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Unexpected http status {status} from {url:?}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("Failed to parse response from {url:?}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to parse xml from {url:?}")]
    Xml {
        url: String,
        #[source]
        source: quick_xml::Error,
    },
    #[error("Invalid url: {url:?}")]
    Url { url: String },
}

/// Failure while looking up the host a build was executed on.
///
/// This is never fatal for a build record, the error text ends up in the
/// stored host column instead.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("No Host")]
    NotFound,
    #[error("Empty Host")]
    Empty,
    #[error("Host key verification failed.")]
    HostKeyVerification,
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
