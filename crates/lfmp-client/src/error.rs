use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {path} failed: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("backend answered {status} for {path}")]
    Status { status: u16, path: String },
    #[error("request to {path} timed out after {secs}s")]
    Timeout { path: String, secs: u64 },
    #[error("invalid backend URL {0:?}")]
    BaseUrl(String),
}
