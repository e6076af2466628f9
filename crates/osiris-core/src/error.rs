use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures talking to the monitoring backend. None of these are fatal:
/// callers downgrade them to synthetic data or "no correlation".
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{0}")]
    Backend(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("API key or account ID not configured")]
    MissingCredentials,
}

/// Why a correlation stage produced nothing.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("stage exceeded its {}s ceiling", .0.as_secs())]
    Timeout(Duration),
    #[error("internal fault: {0}")]
    InternalFault(String),
}
