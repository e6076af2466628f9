use crate::config::Config;
use crate::error::ApiError;
use futures_util::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;

/// Budget for the primary entity query.
pub const PRIMARY_QUERY_TIMEOUT: Duration = Duration::from_secs(10);
/// Budget for each correlation request.
pub const CORRELATION_REQUEST_TIMEOUT: Duration = Duration::from_secs(12);
/// Backstop on the HTTP client itself; callers apply the tighter budgets.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(15);

pub type ApiFuture<'a> = BoxFuture<'a, Result<Value, ApiError>>;

/// Both calls authenticate with the same credential and hand back loosely
/// typed JSON; shaping it is the caller's job.
pub trait MonitoringApi: Send + Sync {
    fn graphql<'a>(&'a self, query: &'a str) -> ApiFuture<'a>;

    fn open_violations(&self) -> ApiFuture<'_>;
}

pub struct HttpMonitoringApi {
    client: reqwest::Client,
    api_key: String,
    graphql_url: String,
    violations_url: String,
}

impl HttpMonitoringApi {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(CLIENT_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            graphql_url: config.graphql_url.clone(),
            violations_url: config.violations_url.clone(),
        })
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl MonitoringApi for HttpMonitoringApi {
    fn graphql<'a>(&'a self, query: &'a str) -> ApiFuture<'a> {
        Box::pin(async move {
            let request = self
                .client
                .post(&self.graphql_url)
                .header("API-Key", &self.api_key)
                .header("Content-Type", "application/json")
                .json(&json!({ "query": query }));
            Self::send(request).await
        })
    }

    fn open_violations(&self) -> ApiFuture<'_> {
        Box::pin(async move {
            let request = self
                .client
                .get(&self.violations_url)
                .header("X-Api-Key", &self.api_key)
                .header("Content-Type", "application/json");
            Self::send(request).await
        })
    }
}

/// Runs a request under `limit`, folding an elapsed deadline into
/// [`ApiError::Timeout`].
pub async fn bounded<F>(limit: Duration, request: F) -> Result<Value, ApiError>
where
    F: Future<Output = Result<Value, ApiError>>,
{
    tokio::time::timeout(limit, request)
        .await
        .unwrap_or(Err(ApiError::Timeout(limit)))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GraphqlError {
    #[serde(default)]
    pub(crate) message: String,
}

/// First entry of a GraphQL `errors` array, rendered for the status line.
pub(crate) fn first_graphql_error(errors: &[GraphqlError]) -> Option<String> {
    errors.first().map(|err| {
        if err.message.is_empty() {
            "unknown error".to_string()
        } else {
            err.message.clone()
        }
    })
}
