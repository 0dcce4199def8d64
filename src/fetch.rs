// src/fetch.rs
//! HTTP fetch client: one GET, one typed decode, no retries.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::counter;
use serde::de::DeserializeOwned;
use url::Url;

use crate::telemetry::FETCH_ERRORS_TOTAL;

/// Every way a fetch (or a joined pair of fetches) can fail.
///
/// Causes are kept as strings so the error is `Clone` and can be handed
/// across task boundaries and into `PipelineState::last_error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Inputs produced a request that cannot be constructed. No network call was made.
    #[error("invalid request url: {0}")]
    InvalidUri(String),
    /// Selected date lies after the current day. No network call was made.
    #[error("date {date} is in the future (today is {today})")]
    FutureDate { date: NaiveDate, today: NaiveDate },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("could not decode response: {0}")]
    Decoding(String),
    /// The aggregation task died before reporting a result.
    #[error("aggregation task failed: {0}")]
    Task(String),
    /// One side of a joined aggregation failed.
    #[error("{upstream} request failed: {cause}")]
    Joined {
        upstream: &'static str,
        cause: Box<FetchError>,
    },
}

impl FetchError {
    pub fn joined(upstream: &'static str, cause: FetchError) -> Self {
        FetchError::Joined {
            upstream,
            cause: Box::new(cause),
        }
    }

    /// Innermost error, looking through `Joined` wrappers.
    pub fn root(&self) -> &FetchError {
        match self {
            FetchError::Joined { cause, .. } => cause.root(),
            other => other,
        }
    }
}

/// Raw GET returning the body of a success response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<String, FetchError>;
}

#[derive(Debug, Clone, Copy)]
pub struct TransportTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for TransportTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(4),
            request: Duration::from_secs(10),
        }
    }
}

/// Production transport over `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeouts: TransportTimeouts) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("skyscript/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.request)
            .build()
            .context("building reqwest client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(describe_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: redact(url),
            });
        }
        resp.text().await.map_err(describe_reqwest)
    }
}

// reqwest errors embed the full url (api key included); strip it.
fn describe_reqwest(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Transport("request timed out".to_string())
    } else if e.is_connect() {
        FetchError::Transport(format!("connection failed: {}", e.without_url()))
    } else {
        FetchError::Transport(e.without_url().to_string())
    }
}

fn redact(url: &Url) -> String {
    let mut out = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "api_key" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    if !pairs.is_empty() {
        out.query_pairs_mut().clear().extend_pairs(pairs);
    }
    out.to_string()
}

/// Typed fetch on top of any `Transport`.
#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn Transport>,
}

impl FetchClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// GET `url` and decode the JSON body into `T`.
    pub async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUri(format!("{url}: {e}")))?;
        self.fetch_url(&parsed).await
    }

    pub async fn fetch_url<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        tracing::debug!(target: "fetch", url = %redact(url), "GET");
        let result = match self.transport.get(url).await {
            Ok(body) => serde_json::from_str::<T>(&body)
                .map_err(|e| FetchError::Decoding(e.to_string())),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            tracing::warn!(target: "fetch", url = %redact(url), error = %e, "fetch failed");
            counter!(FETCH_ERRORS_TOTAL).increment(1);
        }
        result
    }
}
