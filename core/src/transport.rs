//! The network edge: one attempt per request, failures folded into `ApiError`.

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::http::{normalize, HttpMethod, HttpRequest, HttpResponse, RawPayload};

/// Executes a single HTTP request.
///
/// Implementations never retry and never panic; every failure comes back as
/// an `ApiError`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> ApiResult<RawPayload>;
}

/// `Transport` over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::network(e.to_string()))?;
        Ok(Self { http })
    }

    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        Self::new(config.timeout)
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, reqwest::Error> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .http
            .request(method, &request.url)
            .header(ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Render a reqwest error together with its `source()` chain.
///
/// reqwest's own `Display` stops at "error sending request for url (..)"; the
/// underlying cause ("Connection refused", "operation timed out", a TLS
/// failure) only lives further down the chain. Links already contained in the
/// text so far are skipped.
fn describe(error: &reqwest::Error) -> String {
    let mut description = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.is_empty() && !description.contains(&text) {
            description.push_str(": ");
            description.push_str(&text);
        }
        source = cause.source();
    }
    description
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> ApiResult<RawPayload> {
        let method = request.method;
        let url = request.url.clone();
        debug!(%method, %url, "sending request");

        let response = match self.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let description = describe(&e);
                warn!(%method, %url, error = %description, "request failed before a response arrived");
                return Err(ApiError::network(description));
            }
        };

        debug!(%method, %url, status = response.status, "response received");
        normalize(response)
    }
}
