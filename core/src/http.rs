//! HTTP request and response values plus status normalization.
//!
//! # Design
//! Requests and responses are plain data. `OrderClient` builds `HttpRequest`
//! values, a `Transport` executes them, and `normalize` turns whatever came
//! back into an `ApiResult`. Keeping normalization a pure function lets it be
//! tested without a network.

use std::fmt;

use tracing::warn;

use crate::error::{ApiError, ApiResult, GENERIC_ERROR_MESSAGE};

/// Body of a successful response, before any typed parsing.
pub type RawPayload = String;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute (base URL plus route). `query` pairs are appended by
/// the transport. `headers` carry anything route-specific, most notably the
/// content type of `body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: String) -> Self {
        Self {
            method,
            url,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Map a response to its payload, or to a `Server` error for non-2xx statuses.
///
/// The error message is the JSON body's `message` field when it has one,
/// otherwise the generic message.
pub fn normalize(response: HttpResponse) -> ApiResult<RawPayload> {
    if (200..300).contains(&response.status) {
        return Ok(response.body);
    }
    if response.status == 401 {
        warn!("request rejected as unauthenticated");
    }
    let message = server_message(&response.body).unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());
    Err(ApiError::Server {
        status: response.status,
        message,
    })
}

fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")?
        .as_str()
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
}
