// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for HTTP delivery.
//!
//! The dispatcher and the remote config cache only see the [`Transport`]
//! trait, so tests can substitute a scripted transport for the real
//! [`HttpTransport`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::settings::Settings;

pub const HEADER_KEY: &str = "X-Outbound-Key";
pub const HEADER_CLIENT: &str = "X-Outbound-Client";
pub const HEADER_GUID: &str = "X-Outbound-GUID";

/// Error type for transport operations. Every variant means no usable
/// response was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The attempt did not finish in time.
    #[error("request timed out")]
    Timeout,

    /// Connection, TLS or protocol failure.
    #[error("network error: {0}")]
    Network(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Response { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// How the dispatcher treats the result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Delivered,
    /// The server rejected the call; retrying cannot help.
    Permanent { status: u16 },
    /// Server error or no response; worth retrying.
    Transient { error: String },
}

/// Classifies an attempt: 2xx delivered, 5xx or no response transient,
/// anything else permanent.
pub fn classify(result: &TransportResult<Response>) -> Outcome {
    match result {
        Ok(response) if response.is_success() => Outcome::Delivered,
        Ok(response) if (500..600).contains(&response.status) => {
            Outcome::Transient { error: format!("server error {}", response.status) }
        }
        Ok(response) => Outcome::Permanent { status: response.status },
        Err(e) => Outcome::Transient { error: e.to_string() },
    }
}

/// Transport trait for JSON request/response exchanges.
pub trait Transport: Send + Sync {
    /// POSTs `payload` to the call endpoint `path`.
    ///
    /// `dedup_id` is identical across retries of the same call.
    fn send(
        &self,
        path: &str,
        payload: &Value,
        dedup_id: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Response>> + Send + '_>>;

    /// GETs `path`, relative to the service base URL.
    fn fetch(&self, path: &str)
        -> Pin<Box<dyn Future<Output = TransportResult<Response>> + Send + '_>>;
}

/// HTTP transport implementation using reqwest.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: String,
    client_header: String,
}

impl HttpTransport {
    /// Creates a transport for the service described by `settings`.
    pub fn new(settings: &Settings) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(HttpTransport {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            client_header: settings.client_header(),
        })
    }

    /// URL of a call endpoint.
    pub fn call_url(&self, path: &str) -> String {
        format!("{}/v2/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// URL of a plain resource.
    pub fn resource_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn read(response: reqwest::Response) -> TransportResult<Response> {
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        Ok(Response { status: status.as_u16(), body })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(e.to_string())
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        path: &str,
        payload: &Value,
        dedup_id: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Response>> + Send + '_>> {
        let url = self.call_url(path);
        let payload = payload.clone();
        let dedup_id = dedup_id.to_string();
        Box::pin(async move {
            debug!(url = %url, guid = %dedup_id, "POST");
            let response = self
                .client
                .post(&url)
                .header(HEADER_KEY, &self.api_key)
                .header(HEADER_CLIENT, &self.client_header)
                .header(HEADER_GUID, &dedup_id)
                .json(&payload)
                .send()
                .await
                .map_err(map_reqwest_error)?;
            let response = Self::read(response).await?;
            if response.status == StatusCode::UNAUTHORIZED.as_u16() {
                debug!(url = %url, "request rejected, check the api key");
            }
            Ok(response)
        })
    }

    fn fetch(
        &self,
        path: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Response>> + Send + '_>> {
        let url = self.resource_url(path);
        Box::pin(async move {
            debug!(url = %url, "GET");
            let response = self
                .client
                .get(&url)
                .header(HEADER_KEY, &self.api_key)
                .header(HEADER_CLIENT, &self.client_header)
                .send()
                .await
                .map_err(map_reqwest_error)?;
            Self::read(response).await
        })
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
