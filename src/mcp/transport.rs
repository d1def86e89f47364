//! HTTP transport for the analysis service

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client,
};
use std::{collections::HashMap, time::Duration};
use thiserror::Error;
use tracing::{debug, trace};

use crate::mcp::types::{JsonRpcRequest, ACCEPT_VALUE, SESSION_HEADER};
use crate::version;

/// Transport-level failures; everything above this layer receives values, never panics
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid transport configuration: {0}")]
    Config(String),
}

/// Status, body and headers of one exchange; header names are lower-case
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Posts one JSON-RPC request to the analysis endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        request: &JsonRpcRequest,
        session_id: Option<&str>,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// Create a new transport for the given endpoint
    pub fn new(endpoint: &str) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(version::user_agent())
            .build()
            .map_err(|e| TransportError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    fn map_error(error: reqwest::Error, timeout: Duration) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(timeout)
        } else {
            TransportError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        request: &JsonRpcRequest,
        session_id: Option<&str>,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        debug!("POST {} method={} id={}", self.endpoint, request.method, request.id);

        let mut builder = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(request);

        if let Some(session_id) = session_id {
            builder = builder.header(SESSION_HEADER, session_id);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(e, timeout))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response
            .text()
            .await
            .map_err(|e| Self::map_error(e, timeout))?;

        trace!("Response status={} body_len={}", status, body.len());

        Ok(RawResponse {
            status,
            body,
            headers,
        })
    }
}
