use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, Method, Response};
use serde_json::Value;

use crate::error::{DashScopeError, Result};

const BODY_PREVIEW_LIMIT: usize = 512;

/// JSON requests and raw downloads with a per-call timeout. No retries here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request_json(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<&Value>,
        timeout: Duration,
    ) -> Result<Value>;

    async fn download_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// `reqwest` transport. Cloning shares the connection pool.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> DashScopeError {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    DashScopeError::TransportError(format!("{} {}: {}", kind, url, err))
}

async fn read_success(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    log::debug!("HTTP {} from {}: {}", status.as_u16(), url, preview_body(&body));
    Err(DashScopeError::RemoteError {
        status_code: status.as_u16(),
        body,
    })
}

pub(crate) fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    if trimmed.len() <= BODY_PREVIEW_LIMIT {
        return trimmed.to_string();
    }
    let mut cut = BODY_PREVIEW_LIMIT;
    while !trimmed.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &trimmed[..cut])
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request_json(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<&Value>,
        timeout: Duration,
    ) -> Result<Value> {
        let mut request = self
            .client
            .request(method, url)
            .headers(headers)
            .timeout(timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| transport_error(url, e))?;
        let response = read_success(url, response).await?;
        let text = response.text().await.map_err(|e| transport_error(url, e))?;

        serde_json::from_str(&text).map_err(|e| {
            DashScopeError::ProtocolError(format!(
                "invalid JSON from {}: {} ({})",
                url,
                e,
                preview_body(&text)
            ))
        })
    }

    async fn download_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        let response = read_success(url, response).await?;
        let bytes = response.bytes().await.map_err(|e| transport_error(url, e))?;
        Ok(bytes.to_vec())
    }
}
