use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use tracing::{debug, error, trace};

use super::{EventStream, Transport, sse};
use crate::error::{Error, ProviderError, Result};

/// HTTP Transport implementation for making API requests to chat providers
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client for making requests
    client: Client,
}

impl HttpTransport {
    /// Creates a transport whose connect and request timeouts are both `timeout`
    ///
    /// Clients built from a [`ClientConfig`](crate::ClientConfig) use
    /// [`DEFAULT_TIMEOUT`](crate::config::DEFAULT_TIMEOUT) unless it was overridden.
    ///
    /// # Examples
    ///
    /// ```
    /// use quietenable_core::transport::http::HttpTransport;
    /// use std::time::Duration;
    ///
    /// let transport = HttpTransport::with_timeout(Duration::from_secs(30)).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Creates a new HTTP transport with a custom client
    ///
    /// # Examples
    ///
    /// ```
    /// use quietenable_core::transport::http::HttpTransport;
    /// use reqwest::Client;
    ///
    /// let client = Client::new();
    /// let transport = HttpTransport::with_client(client);
    /// ```
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(
        &self,
        payload: &serde_json::Value,
        endpoint: &str,
        headers: HashMap<String, String>,
    ) -> std::result::Result<Response, ProviderError> {
        debug!("POST {}", endpoint);
        let response = self
            .client
            .post(endpoint)
            .headers(header_map(headers))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Provider returned {}: {}", status, body);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

fn header_map(headers: HashMap<String, String>) -> header::HeaderMap {
    let mut header_map = header::HeaderMap::new();
    for (key, value) in headers {
        if let (Ok(name), Ok(value)) = (
            header::HeaderName::from_bytes(key.as_bytes()),
            header::HeaderValue::from_str(&value),
        ) {
            header_map.insert(name, value);
        }
    }

    if !header_map.contains_key(header::CONTENT_TYPE) {
        header_map.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
    }
    header_map
}

#[async_trait]
impl Transport for HttpTransport {
    async fn process_request(
        &self,
        payload: serde_json::Value,
        endpoint: &str,
        headers: HashMap<String, String>,
    ) -> std::result::Result<serde_json::Value, ProviderError> {
        let response = self.send(&payload, endpoint, headers).await?;

        let response_text = response.text().await?;
        trace!("Response body: {}", response_text);
        Ok(serde_json::from_str(&response_text)?)
    }

    async fn process_stream_request(
        &self,
        payload: serde_json::Value,
        endpoint: &str,
        mut headers: HashMap<String, String>,
    ) -> std::result::Result<EventStream, ProviderError> {
        headers
            .entry("Accept".to_string())
            .or_insert_with(|| "text/event-stream".to_string());
        let response = self.send(&payload, endpoint, headers).await?;

        Ok(Box::pin(sse::decode_json_events(Box::pin(
            response.bytes_stream(),
        ))))
    }
}
