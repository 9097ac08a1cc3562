use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ProviderError;

/// Decoded `data:` payloads of a server-sent event stream
pub type EventStream = Pin<Box<dyn Stream<Item = Result<serde_json::Value, ProviderError>> + Send>>;

/// Moves JSON payloads to a provider endpoint and back
///
/// Providers build the payload, endpoint and headers; a transport only
/// delivers them. The HTTP implementation is used in production, the mock
/// one in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the decoded JSON body
    ///
    /// # Arguments
    ///
    /// * `payload` - The JSON body to send
    /// * `endpoint` - Full URL of the endpoint
    /// * `headers` - Headers to add, including authorization
    async fn process_request(
        &self,
        payload: serde_json::Value,
        endpoint: &str,
        headers: HashMap<String, String>,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Sends a streaming request
    ///
    /// Resolves once the provider has accepted the request, so a rejected
    /// request fails here rather than inside the stream.
    async fn process_stream_request(
        &self,
        payload: serde_json::Value,
        endpoint: &str,
        headers: HashMap<String, String>,
    ) -> Result<EventStream, ProviderError>;
}

/// HTTP Transport implementation
pub mod http;

/// Mock Transport implementation for testing
pub mod mock;

/// Server-sent events decoding
pub mod sse;
