use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, error, info, instrument, trace};
use url::Url;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::request::ChatRequest;
use crate::response::{ChatChunk, ChatResponse};
use crate::secret::Secret;
use crate::token::ProviderKind;
use crate::transport::Transport;
use crate::transport::http::HttpTransport;

/// Chunks of a streamed completion from a single provider
pub type ProviderStream =
    std::pin::Pin<Box<dyn futures::Stream<Item = std::result::Result<ChatChunk, ProviderError>> + Send>>;

/// One OpenAI-compatible chat-completions endpoint
///
/// Requests are sent as given; choosing the model and normalizing the token
/// field is the caller's job.
#[derive(Clone)]
pub struct Provider {
    kind: ProviderKind,
    base_url: Url,
    api_key: Secret<String>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl Provider {
    /// Creates a provider that talks HTTP
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the HTTP client cannot be built.
    #[instrument(skip(config), fields(kind = %config.kind), level = "debug")]
    pub fn new(config: ProviderConfig) -> Result<Self> {
        info!("Creating {} provider", config.kind);
        let transport = HttpTransport::with_timeout(config.timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a provider on top of any transport
    pub fn with_transport(config: ProviderConfig, transport: Arc<dyn Transport>) -> Self {
        debug!("API key set: {}", !config.api_key.is_empty());
        debug!("Base URL: {}", config.base_url);
        Self {
            kind: config.kind,
            base_url: config.base_url,
            api_key: config.api_key,
            transport,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Full URL of the chat-completions endpoint
    pub fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.base_url.as_str().trim_end_matches('/')
        )
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), self.api_key.bearer());
        headers
    }

    /// Sends a non-streaming request
    ///
    /// # Errors
    ///
    /// Fails on transport errors, on an `error` object in the body, on a body
    /// that does not decode and on a response without choices.
    #[instrument(skip(self, request), fields(kind = %self.kind, model = %request.model), level = "debug")]
    pub async fn complete(&self, request: &ChatRequest) -> std::result::Result<ChatResponse, ProviderError> {
        let payload = serde_json::to_value(request)?;
        trace!("Request payload: {}", payload);

        let body = self
            .transport
            .process_request(payload, &self.endpoint(), self.headers())
            .await?;

        if let Some(message) = api_error(&body) {
            error!("Provider reported an error: {}", message);
            return Err(ProviderError::Api(message));
        }

        let response: ChatResponse = serde_json::from_value(body)?;
        if response.choices.is_empty() {
            error!("Provider returned no choices");
            return Err(ProviderError::EmptyResponse);
        }

        debug!("Finish reason: {:?}", response.finish_reason());
        Ok(response)
    }

    /// Opens a streaming request
    ///
    /// The returned future fails if the provider rejects the request; failures
    /// after that arrive as stream items.
    #[instrument(skip(self, request), fields(kind = %self.kind, model = %request.model), level = "debug")]
    pub async fn stream(&self, request: &ChatRequest) -> std::result::Result<ProviderStream, ProviderError> {
        let payload = serde_json::to_value(request)?;
        trace!("Request payload: {}", payload);

        let events = self
            .transport
            .process_stream_request(payload, &self.endpoint(), self.headers())
            .await?;

        debug!("Stream opened");
        Ok(Box::pin(events.map(|event| event.and_then(decode_chunk))))
    }
}

fn decode_chunk(value: Value) -> std::result::Result<ChatChunk, ProviderError> {
    if let Some(message) = api_error(&value) {
        return Err(ProviderError::Api(message));
    }
    Ok(serde_json::from_value(value)?)
}

/// Extracts the message of an in-band `{"error": ...}` body
fn api_error(body: &Value) -> Option<String> {
    let error = body.get("error").filter(|e| !e.is_null())?;
    Some(
        error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::transport::mock::MockTransport;
    use futures::TryStreamExt;
    use serde_json::json;

    fn provider(transport: &MockTransport) -> Provider {
        let config =
            ProviderConfig::new(ProviderKind::OpenAi, "https://api.example.com/v1/", "sk-test")
                .unwrap();
        Provider::with_transport(config, Arc::new(transport.clone()))
    }

    fn request() -> ChatRequest {
        ChatRequest::builder("gpt-5")
            .messages(vec![Message::user("hi")])
            .build()
    }

    #[test]
    fn test_endpoint_and_debug() {
        let provider = provider(&MockTransport::new());
        assert_eq!(provider.endpoint(), "https://api.example.com/v1/chat/completions");

        let debug = format!("{provider:?}");
        assert!(!debug.contains("sk-test"));
    }

    #[tokio::test]
    async fn test_complete_sends_bearer_and_payload() {
        let transport = MockTransport::new();
        let response = provider(&transport).complete(&request()).await.unwrap();

        assert_eq!(response.text(), Some("This is a mock response"));
        let sent = &transport.requests()[0];
        assert_eq!(sent.headers["Authorization"], "Bearer sk-test");
        assert_eq!(sent.payload["messages"][0]["content"], "hi");
    }

    #[tokio::test]
    async fn test_error_object_is_api_error() {
        let transport = MockTransport::new();
        transport.respond_with(json!({"error": {"message": "model not found", "type": "invalid_request_error"}}));

        let err = provider(&transport).complete(&request()).await.unwrap_err();
        assert!(matches!(&err, ProviderError::Api(m) if m == "model not found"));
    }

    #[tokio::test]
    async fn test_no_choices_is_empty_response() {
        let transport = MockTransport::new();
        transport.respond_with(json!({"id": "x", "choices": []}));

        let err = provider(&transport).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_stream_decodes_chunks() {
        let transport = MockTransport::new();
        transport.stream_with(
            "gpt-5",
            vec![
                json!({"choices": [{"delta": {"content": "Hel"}}]}),
                json!({"choices": [{"delta": {"content": "lo"}, "finish_reason": "stop"}]}),
            ],
        );

        let chunks: Vec<ChatChunk> = provider(&transport)
            .stream(&request())
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content(), Some("Hel"));
        assert_eq!(chunks[1].finish_reason(), Some("stop"));
    }
}
