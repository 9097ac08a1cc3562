use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::stream;

use super::{EventStream, Transport};
use crate::error::ProviderError;

/// What the mock does when a request for a given model arrives
#[derive(Debug, Clone)]
enum Reply {
    Json(serde_json::Value),
    Fail(String),
    Stream {
        events: Vec<serde_json::Value>,
        trailing_error: Option<String>,
    },
}

/// A request as the mock saw it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub endpoint: String,
    pub payload: serde_json::Value,
    pub headers: HashMap<String, String>,
}

impl RecordedRequest {
    /// The `model` field of the payload
    pub fn model(&self) -> Option<&str> {
        self.payload.get("model").and_then(|m| m.as_str())
    }
}

#[derive(Debug, Default)]
struct MockState {
    /// Replies keyed by model id
    replies: HashMap<String, Reply>,
    /// Used when no model-specific reply matches
    default_reply: Option<Reply>,
    requests: Vec<RecordedRequest>,
}

/// Mock transport for testing
///
/// Clones share state, so a test can keep a handle while the client owns
/// another and inspect the traffic afterwards.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Creates a new mock transport
    ///
    /// # Examples
    ///
    /// ```
    /// use quietenable_core::transport::mock::MockTransport;
    ///
    /// let transport = MockTransport::new();
    /// assert_eq!(transport.call_count(), 0);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answers every request with `response` unless a model-specific reply exists
    pub fn respond_with(&self, response: serde_json::Value) -> &Self {
        self.state().default_reply = Some(Reply::Json(response));
        self
    }

    /// Answers requests for `model` with `response`
    ///
    /// # Examples
    ///
    /// ```
    /// use quietenable_core::transport::mock::MockTransport;
    /// use serde_json::json;
    ///
    /// let transport = MockTransport::new();
    /// transport.add_response("gpt-5", json!({
    ///     "choices": [{"message": {"role": "assistant", "content": "hi"}}]
    /// }));
    /// ```
    pub fn add_response(&self, model: impl Into<String>, response: serde_json::Value) -> &Self {
        self.state()
            .replies
            .insert(model.into(), Reply::Json(response));
        self
    }

    /// Fails every request with `message` unless a model-specific reply exists
    pub fn fail_with(&self, message: impl Into<String>) -> &Self {
        self.state().default_reply = Some(Reply::Fail(message.into()));
        self
    }

    /// Fails requests for `model` with `message`
    pub fn add_failure(&self, model: impl Into<String>, message: impl Into<String>) -> &Self {
        self.state()
            .replies
            .insert(model.into(), Reply::Fail(message.into()));
        self
    }

    /// Streams `events` in order for requests to `model`
    pub fn stream_with(&self, model: impl Into<String>, events: Vec<serde_json::Value>) -> &Self {
        self.state().replies.insert(
            model.into(),
            Reply::Stream {
                events,
                trailing_error: None,
            },
        );
        self
    }

    /// Streams `events` and then fails the stream with `message`
    pub fn stream_then_fail(
        &self,
        model: impl Into<String>,
        events: Vec<serde_json::Value>,
        message: impl Into<String>,
    ) -> &Self {
        self.state().replies.insert(
            model.into(),
            Reply::Stream {
                events,
                trailing_error: Some(message.into()),
            },
        );
        self
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    /// Payload of the most recent request
    ///
    /// # Examples
    ///
    /// ```
    /// use quietenable_core::transport::mock::MockTransport;
    ///
    /// let transport = MockTransport::new();
    /// assert!(transport.last_request().is_none());
    /// ```
    pub fn last_request(&self) -> Option<serde_json::Value> {
        self.state().requests.last().map(|r| r.payload.clone())
    }

    pub fn call_count(&self) -> usize {
        self.state().requests.len()
    }

    /// Records the request and picks the reply for its model
    fn record(
        &self,
        payload: serde_json::Value,
        endpoint: &str,
        headers: HashMap<String, String>,
    ) -> Option<Reply> {
        let mut state = self.state();
        let model = payload
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or_default()
            .to_string();

        state.requests.push(RecordedRequest {
            endpoint: endpoint.to_string(),
            payload,
            headers,
        });

        state
            .replies
            .get(&model)
            .or(state.default_reply.as_ref())
            .cloned()
    }
}

/// Canned completion used when nothing was scripted
fn default_completion(payload: &serde_json::Value) -> serde_json::Value {
    let model = payload
        .get("model")
        .and_then(|m| m.as_str())
        .unwrap_or("mock-model");

    serde_json::json!({
        "id": "mock-response",
        "object": "chat.completion",
        "created": 1234567890,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "This is a mock response"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 1, "completion_tokens": 5, "total_tokens": 6}
    })
}

#[async_trait]
impl Transport for MockTransport {
    async fn process_request(
        &self,
        payload: serde_json::Value,
        endpoint: &str,
        headers: HashMap<String, String>,
    ) -> Result<serde_json::Value, ProviderError> {
        let fallback_body = default_completion(&payload);
        match self.record(payload, endpoint, headers) {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Fail(message)) => Err(ProviderError::Mock(message)),
            Some(Reply::Stream { .. }) => Err(ProviderError::Mock(
                "streaming reply scripted for a non-streaming request".to_string(),
            )),
            None => Ok(fallback_body),
        }
    }

    async fn process_stream_request(
        &self,
        payload: serde_json::Value,
        endpoint: &str,
        headers: HashMap<String, String>,
    ) -> Result<EventStream, ProviderError> {
        let fallback_body = default_completion(&payload);
        let (events, trailing_error) = match self.record(payload, endpoint, headers) {
            Some(Reply::Stream {
                events,
                trailing_error,
            }) => (events, trailing_error),
            Some(Reply::Fail(message)) => return Err(ProviderError::Mock(message)),
            Some(Reply::Json(value)) => (vec![value], None),
            None => (vec![fallback_body], None),
        };

        let items = events
            .into_iter()
            .map(Ok::<_, ProviderError>)
            .chain(trailing_error.map(|m| Err(ProviderError::Stream(m))));
        Ok(Box::pin(stream::iter(items)))
    }
}
