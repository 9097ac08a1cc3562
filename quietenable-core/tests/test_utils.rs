#![allow(dead_code)]

use dotenv::dotenv;
use quietenable_core::transport::mock::MockTransport;
use quietenable_core::{Provider, ProviderConfig, ProviderKind, QuietClient};
use serde_json::{Value, json};
use std::env;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, registry};

/// Helper function to set up tracing for tests
pub fn setup_tracing(level: Level) {
    let subscriber = registry()
        .with(
            fmt::layer()
                .with_test_writer()
                .with_ansi(false) // Better for CI logs
                .with_file(true) // Include source code location
                .with_line_number(true),
        )
        .with(
            EnvFilter::from_default_env()
                .add_directive(level.into())
                .add_directive("reqwest=info".parse().unwrap()),
        ); // Lower verbosity for reqwest

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Transports behind a mock-backed client, kept so tests can inspect traffic
pub struct MockPair {
    pub primary: MockTransport,
    pub fallback: MockTransport,
}

fn mock_provider(kind: ProviderKind, base_url: &str, key: &str, transport: &MockTransport) -> Provider {
    let config = ProviderConfig::new(kind, base_url, key).unwrap();
    Provider::with_transport(config, Arc::new(transport.clone()))
}

/// Client whose primary and fallback both run on mock transports
pub fn mock_client_with_fallback() -> (QuietClient, MockPair) {
    let pair = MockPair {
        primary: MockTransport::new(),
        fallback: MockTransport::new(),
    };
    let client = QuietClient::with_providers(
        mock_provider(ProviderKind::OpenAi, "https://primary.test/v1", "sk-primary", &pair.primary),
        Some(mock_provider(ProviderKind::Grok, "https://fallback.test/v1", "xai-fallback", &pair.fallback)),
    );
    (client, pair)
}

/// Client with a mock primary and no fallback
pub fn mock_client_without_fallback() -> (QuietClient, MockTransport) {
    let primary = MockTransport::new();
    let client = QuietClient::with_providers(
        mock_provider(ProviderKind::OpenAi, "https://primary.test/v1", "sk-primary", &primary),
        None,
    );
    (client, primary)
}

/// A non-streaming completion with a single text answer
pub fn completion(model: &str, text: &str) -> Value {
    json!({
        "id": format!("chatcmpl-{model}"),
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    })
}

/// A streamed content delta
pub fn content_chunk(text: &str) -> Value {
    json!({
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}]
    })
}

/// Get a client for the real API if a key is available
pub fn get_live_client() -> Option<QuietClient> {
    dotenv().ok();
    match env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => QuietClient::from_env(key).ok(),
        _ => None,
    }
}
