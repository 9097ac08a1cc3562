use futures::StreamExt;
use quietenable_core::{ChatOptions, Error, FALLBACK_MODEL, Message, collect_stream};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use tracing::Level;

mod test_utils;

use test_utils::{
    content_chunk, mock_client_with_fallback, mock_client_without_fallback, setup_tracing,
};

#[tokio::test]
async fn test_stream_from_primary() {
    setup_tracing(Level::DEBUG);
    let (client, mocks) = mock_client_with_fallback();
    mocks.primary.stream_with(
        "gpt-5",
        vec![content_chunk("Hel"), content_chunk("lo"), content_chunk("!")],
    );

    let stream = assert_ok!(
        client
            .chat_stream(vec![Message::user("hi")], Vec::new(), ChatOptions::new())
            .await
    );
    let response = assert_ok!(collect_stream(stream).await);

    assert_eq!(response.text(), Some("Hello!"));
    assert_eq!(mocks.primary.last_request().unwrap()["stream"], true);
    assert_eq!(mocks.fallback.call_count(), 0);
}

#[tokio::test]
async fn test_failed_open_streams_only_fallback_chunks() {
    setup_tracing(Level::DEBUG);
    let (client, mocks) = mock_client_with_fallback();
    mocks.primary.fail_with("503 from primary");
    mocks.fallback.stream_with(
        FALLBACK_MODEL,
        vec![content_chunk("one "), content_chunk("two "), content_chunk("three")],
    );

    let stream = assert_ok!(
        client
            .chat_stream(vec![Message::user("count")], Vec::new(), ChatOptions::new())
            .await
    );
    let pieces: Vec<String> = stream
        .map(|chunk| chunk.unwrap().content().unwrap_or_default().to_string())
        .collect()
        .await;

    assert_eq!(pieces, ["one ", "two ", "three"]);

    let payload = mocks.fallback.last_request().unwrap();
    assert_eq!(payload["model"], "grok-4-latest");
    assert_eq!(payload["stream"], true);
    assert_eq!(payload["max_tokens"], 4000);
}

#[tokio::test]
async fn test_mid_stream_error_does_not_fall_back() {
    let (client, mocks) = mock_client_with_fallback();
    mocks
        .primary
        .stream_then_fail("gpt-5", vec![content_chunk("partial")], "connection reset");

    let mut stream = assert_ok!(
        client
            .chat_stream(vec![Message::user("hi")], Vec::new(), ChatOptions::new())
            .await
    );

    let first = assert_ok!(stream.next().await.unwrap());
    assert_eq!(first.content(), Some("partial"));

    let second = assert_err!(stream.next().await.unwrap());
    assert!(matches!(second, Error::Api(_)));
    assert!(second.to_string().contains("connection reset"));

    assert!(stream.next().await.is_none());
    assert_eq!(mocks.fallback.call_count(), 0);
}

#[tokio::test]
async fn test_in_band_error_event_becomes_api_error() {
    let (client, primary) = mock_client_without_fallback();
    primary.stream_with(
        "gpt-5",
        vec![json!({"error": {"message": "context length exceeded"}})],
    );

    let stream = assert_ok!(
        client
            .chat_stream(vec![Message::user("hi")], Vec::new(), ChatOptions::new())
            .await
    );
    let err = assert_err!(collect_stream(stream).await);
    assert!(err.to_string().contains("context length exceeded"));
}

#[tokio::test]
async fn test_stream_open_failure_without_fallback() {
    let (client, primary) = mock_client_without_fallback();
    primary.fail_with("unauthorized");

    let result = client
        .chat_stream(vec![Message::user("hi")], Vec::new(), ChatOptions::new())
        .await;

    let Err(err) = result else {
        panic!("expected the stream to fail to open");
    };
    assert!(err.to_string().contains("unauthorized"));
}
