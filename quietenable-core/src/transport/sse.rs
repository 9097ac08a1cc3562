//! Server-sent events decoding for streamed chat completions.
//!
//! Bytes are buffered until a blank line closes an event, so events and
//! multi-byte UTF-8 characters split across network chunks decode intact.

use std::collections::VecDeque;

use futures::{Stream, StreamExt, stream};
use tracing::trace;

use crate::error::ProviderError;

/// A parsed SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event_type: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

impl SseEvent {
    /// True for the `[DONE]` sentinel that ends OpenAI-style streams
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Incremental SSE parser
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw bytes, returning every event completed by them
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        // CRLF framing is folded into LF so one boundary search covers both
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = find_boundary(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(event) = parse_event(&raw[..end]) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes a trailing event the provider did not terminate with a blank line
    pub fn finish(&mut self) -> Option<SseEvent> {
        let raw = std::mem::take(&mut self.buffer);
        parse_event(&raw)
    }

    pub fn has_remaining(&self) -> bool {
        !self.buffer.is_empty()
    }
}

fn find_boundary(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

fn parse_event(raw: &[u8]) -> Option<SseEvent> {
    let text = String::from_utf8_lossy(raw);
    let mut event_type = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value));
        } else if let Some(value) = line.strip_prefix("event:") {
            event_type = Some(value.trim().to_string());
        }
        // comments (": keep-alive"), id: and retry: are ignored
    }

    if data_lines.is_empty() {
        return None;
    }

    Some(SseEvent {
        event_type,
        data: data_lines.join("\n"),
    })
}

struct DecodeState<S> {
    inner: S,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
    finished: bool,
}

/// Turns a byte stream into a stream of JSON event payloads
///
/// Ends at `[DONE]` or when the byte stream ends. A transport error is yielded
/// once and ends the stream; a payload that is not JSON is yielded as an error
/// and decoding continues.
pub fn decode_json_events<S, B, E>(
    inner: S,
) -> impl Stream<Item = Result<serde_json::Value, ProviderError>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ProviderError> + Send + 'static,
{
    let state = DecodeState {
        inner,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                if event.is_done() {
                    trace!("Stream finished with [DONE]");
                    return None;
                }
                trace!("SSE event: {}", event.data);
                let item = serde_json::from_str(&event.data).map_err(ProviderError::from);
                return Some((item, state));
            }

            if state.finished {
                return None;
            }

            match state.inner.next().await {
                Some(Ok(bytes)) => {
                    let events = state.decoder.feed(bytes.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(err.into()), state));
                }
                None => {
                    state.finished = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: {\"a\":1}\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"a\":1}");
        assert!(!decoder.has_remaining());
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"text\":").is_empty());
        assert!(decoder.feed(b" \"hel").is_empty());
        let events = decoder.feed(b"lo\"}\n\ndata: [DONE]\n\n");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "{\"text\": \"hello\"}");
        assert!(events[1].is_done());
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let bytes = "data: {\"t\":\"ñ\"}\n\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(&bytes[..split]).is_empty());
        let events = decoder.feed(&bytes[split..]);
        assert_eq!(events[0].data, "{\"t\":\"ñ\"}");
    }

    #[test]
    fn test_crlf_multiline_and_comments() {
        let mut decoder = SseDecoder::new();
        let events =
            decoder.feed(b": keep-alive\r\n\r\nevent: delta\r\ndata: line one\r\ndata: line two\r\n\r\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type.as_deref(), Some("delta"));
        assert_eq!(events[0].data, "line one\nline two");
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"last\":true}").is_empty());
        assert_eq!(decoder.finish().unwrap().data, "{\"last\":true}");
        assert!(decoder.finish().is_none());
    }

    #[tokio::test]
    async fn test_decode_json_events_stops_at_done() {
        let chunks: Vec<Result<&'static [u8], ProviderError>> = vec![
            Ok(b"data: {\"n\":1}\n\nda"),
            Ok(b"ta: {\"n\":2}\n\n"),
            Ok(b"data: [DONE]\n\ndata: {\"n\":3}\n\n"),
        ];
        let values: Vec<_> = decode_json_events(stream::iter(chunks)).collect().await;

        assert_eq!(values.len(), 2);
        assert_eq!(values[0].as_ref().unwrap(), &json!({"n": 1}));
        assert_eq!(values[1].as_ref().unwrap(), &json!({"n": 2}));
    }

    #[tokio::test]
    async fn test_decode_json_events_surfaces_transport_error() {
        let chunks: Vec<Result<&'static [u8], ProviderError>> = vec![
            Ok(b"data: {\"n\":1}\n\n"),
            Err(ProviderError::Stream("connection reset".into())),
            Ok(b"data: {\"n\":2}\n\n"),
        ];
        let values: Vec<_> = decode_json_events(stream::iter(chunks)).collect().await;

        assert_eq!(values.len(), 2);
        assert!(values[0].is_ok());
        assert!(matches!(values[1], Err(ProviderError::Stream(_))));
    }
}
