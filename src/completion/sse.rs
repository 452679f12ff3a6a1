//! Server-sent event decoding for streamed chat completions

use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

const DONE_MARKER: &str = "[DONE]";

#[derive(Deserialize, Default)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize, Default)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

enum SseEvent {
    Done,
    Fragments(Vec<String>),
}

/// Turn a raw `text/event-stream` body into text fragments.
///
/// One fragment per non-empty content delta, in arrival order. Events that
/// carry no text are skipped. The stream ends at `[DONE]` or end of body.
pub fn text_fragments<S, E>(body: S) -> impl Stream<Item = Result<String>> + Send + 'static
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    try_stream! {
        let mut body = Box::pin(body);
        let mut pending: Vec<u8> = Vec::new();
        let mut data = String::new();
        let mut done = false;

        'read: while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| Error::provider(format!("stream chunk error: {}", e)))?;
            pending.extend_from_slice(&chunk);

            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = pending.drain(..=pos).collect();
                let line = decode_line(&raw)?;

                if let Some(event) = push_line(&mut data, line) {
                    match decode_event(&event)? {
                        SseEvent::Done => {
                            done = true;
                            break 'read;
                        }
                        SseEvent::Fragments(fragments) => {
                            for fragment in fragments {
                                yield fragment;
                            }
                        }
                    }
                }
            }
        }

        if !done {
            // Body ended without a trailing blank line
            if !pending.is_empty() {
                let line = decode_line(&pending)?.to_string();
                push_line(&mut data, &line);
            }
            if !data.is_empty() {
                if let SseEvent::Fragments(fragments) = decode_event(&data)? {
                    for fragment in fragments {
                        yield fragment;
                    }
                }
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> Result<&str> {
    let line = std::str::from_utf8(raw)
        .map_err(|e| Error::provider(format!("stream utf8 error: {}", e)))?;
    Ok(line.trim_end_matches(['\n', '\r']))
}

/// Accumulate one line; returns the event payload once a blank line closes it.
fn push_line(data: &mut String, line: &str) -> Option<String> {
    if let Some(payload) = line.strip_prefix("data:") {
        if !data.is_empty() {
            data.push('\n');
        }
        data.push_str(payload.strip_prefix(' ').unwrap_or(payload));
        None
    } else if line.is_empty() && !data.is_empty() {
        Some(std::mem::take(data))
    } else {
        None
    }
}

fn decode_event(data: &str) -> Result<SseEvent> {
    let data = data.trim();
    if data == DONE_MARKER {
        return Ok(SseEvent::Done);
    }

    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| Error::provider(format!("stream decode error: {}; payload={}", e, data)))?;

    if let Some(error) = chunk.error {
        return Err(Error::provider(error.to_string()));
    }

    let fragments = chunk
        .choices
        .into_iter()
        .filter_map(|choice| choice.delta.content)
        .filter(|text| !text.is_empty())
        .collect();

    Ok(SseEvent::Fragments(fragments))
}
