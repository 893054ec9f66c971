//! Server-Sent Events (SSE) processing for streamed completions.
//!
//! This module turns the raw byte stream of a streamed chat completion into
//! parsed [`ChatCompletionChunk`]s.  Frames are delimited by a blank line, only
//! `data:` fields are meaningful, and `data: [DONE]` ends the stream.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_CHUNKS, STREAM_ERRORS};
use crate::types::{ChatCompletionChunk, ErrorResponse};
use crate::{Error, Result};

/// The outcome of parsing one SSE frame.
#[derive(Debug)]
enum Frame {
    /// A comment, keep-alive, or frame without data.
    Skip,
    /// The `[DONE]` sentinel.
    Done,
    /// A chunk, or the error it decoded to.
    Chunk(Result<ChatCompletionChunk>),
}

struct SseState<S> {
    stream: S,
    buffer: Vec<u8>,
    done: bool,
}

/// Process a stream of bytes into a stream of completion chunks.
///
/// Bytes are buffered until a full frame is available, so both frames and
/// multi-byte UTF-8 sequences may be split arbitrarily across network reads.
/// The returned stream ends at `[DONE]`, at the end of the body, or right
/// after a transport error.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<ChatCompletionChunk>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + Send + 'static,
{
    let state = SseState {
        stream: byte_stream,
        buffer: Vec::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            // First check if we have a complete frame in the buffer
            if let Some(frame) = take_frame(&mut state.buffer) {
                match parse_frame(&frame) {
                    Frame::Skip => continue,
                    Frame::Done => {
                        state.done = true;
                        return None;
                    }
                    Frame::Chunk(chunk) => return Some((tally(chunk), state)),
                }
            }

            // Read more data
            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    // CRLF and LF line endings are treated alike.
                    state
                        .buffer
                        .extend(bytes.iter().copied().filter(|b| *b != b'\r'));
                }
                Some(Err(e)) => {
                    state.done = true;
                    STREAM_ERRORS.click();
                    return Some((
                        Err(Error::streaming(
                            format!("Error in HTTP stream: {e}"),
                            Some(Box::new(e)),
                        )),
                        state,
                    ));
                }
                None => {
                    // End of body; a final frame may lack its blank line.
                    state.done = true;
                    if state.buffer.iter().all(|b| b.is_ascii_whitespace()) {
                        return None;
                    }
                    let frame = std::mem::take(&mut state.buffer);
                    return match parse_frame(&frame) {
                        Frame::Chunk(chunk) => Some((tally(chunk), state)),
                        Frame::Skip | Frame::Done => None,
                    };
                }
            }
        }
    })
}

fn tally(chunk: Result<ChatCompletionChunk>) -> Result<ChatCompletionChunk> {
    match &chunk {
        Ok(_) => STREAM_CHUNKS.click(),
        Err(_) => STREAM_ERRORS.click(),
    }
    chunk
}

/// Remove the first blank-line-terminated frame from `buffer`.
fn take_frame(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = buffer.windows(2).position(|w| w == b"\n\n")?;
    let mut frame: Vec<u8> = buffer.drain(..end + 2).collect();
    frame.truncate(end);
    Some(frame)
}

fn parse_frame(frame: &[u8]) -> Frame {
    let text = match std::str::from_utf8(frame) {
        Ok(text) => text,
        Err(e) => {
            return Frame::Chunk(Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            )));
        }
    };

    let mut data: Option<String> = None;
    for line in text.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            match &mut data {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(value);
                }
                None => data = Some(value.to_string()),
            }
        }
    }

    let Some(data) = data else {
        return Frame::Skip;
    };
    let data = data.trim();
    if data.is_empty() {
        return Frame::Skip;
    }
    if data == "[DONE]" {
        return Frame::Done;
    }

    if let Ok(envelope) = serde_json::from_str::<ErrorResponse>(data) {
        let message = envelope
            .error
            .message
            .unwrap_or_else(|| "unspecified error".to_string());
        return Frame::Chunk(Err(Error::streaming(
            format!("service reported an error: {message}"),
            None,
        )));
    }

    match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(chunk) => Frame::Chunk(Ok(chunk)),
        Err(e) => Frame::Chunk(Err(Error::serialization(
            format!("Failed to parse chunk JSON: {e}"),
            Some(Box::new(e)),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn body(
        parts: Vec<&'static [u8]>,
    ) -> impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + Send + 'static
    {
        stream::iter(
            parts
                .into_iter()
                .map(|part| Ok(Bytes::from_static(part)))
                .collect::<Vec<_>>(),
        )
    }

    async fn contents(parts: Vec<&'static [u8]>) -> Vec<Result<Option<String>>> {
        process_sse(body(parts))
            .map(|chunk| chunk.map(|c| c.content().map(str::to_string)))
            .collect()
            .await
    }

    #[tokio::test]
    async fn parse_chunks_until_done() {
        let events = contents(vec![
            &b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n"[..],
            &b"data: {\"choices\":[{\"delta\":{\"content\":\"He\"}}]}\n\n"[..],
            &b"data: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n\n"[..],
            &b"data: [DONE]\n\n"[..],
            &b"data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n"[..],
        ])
        .await;

        let events: Vec<Option<String>> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            events,
            vec![None, Some("He".to_string()), Some("llo".to_string())]
        );
    }

    #[tokio::test]
    async fn handle_split_frames_and_utf8() {
        // "é" is 0xC3 0xA9; split it across two reads.
        let events = contents(vec![
            &b"data: {\"choices\":[{\"delta\":{\"content\":\"caf\xC3"[..],
            &b"\xA9\"}}]}\n"[..],
            &b"\ndata: [DONE]\n\n"[..],
        ])
        .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().as_deref(), Some("café"));
    }

    #[tokio::test]
    async fn handle_crlf_and_comments() {
        let events = contents(vec![
            &b": keep-alive\r\n\r\n"[..],
            &b"data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\r\n\r\n"[..],
            &b"data: [DONE]\r\n\r\n"[..],
        ])
        .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn handle_trailing_frame_without_blank_line() {
        let events = contents(vec![&b"data: {\"choices\":[{\"delta\":{\"content\":\"end\"}}]}"[..]]).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().as_deref(), Some("end"));
    }

    #[tokio::test]
    async fn handle_malformed_chunk() {
        let events = contents(vec![&b"data: {not json\n\n"[..]]).await;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_err());
    }

    #[tokio::test]
    async fn handle_error_event() {
        let events = contents(vec![
            &b"data: {\"error\":{\"message\":\"model overloaded\",\"type\":\"server_error\"}}\n\n"[..],
        ])
        .await;
        assert_eq!(events.len(), 1);
        let err = events[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("model overloaded"));
    }

    #[tokio::test]
    async fn empty_body_yields_nothing() {
        let events = contents(vec![]).await;
        assert!(events.is_empty());
    }
}
