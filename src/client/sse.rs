//! Server-sent events decoding for streamed chat completions.

use async_stream::stream;
use futures_util::stream::Stream;
use futures_util::StreamExt;

use super::{BackendError, ChunkStream};
use crate::models::ChatChunk;

/// Terminal payload of an OpenAI-style event stream
const DONE_MARKER: &str = "[DONE]";

/// Buffer for SSE byte stream parsing
///
/// Bytes are kept raw until a full line is available, so a multi-byte
/// character split across reads is decoded only once it is complete.
#[derive(Debug, Default)]
pub struct SseBuffer {
    buffer: Vec<u8>,
}

impl SseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes to the buffer
    pub fn push_bytes(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Extract complete newline-terminated lines; partial trailing data stays buffered
    pub fn extract_lines(&mut self) -> Result<Vec<String>, BackendError> {
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(decode_line(line)?);
        }
        Ok(lines)
    }

    /// Take whatever incomplete data is left
    pub fn take_residue(&mut self) -> Result<String, BackendError> {
        decode_line(std::mem::take(&mut self.buffer))
    }
}

fn decode_line(bytes: Vec<u8>) -> Result<String, BackendError> {
    String::from_utf8(bytes)
        .map_err(|e| BackendError::Parse(format!("Invalid UTF-8 in event stream: {}", e)))
}

/// One interpreted SSE line
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// A decoded `data:` payload
    Data(ChatChunk),
    /// The `[DONE]` marker
    Done,
    /// Blank line, comment, or a field other than `data`
    Skip,
}

/// Interpret a single SSE line
pub fn parse_sse_line(line: &str) -> Result<SseLine, BackendError> {
    let line = line.trim_end();
    if line.is_empty() || line.starts_with(':') {
        return Ok(SseLine::Skip);
    }

    let (field, value) = match line.split_once(':') {
        Some((field, value)) => (field.trim(), value.trim_start()),
        None => (line, ""),
    };

    if field != "data" {
        return Ok(SseLine::Skip);
    }
    if value == DONE_MARKER {
        return Ok(SseLine::Done);
    }
    if value.is_empty() {
        return Ok(SseLine::Skip);
    }

    Ok(SseLine::Data(serde_json::from_str(value)?))
}

/// Decode a byte stream into chat chunks, ending at `[DONE]` or end of body
///
/// The first transport or decode error is yielded and ends the stream.
pub fn sse_chunks<S, B, E>(bytes: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<BackendError> + Send + 'static,
{
    Box::pin(stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer = SseBuffer::new();

        while let Some(next) = bytes.next().await {
            let chunk = match next {
                Ok(chunk) => chunk,
                Err(e) => {
                    let error: BackendError = e.into();
                    yield Err(error);
                    return;
                }
            };
            buffer.push_bytes(chunk.as_ref());

            let lines = match buffer.extract_lines() {
                Ok(lines) => lines,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            for line in lines {
                match parse_sse_line(&line) {
                    Ok(SseLine::Data(chunk)) => yield Ok(chunk),
                    Ok(SseLine::Done) => return,
                    Ok(SseLine::Skip) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        // Body ended without a trailing newline
        let residue = match buffer.take_residue() {
            Ok(residue) => residue,
            Err(e) => {
                yield Err(e);
                return;
            }
        };
        match parse_sse_line(&residue) {
            Ok(SseLine::Data(chunk)) => yield Ok(chunk),
            Ok(_) => {}
            Err(e) => yield Err(e),
        }
    })
}
