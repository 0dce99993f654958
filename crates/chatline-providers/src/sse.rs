//! Line-framed event stream decoder.
//!
//! The chat endpoint frames every chunk as a single `data:` line:
//!
//! ```text
//! data: Hello\nworld      <- content, "\n" escaped as backslash + n
//! data: [DONE]            <- success sentinel
//! data: [ERROR: boom]     <- failure sentinel
//! ```
//!
//! Bytes arrive in arbitrary fragments, so the decoder carries incomplete
//! UTF-8 sequences and incomplete lines between calls.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use chatline_types::{ProviderError, ProviderResult, StreamEvent};
use futures_util::Stream;

const DATA_FIELD: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";
const ERROR_SENTINEL: &str = "[ERROR:";

/// Incremental decoder from raw bytes to [`StreamEvent`]s.
///
/// Once a sentinel has been decoded the decoder halts: the rest of the
/// current read is discarded and later calls return nothing.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Trailing bytes of an incomplete UTF-8 sequence.
    carry: Vec<u8>,
    /// Decoded text not yet terminated by a newline.
    line: String,
    halted: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once a sentinel was seen or `finish` was called.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Decodes one chunk, returning every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if self.halted {
            return Vec::new();
        }
        self.carry.extend_from_slice(chunk);
        self.decode_carry();
        self.drain_lines()
    }

    /// Flushes buffered input at end of stream.
    ///
    /// A dangling partial character decodes to U+FFFD and an unterminated
    /// final line is processed as if it had a newline.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.halted {
            return Vec::new();
        }
        if !self.carry.is_empty() {
            let rest = std::mem::take(&mut self.carry);
            self.line.push_str(&String::from_utf8_lossy(&rest));
        }

        let mut events = self.drain_lines();
        if !self.halted && !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            events.extend(parse_line(trim_cr(&line)));
        }
        self.halt();
        events
    }

    /// Moves every decodable byte from `carry` into `line`.
    fn decode_carry(&mut self) {
        let mut start = 0;
        while start < self.carry.len() {
            match std::str::from_utf8(&self.carry[start..]) {
                Ok(text) => {
                    self.line.push_str(text);
                    start = self.carry.len();
                }
                Err(err) => {
                    let valid_end = start + err.valid_up_to();
                    self.line
                        .push_str(&String::from_utf8_lossy(&self.carry[start..valid_end]));
                    match err.error_len() {
                        Some(len) => {
                            self.line.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.carry.drain(..start);
    }

    fn drain_lines(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while !self.halted {
            let Some(newline) = self.line.find('\n') else {
                break;
            };
            let line: String = self.line.drain(..=newline).collect();
            let Some(event) = parse_line(trim_cr(&line[..newline])) else {
                continue;
            };
            if event.is_terminal() {
                self.halt();
            }
            events.push(event);
        }
        events
    }

    fn halt(&mut self) {
        self.halted = true;
        self.carry.clear();
        self.line.clear();
    }
}

fn trim_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Parses one complete line (without its terminator).
///
/// Returns `None` for lines that carry no event: comments, other fields,
/// blank separators, and empty keep-alive payloads.
pub fn parse_line(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix(DATA_FIELD)?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload);

    if payload.trim() == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }
    if let Some(rest) = payload.strip_prefix(ERROR_SENTINEL) {
        let rest = rest.trim();
        let detail = rest.strip_suffix(']').unwrap_or(rest).trim();
        return Some(StreamEvent::Error {
            detail: detail.to_string(),
        });
    }
    if payload.is_empty() {
        return None;
    }
    Some(StreamEvent::Data(unescape_payload(payload)))
}

/// Turns the two-character sequence `\n` back into a line break.
fn unescape_payload(payload: &str) -> String {
    payload.replace("\\n", "\n")
}

/// Stream adapter that decodes a byte stream into [`StreamEvent`]s.
///
/// Stops polling the inner stream after a sentinel, so anything the server
/// sends afterwards is never read.
pub struct SseParser<S> {
    inner: S,
    decoder: SseDecoder,
    pending: VecDeque<StreamEvent>,
    exhausted: bool,
}

impl<S> SseParser<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            exhausted: false,
        }
    }
}

impl<S, E> Stream for SseParser<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    type Item = ProviderResult<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }
            if self.exhausted {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let events = self.decoder.feed(&bytes);
                    self.pending.extend(events);
                    if self.decoder.is_halted() {
                        self.exhausted = true;
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    self.exhausted = true;
                    return Poll::Ready(Some(Err(ProviderError::transport(format!(
                        "Stream error: {e}"
                    )))));
                }
                Poll::Ready(None) => {
                    let events = self.decoder.finish();
                    self.pending.extend(events);
                    self.exhausted = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
