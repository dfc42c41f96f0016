//! Incremental decoder for the relayed event stream.
//!
//! Bytes arrive in arbitrary network-sized pieces. The decoder turns them
//! into text, cuts complete lines off the front of its buffer and yields the
//! text deltas carried by `data:` frames, in wire order.

use log::debug;
use serde_json::Value as JsonValue;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";
const DELTA_POINTER: &str = "/choices/0/delta/content";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("data frame still unparseable after {reads} further reads: {frame}")]
    MalformedFrame {
        frame: String,
        reads: u32,
    },
}

#[derive(Debug)]
pub struct FrameDecoder {
    /// Trailing bytes of a code point split across reads.
    pending: Vec<u8>,
    buffer: String,
    max_frame_retries: u32,
    /// Reads spent waiting on a frame that failed to parse.
    stalled_reads: Option<u32>,
    done: bool,
}

impl FrameDecoder {
    pub fn new(max_frame_retries: u32) -> Self {
        Self {
            pending: Vec::new(),
            buffer: String::new(),
            max_frame_retries,
            stalled_reads: None,
            done: false,
        }
    }

    /// True once the terminal sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feeds one network read and returns the deltas it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, DecodeError> {
        if self.done {
            return Ok(Vec::new());
        }

        self.decode_utf8(chunk);

        if let Some(reads) = self.stalled_reads.as_mut() {
            *reads += 1;
        }

        self.drain_lines()
    }

    /// Ends the stream. An unterminated trailing line is dropped; a data
    /// frame still waiting to parse is reported as malformed.
    pub fn finish(&mut self) -> Result<(), DecodeError> {
        let stalled = self.stalled_reads.take().map(|reads| {
            let line = self.buffer.split('\n').next().unwrap_or_default();
            let frame = line.strip_prefix(DATA_PREFIX).unwrap_or(line).trim().to_string();
            DecodeError::MalformedFrame { frame, reads }
        });
        self.discard();

        match stalled {
            Some(err) if !self.done => Err(err),
            _ => Ok(()),
        }
    }

    fn discard(&mut self) {
        if !self.pending.is_empty() || !self.buffer.is_empty() {
            debug!(
                "Discarding {} undecoded bytes at end of stream",
                self.pending.len() + self.buffer.len()
            );
        }
        self.pending.clear();
        self.buffer.clear();
        self.stalled_reads = None;
    }

    fn decode_utf8(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.buffer.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // Incomplete sequence at the end: wait for the next read.
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }

    fn drain_lines(&mut self) -> Result<Vec<String>, DecodeError> {
        let mut deltas = Vec::new();

        while let Some(newline) = self.buffer.find('\n') {
            let raw: String = self.buffer.drain(..=newline).collect();
            let line = raw[..raw.len() - 1].strip_suffix('\r').unwrap_or(&raw[..raw.len() - 1]);

            if line.starts_with(':') || line.trim().is_empty() {
                continue;
            }
            let Some(data) = line.strip_prefix(DATA_PREFIX) else {
                debug!("Skipping non-data line: {}", line);
                continue;
            };

            let data = data.trim();
            if data == DONE_SENTINEL {
                self.done = true;
                self.discard();
                break;
            }

            match serde_json::from_str::<JsonValue>(data) {
                Ok(frame) => {
                    self.stalled_reads = None;
                    if let Some(delta) = frame.pointer(DELTA_POINTER).and_then(JsonValue::as_str) {
                        if !delta.is_empty() {
                            deltas.push(delta.to_string());
                        }
                    }
                }
                Err(e) => {
                    let reads = self.stalled_reads.unwrap_or(0);
                    if reads >= self.max_frame_retries {
                        return Err(DecodeError::MalformedFrame { frame: data.to_string(), reads });
                    }

                    debug!("Incomplete frame ({}), waiting for more bytes", e);
                    self.buffer.insert_str(0, &raw);
                    self.stalled_reads = Some(reads);
                    break;
                }
            }
        }

        Ok(deltas)
    }
}
