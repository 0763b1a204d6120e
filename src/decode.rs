//! Newline-delimited JSON response decoding.
//!
//! The model endpoint streams its answer as NDJSON records, each carrying an
//! optional `response` text fragment. Records are decoded line by line as
//! chunks arrive, so reassembly never has to wait for the full body. A
//! malformed line is logged and skipped; it never fails the whole decode.

use serde::Deserialize;
use tracing::warn;

/// One streamed record from the model endpoint.
#[derive(Debug, Deserialize)]
struct StreamRecord {
    #[serde(default)]
    response: Option<String>,
}

/// Incrementally reassembles streamed NDJSON into the response text.
///
/// Push raw byte chunks as they arrive; complete lines are decoded
/// immediately and their `response` fragments concatenated in input order.
#[derive(Debug, Default)]
pub(crate) struct StreamAccumulator {
    buffer: String,
    text: String,
    malformed: usize,
}

impl StreamAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk of the response body, decoding any completed lines.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            self.decode_line(line.trim_end_matches('\n').trim_end_matches('\r'));
        }
    }

    /// Decodes any buffered partial line and returns the assembled text.
    pub fn finish(mut self) -> String {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.decode_line(rest.trim_end_matches('\r'));
        }
        self.text
    }

    /// Number of lines skipped because they were not valid records.
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    fn decode_line(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<StreamRecord>(line) {
            Ok(record) => {
                if let Some(fragment) = record.response {
                    self.text.push_str(&fragment);
                }
            }
            Err(e) => {
                self.malformed += 1;
                warn!("Skipping malformed stream record: {e}");
            }
        }
    }
}

/// Decodes a fully buffered NDJSON body in one call.
#[cfg(test)]
pub(crate) fn decode_ndjson(raw: &str) -> String {
    let mut accumulator = StreamAccumulator::new();
    accumulator.push_chunk(raw.as_bytes());
    accumulator.finish()
}
