//! JSON Lines detection source
//!
//! Reads one [`DetectionBatch`] per line from any async reader (stdin, a
//! file, a pipe from the detector process).

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

use super::DetectionBatch;
use crate::Result;

/// Streams detection batches from newline-delimited JSON
pub struct JsonLinesSource<R> {
    lines: Lines<BufReader<R>>,
    line_no: usize,
}

impl<R: AsyncRead + Unpin> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            line_no: 0,
        }
    }

    /// Next batch, or `None` at end of input.
    ///
    /// Blank lines are skipped. Lines that fail to parse are logged and
    /// skipped; a bad frame from the detector is an input gap, not a failure.
    ///
    /// # Errors
    ///
    /// Returns error only if the underlying reader fails
    pub async fn next_batch(&mut self) -> Result<Option<DetectionBatch>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<DetectionBatch>(trimmed) {
                Ok(batch) => return Ok(Some(batch)),
                Err(e) => {
                    tracing::warn!(line = self.line_no, error = %e, "skipping malformed detection batch");
                }
            }
        }

        Ok(None)
    }
}
