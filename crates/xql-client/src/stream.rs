use std::io::Read;

use flate2::read::GzDecoder;
use tracing::{debug, warn};

use crate::client::XqlClient;
use crate::endpoints::Endpoint;
use crate::error::XqlError;
use crate::http::Transport;
use crate::types::{Record, StreamHandle};
use crate::wire::{self, GetStreamRequest};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOptions {
    /// Ask the server to gzip the stream body and inflate it locally.
    pub gzip: bool,
}

impl<T: Transport> XqlClient<T> {
    /// Downloads a large result set in one response and decodes it line by line.
    pub fn fetch_stream(&self, handle: &StreamHandle) -> Result<Vec<Record>, XqlError> {
        let gzip = self.stream_options().gzip;
        let body = wire::encode(GetStreamRequest {
            stream_id: handle.as_str(),
            is_gzip_compressed: gzip,
        })?;

        let response = self
            .transport()
            .post_json(Endpoint::GetQueryResultsStream, &body)?;
        if !response.is_ok() {
            warn!(stream_id = %handle, status = response.status, "xql stream fetch rejected");
            return Err(XqlError::StreamFetchFailed {
                status: response.status,
                body: response.text_lossy(),
            });
        }

        let records = if gzip {
            decode_lines(&gunzip(&response.body)?)?
        } else {
            decode_lines(&response.body)?
        };
        debug!(stream_id = %handle, records = records.len(), "xql stream decoded");
        Ok(records)
    }
}

/// Decodes newline-delimited JSON. Blank lines are skipped; any other
/// newline-terminated line that fails to parse fails the whole batch with its
/// 1-based line number. An unterminated final segment that does not parse is
/// treated as a cut-off trailing line and dropped.
pub fn decode_lines(body: &[u8]) -> Result<Vec<Record>, XqlError> {
    let segments: Vec<&[u8]> = body.split(|byte| *byte == b'\n').collect();
    let last = segments.len() - 1;

    let mut records = Vec::new();
    for (index, raw) in segments.into_iter().enumerate() {
        let line = raw.strip_suffix(b"\r").unwrap_or(raw);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<Record>(line) {
            Ok(record) => records.push(record),
            Err(err) if index == last => {
                warn!(
                    line = index + 1,
                    error = %err,
                    "skipping unterminated trailing stream line"
                );
            }
            Err(err) => {
                return Err(XqlError::StreamDecodeError {
                    line: index + 1,
                    message: err.to_string(),
                });
            }
        }
    }
    Ok(records)
}

fn gunzip(body: &[u8]) -> Result<Vec<u8>, XqlError> {
    let mut out = Vec::new();
    GzDecoder::new(body)
        .read_to_end(&mut out)
        .map_err(|err| XqlError::StreamDecodeError {
            line: 0,
            message: format!("gzip: {err}"),
        })?;
    Ok(out)
}
