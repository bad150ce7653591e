//! Line-oriented streaming over a reqwest response body.
//!
//! Both provider wire formats are newline-delimited text. Body chunks are
//! split on `\n` at the byte level and only complete lines are decoded, so
//! a JSON object or a multi-byte character that straddles two network reads
//! is reassembled before anyone looks at it.

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use grandma_core::llm::provider::DeltaStream;
use grandma_types::llm::LlmError;

/// What a decoder made of one line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LineOutcome {
    /// Nothing to emit (keep-alive, metadata, unparseable noise).
    Skip,
    Delta(String),
    /// Terminal marker; the stream ends successfully.
    Done,
    /// Terminal error reported in-band by the provider.
    Fail(LlmError),
}

/// Accumulates body bytes and yields complete lines.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Feed `bytes`, returning every line completed by them (without the
    /// trailing `\n` or `\r\n`).
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&line[..line.len() - 1]));
        }
        lines
    }

    /// The unterminated tail left at end of body, if any.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let tail = std::mem::take(&mut self.pending);
        Some(decode_line(&tail))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Turn a non-2xx response into [`LlmError::Upstream`].
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = %status, body = %body, "provider returned an error response");
    Err(LlmError::Upstream {
        status: status.as_u16(),
        body,
    })
}

pub(crate) fn transport_error(e: reqwest::Error) -> LlmError {
    LlmError::Transport(e.to_string())
}

/// Send `request` and decode the response body line by line.
///
/// The cancellation token is checked while waiting for the response and
/// between body reads; a cancelled stream ends with [`LlmError::Cancelled`].
pub(crate) fn line_stream(
    request: reqwest::RequestBuilder,
    cancel: CancellationToken,
    decode: fn(&str) -> LineOutcome,
) -> DeltaStream {
    Box::pin(async_stream::try_stream! {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LlmError::Cancelled),
            sent = request.send() => sent.map_err(transport_error),
        }?;
        let response = check_status(response).await?;

        let mut body = response.bytes_stream();
        let mut buffer = LineBuffer::default();
        let mut finished = false;

        while !finished {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(LlmError::Cancelled),
                next = body.next() => Ok(next),
            }?;

            let lines = match next {
                Some(chunk) => {
                    let chunk = chunk
                        .map_err(|e| LlmError::Transport(format!("response body read: {e}")))?;
                    buffer.push(&chunk)
                }
                None => {
                    finished = true;
                    buffer.finish().into_iter().collect()
                }
            };

            for line in lines {
                match decode(&line) {
                    LineOutcome::Skip => {}
                    LineOutcome::Delta(text) => yield text,
                    LineOutcome::Done => {
                        finished = true;
                        break;
                    }
                    LineOutcome::Fail(err) => Err(err)?,
                }
            }
        }
    })
}
