//! Client-facing delta transport.

use tokio::sync::mpsc;

/// Failure writing a delta to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("client disconnected")]
    Disconnected,

    #[error("relay write failed: {0}")]
    Io(String),
}

/// Destination for live text deltas (an HTTP response body, a terminal).
pub trait DeltaRelay: Send {
    fn relay(
        &mut self,
        chunk: &str,
    ) -> impl std::future::Future<Output = Result<(), RelayError>> + Send;
}

/// The HTTP handler streams the receiving half as the response body; a
/// dropped receiver means the client went away.
impl DeltaRelay for mpsc::Sender<String> {
    async fn relay(&mut self, chunk: &str) -> Result<(), RelayError> {
        self.send(chunk.to_owned())
            .await
            .map_err(|_| RelayError::Disconnected)
    }
}
