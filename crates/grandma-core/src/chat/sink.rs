//! Stream relay and persistence sink.
//!
//! A [`StreamSink`] sits between a provider's delta stream and two
//! destinations with independent outcomes:
//!
//! - the live client [`DeltaRelay`]: every chunk is offered; failures are
//!   counted and the first one is kept, but ingestion continues so the full
//!   response still reaches storage after the client is gone.
//! - the assistant document: chunks accumulate in a buffer that is appended
//!   to the stored content once it holds `threshold` bytes. A failed append
//!   closes the sink for good.
//!
//! [`StreamSink::finish`] flushes the remainder exactly once.

use grandma_types::error::RepositoryError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chat::relay::{DeltaRelay, RelayError};
use crate::repository::document::DocumentRepository;

/// Default number of buffered bytes that triggers a storage append.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 100;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SinkError {
    #[error("failed to persist streamed content: {0}")]
    Storage(RepositoryError),

    #[error("sink closed after an earlier storage failure")]
    Closed,
}

/// What happened on each channel over the sink's lifetime.
#[derive(Debug, Clone, Default)]
pub struct SinkReport {
    pub chunks: usize,
    pub bytes_received: usize,
    pub bytes_persisted: usize,
    pub flushes: usize,
    pub relay_failures: usize,
    /// First relay failure, if any.
    pub relay_error: Option<RelayError>,
    /// The storage failure that closed the sink, if any.
    pub storage_error: Option<RepositoryError>,
}

pub struct StreamSink<'a, D: DocumentRepository, R: DeltaRelay> {
    documents: &'a D,
    document_id: Uuid,
    relay: R,
    buffer: String,
    threshold: usize,
    report: SinkReport,
}

impl<'a, D: DocumentRepository, R: DeltaRelay> StreamSink<'a, D, R> {
    pub fn new(documents: &'a D, document_id: Uuid, relay: R, threshold: usize) -> Self {
        Self {
            documents,
            document_id,
            relay,
            buffer: String::with_capacity(threshold.max(1) * 2),
            threshold: threshold.max(1),
            report: SinkReport::default(),
        }
    }

    /// True once any relay write has failed.
    pub fn relay_failed(&self) -> bool {
        self.report.relay_error.is_some()
    }

    pub fn report(&self) -> &SinkReport {
        &self.report
    }

    /// Relay `chunk` to the client and buffer it for storage.
    ///
    /// Relay failures are recorded and swallowed. A storage failure is
    /// returned once; every later call returns [`SinkError::Closed`] without
    /// touching either destination.
    pub async fn write(&mut self, chunk: &str) -> Result<(), SinkError> {
        if self.report.storage_error.is_some() {
            return Err(SinkError::Closed);
        }
        self.relay(chunk).await;
        self.persist(chunk).await
    }

    /// Offer `chunk` to the client, recording any failure.
    ///
    /// Cancel safe: dropping the future loses the chunk for the client only,
    /// so callers may race it against a deadline and still [`persist`] it.
    ///
    /// [`persist`]: StreamSink::persist
    pub async fn relay(&mut self, chunk: &str) {
        if let Err(err) = self.relay.relay(chunk).await {
            self.report.relay_failures += 1;
            if self.report.relay_error.is_none() {
                warn!(
                    document_id = %self.document_id,
                    error = %err,
                    "client relay failed, continuing to persist"
                );
                self.report.relay_error = Some(err);
            }
        }
    }

    /// Buffer `chunk` for storage, appending the buffer once it reaches the
    /// threshold.
    pub async fn persist(&mut self, chunk: &str) -> Result<(), SinkError> {
        if self.report.storage_error.is_some() {
            return Err(SinkError::Closed);
        }

        self.report.chunks += 1;
        self.report.bytes_received += chunk.len();

        self.buffer.push_str(chunk);
        if self.buffer.len() >= self.threshold {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        match self
            .documents
            .append_content(&self.document_id, &self.buffer)
            .await
        {
            Ok(()) => {
                self.report.bytes_persisted += self.buffer.len();
                self.report.flushes += 1;
                debug!(
                    document_id = %self.document_id,
                    bytes = self.buffer.len(),
                    "flushed stream buffer"
                );
                self.buffer.clear();
                Ok(())
            }
            Err(err) => {
                warn!(document_id = %self.document_id, error = %err, "stream buffer flush failed");
                self.report.storage_error = Some(err.clone());
                Err(SinkError::Storage(err))
            }
        }
    }

    /// Flush whatever is still buffered and hand back the relay with the
    /// final report.
    ///
    /// Skipped when an earlier flush already failed. A failure here is
    /// recorded in [`SinkReport::storage_error`].
    pub async fn finish(mut self) -> (R, SinkReport) {
        if self.report.storage_error.is_none() {
            // Recorded in the report on failure.
            let _ = self.flush().await;
        }
        (self.relay, self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::document::DocumentRepository;
    use crate::testing::{MemoryDocuments, RecordingRelay, StalledRelay};
    use grandma_types::chat::{Document, MessageRole};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn empty_assistant_doc(docs: &MemoryDocuments) -> Uuid {
        let doc = Document::new(Uuid::now_v7(), MessageRole::Assistant, "", "openai");
        let id = doc.id;
        docs.insert(doc);
        id
    }

    async fn run(docs: &MemoryDocuments, relay: RecordingRelay, chunks: &[String]) -> SinkReport {
        let id = empty_assistant_doc(docs);
        let mut sink = StreamSink::new(docs, id, relay, DEFAULT_FLUSH_THRESHOLD);
        for chunk in chunks {
            sink.write(chunk).await.unwrap();
        }
        let (_, report) = sink.finish().await;
        assert_eq!(docs.get(&id).await.unwrap().unwrap().content, chunks.concat());
        report
    }

    fn split_into(text: &str, size: usize) -> Vec<String> {
        text.chars()
            .collect::<Vec<_>>()
            .chunks(size)
            .map(|c| c.iter().collect())
            .collect()
    }

    #[tokio::test]
    async fn test_stored_content_matches_concatenation_for_any_chunking() {
        let text: String = (0..537).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        for size in [1, 7, 33, 99, 100, 101, 250, 537, 1000] {
            let docs = MemoryDocuments::default();
            let report = run(&docs, RecordingRelay::default(), &split_into(&text, size)).await;
            assert_eq!(report.bytes_persisted, text.len(), "chunk size {size}");
            assert_eq!(report.bytes_received, text.len());
        }
    }

    #[tokio::test]
    async fn test_multibyte_chunks_are_persisted_intact() {
        let text = "héllo wörld, 你好世界 🎉 ".repeat(12);
        let docs = MemoryDocuments::default();
        run(&docs, RecordingRelay::default(), &split_into(&text, 5)).await;
    }

    #[tokio::test]
    async fn test_flushes_once_threshold_is_reached() {
        let docs = MemoryDocuments::default();
        let id = empty_assistant_doc(&docs);
        let mut sink = StreamSink::new(&docs, id, RecordingRelay::default(), 10);

        sink.write("12345").await.unwrap();
        assert_eq!(docs.append_calls.load(Ordering::SeqCst), 0);
        sink.write("67890").await.unwrap();
        assert_eq!(docs.append_calls.load(Ordering::SeqCst), 1);
        assert_eq!(docs.get_sync(&id).unwrap().content, "1234567890");

        sink.write("abc").await.unwrap();
        let (_, report) = sink.finish().await;
        assert_eq!(report.flushes, 2);
        assert_eq!(docs.get_sync(&id).unwrap().content, "1234567890abc");
    }

    #[tokio::test]
    async fn test_finish_without_remainder_does_not_write() {
        let docs = MemoryDocuments::default();
        let id = empty_assistant_doc(&docs);
        let mut sink = StreamSink::new(&docs, id, RecordingRelay::default(), 4);
        sink.write("abcd").await.unwrap();
        let (_, report) = sink.finish().await;
        assert_eq!(report.flushes, 1);
        assert_eq!(docs.append_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_relay_failure_never_truncates_persistence() {
        let chunks: Vec<String> = (0..40).map(|i| format!("chunk-{i:02} ")).collect();
        let relay = RecordingRelay::failing_after(3);
        let docs = MemoryDocuments::default();

        let report = run(&docs, relay.clone(), &chunks).await;

        assert_eq!(relay.received(), chunks[..3].to_vec());
        // Every chunk is still offered to the relay.
        assert_eq!(relay.attempts.load(Ordering::SeqCst), chunks.len());
        assert_eq!(report.relay_failures, chunks.len() - 3);
        assert_eq!(report.relay_error, Some(RelayError::Disconnected));
        assert!(report.storage_error.is_none());
    }

    #[tokio::test]
    async fn test_storage_failure_closes_the_sink() {
        let docs = MemoryDocuments::default();
        docs.fail_append_at(1);
        let id = empty_assistant_doc(&docs);
        let relay = RecordingRelay::default();
        let mut sink = StreamSink::new(&docs, id, relay.clone(), 4);

        sink.write("ab").await.unwrap();
        let err = sink.write("cd").await.unwrap_err();
        assert!(matches!(err, SinkError::Storage(_)));

        assert!(matches!(sink.write("ef").await, Err(SinkError::Closed)));
        let (_, report) = sink.finish().await;

        assert_eq!(docs.append_calls.load(Ordering::SeqCst), 1);
        assert!(report.storage_error.is_some());
        assert_eq!(report.flushes, 0);
        assert_eq!(relay.received(), vec!["ab", "cd"]);
        assert_eq!(docs.get_sync(&id).unwrap().content, "");
    }

    #[tokio::test]
    async fn test_failure_in_final_flush_is_reported() {
        let docs = MemoryDocuments::default();
        docs.fail_append_at(1);
        let id = empty_assistant_doc(&docs);
        let mut sink = StreamSink::new(&docs, id, RecordingRelay::default(), 100);
        sink.write("short").await.unwrap();

        let (_, report) = sink.finish().await;
        assert!(report.storage_error.is_some());
        assert_eq!(report.bytes_persisted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_relay_still_persists_the_chunk() {
        let docs = MemoryDocuments::default();
        let id = empty_assistant_doc(&docs);
        let mut sink = StreamSink::new(&docs, id, StalledRelay, 100);

        let relayed = tokio::time::timeout(Duration::from_secs(5), sink.relay("kept")).await;
        assert!(relayed.is_err());
        sink.persist("kept").await.unwrap();

        let (_, report) = sink.finish().await;
        assert_eq!(report.relay_failures, 0);
        assert_eq!(docs.get_sync(&id).unwrap().content, "kept");
    }
}
