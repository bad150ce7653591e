//! `grandma chat`: one exchange streamed to the terminal.
//!
//! Runs the same orchestrator as `POST /api/chat`, with stdout standing in
//! for the HTTP response body.

use std::io::Write;

use anyhow::Result;
use console::style;
use uuid::Uuid;

use grandma_core::chat::relay::{DeltaRelay, RelayError};
use grandma_types::chat::{ChatRequest, Message};

use crate::state::AppState;

/// Writes each delta to a sink (stdout in practice) and flushes it so the
/// reply appears as it is generated.
pub struct WriterRelay<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> WriterRelay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> DeltaRelay for WriterRelay<W> {
    async fn relay(&mut self, chunk: &str) -> Result<(), RelayError> {
        self.out
            .write_all(chunk.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::BrokenPipe => RelayError::Disconnected,
                _ => RelayError::Io(e.to_string()),
            })
    }
}

pub async fn send_message(
    state: &AppState,
    model: &str,
    conversation_id: Option<Uuid>,
    message: &str,
    json: bool,
) -> Result<()> {
    let request = ChatRequest {
        conversation_id,
        model: model.to_string(),
        messages: vec![Message::user(message)],
    };

    let cancel = state.shutdown.child_token();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    // With --json the reply is only reported in the outcome, not echoed.
    let outcome = if json {
        state
            .chat_service
            .send_message(request, WriterRelay::new(std::io::sink()), cancel)
            .await?
    } else {
        println!();
        let outcome = state
            .chat_service
            .send_message(request, WriterRelay::new(std::io::stdout()), cancel)
            .await?;
        println!();
        outcome
    };

    if json {
        let document = state.document_service.get(&outcome.document_id).await?;
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "outcome": outcome,
                "content": document.content,
            }))?
        );
        return Ok(());
    }

    println!();
    if let Some(error) = &outcome.stream_error {
        println!("  {} {}", style("!").yellow().bold(), style(error).yellow());
    }
    println!(
        "  {} {}",
        style("Conversation:").bold(),
        style(outcome.conversation_id.to_string()).dim()
    );
    println!(
        "  {}",
        style(format!(
            "Continue with: grandma chat -m {model} -c {} \"...\"",
            outcome.conversation_id
        ))
        .dim()
    );
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writer_relay_writes_in_order() {
        let mut relay = WriterRelay::new(Vec::new());
        relay.relay("Once upon ").await.unwrap();
        relay.relay("a time").await.unwrap();
        assert_eq!(relay.out, b"Once upon a time");
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_broken_pipe_is_disconnect() {
        let mut relay = WriterRelay::new(ClosedPipe);
        assert_eq!(relay.relay("x").await, Err(RelayError::Disconnected));
    }
}
