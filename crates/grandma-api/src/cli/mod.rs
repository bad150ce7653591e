//! CLI command definitions for the `grandma` binary.

pub mod chat;
pub mod conversation;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use uuid::Uuid;

/// Streaming chat relay with conversation history.
#[derive(Parser)]
#[command(name = "grandma", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Host to bind to (defaults to `server.host` from config.toml).
        #[arg(long, env = "GRANDMA_HOST")]
        host: Option<String>,

        /// Port to listen on (defaults to `server.port` from config.toml).
        #[arg(short, long, env = "GRANDMA_PORT")]
        port: Option<u16>,

        /// Export spans through OpenTelemetry (stdout exporter).
        #[arg(long)]
        otel: bool,

        /// Log format: `pretty` or `json`.
        #[arg(long, env = "GRANDMA_LOG_FORMAT", default_value = "pretty")]
        log_format: String,
    },

    /// Send one message and stream the reply to stdout.
    Chat {
        /// Model alias (openai, gpt-3.5-turbo, gpt-4, anthropic, claude).
        #[arg(short, long, default_value = "openai")]
        model: String,

        /// Continue an existing conversation.
        #[arg(short, long)]
        conversation: Option<Uuid>,

        /// The message to send.
        message: String,
    },

    /// List conversations, most recently active first.
    #[command(alias = "ls")]
    List {
        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "20")]
        page_size: u32,
    },

    /// Show a conversation with all of its documents.
    Show {
        id: Uuid,
    },

    /// Delete a conversation and its documents.
    #[command(alias = "rm")]
    Delete {
        id: Uuid,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions.
    Completions {
        shell: Shell,
    },
}
