//! maumfit Chat - Terminal Surface for the AI Trainer
//!
//! Reads user lines from stdin, streams the trainer's reply and prints it as
//! it grows.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (~/.config/maumfit/chat.toml if present)
//! maumfit-chat
//!
//! # Against a local server, with a location
//! maumfit-chat --base-url http://localhost:8080 --lat 37.5665 --lng 126.978
//!
//! # Verbose logging (stderr)
//! RUST_LOG=debug maumfit-chat
//! ```
//!
//! # Commands
//!
//! - `/reset`: Start a new conversation
//! - `/quit`: Exit
//! - `Ctrl-C`: Cancel the reply in flight, or exit at the prompt

mod render;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use maumfit_chat::{
    load_config_with, ChatError, ChatSession, ConfigOverrides, ExchangeOutcome,
    HttpChatBackend, TerminalPlacement,
};

use render::TranscriptPrinter;

/// maumfit Chat - Talk to the AI trainer from a terminal
#[derive(Parser, Debug)]
#[command(name = "maumfit-chat")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "MAUMFIT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Chat service root URL
    #[arg(short = 'u', long, value_name = "URL")]
    base_url: Option<String>,

    /// Logged-in member id
    #[arg(short = 'm', long)]
    member_id: Option<i64>,

    /// Latitude sent with requests
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude sent with requests
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Where terminal replies go after partial text (append, replace)
    #[arg(long, value_name = "MODE")]
    placement: Option<TerminalPlacement>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "MAUMFIT_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref url) = self.base_url {
            overrides = overrides.with_base_url(url.clone());
        }
        if let Some(id) = self.member_id {
            overrides = overrides.with_member_id(id);
        }
        if let (Some(lat), Some(lng)) = (self.lat, self.lng) {
            overrides = overrides.with_location(lat, lng);
        }
        if let Some(placement) = self.placement {
            overrides = overrides.with_terminal_placement(placement);
        }
        overrides
    }
}

/// A line typed at the prompt
#[derive(Clone, Debug, PartialEq, Eq)]
enum Input {
    /// Text for the trainer
    Message(String),
    /// `/reset`
    Reset,
    /// `/quit` or `/exit`
    Quit,
}

impl Input {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "/reset" => Self::Reset,
            "/quit" | "/exit" => Self::Quit,
            _ => Self::Message(line.to_string()),
        }
    }
}

/// Initialize logging with the specified level
///
/// Logs go to stderr; stdout carries the conversation.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("maumfit_chat={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn emit(text: &str) {
    if text.is_empty() {
        return;
    }
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(text.as_bytes());
    let _ = stdout.flush();
}

fn prompt() {
    emit("> ");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config_path = args.config.clone().or_else(maumfit_chat::default_config_path);
    let config = load_config_with(config_path, &args.overrides(), |key| std::env::var(key).ok())
        .context("Failed to load configuration")?;

    info!(
        base_url = %config.base_url,
        source = %config.source,
        placement = ?config.terminal_placement,
        "maumfit chat starting"
    );

    let backend = HttpChatBackend::from_config(&config).context("Failed to create HTTP client")?;
    let mut session = ChatSession::new(&config);
    let mut printer = TranscriptPrinter::new();

    emit(&printer.update(session.messages()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt();

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                emit("\n");
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let text = match Input::parse(&line) {
            Input::Quit => break,
            Input::Reset => {
                session.reset_with(&backend).await;
                printer.clear();
                emit(&printer.update(session.messages()));
                continue;
            }
            Input::Message(text) => text,
        };

        let outcome = {
            let exchange = session.run_exchange(&backend, &text, |messages| {
                emit(&printer.update(messages));
            });

            tokio::select! {
                outcome = exchange => Some(outcome),
                _ = tokio::signal::ctrl_c() => None,
            }
        };

        match outcome {
            None => {
                session.cancel();
                emit("\n(cancelled)\n");
            }
            Some(Ok(ExchangeOutcome::Completed)) => {}
            Some(Ok(ExchangeOutcome::Failed(reason))) => {
                debug!(reason = %reason, "Exchange failed");
            }
            Some(Err(ChatError::EmptyInput)) => {}
            Some(Err(e)) => warn!(error = %e, "Message not sent"),
        }
    }

    info!(exchanges = session.exchange_count(), "maumfit chat stopped");
    Ok(())
}
