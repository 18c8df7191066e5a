//! maumfit Chat Core - Streaming Chat Pipeline for the AI Trainer
//!
//! This crate turns the streamed reply of the maumfit trainer service into an
//! ordered list of display messages, independent of any UI framework. It can
//! drive the terminal client, a web view, or run headless for tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Chat Surfaces                            │
//! │        ┌──────────────┐              ┌──────────────────┐        │
//! │        │  maumfit-chat │              │ Headless / Tests │        │
//! │        │    (CLI)      │              │                  │        │
//! │        └──────┬───────┘              └────────┬─────────┘        │
//! │               └──────────────┬────────────────┘                  │
//! │                   &[DisplayMessage] snapshots                    │
//! └──────────────────────────────┼───────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┼───────────────────────────────────┐
//! │                          CHAT CORE                               │
//! │  ┌───────────────────────────┴────────────────────────────────┐  │
//! │  │                       ChatSession                          │  │
//! │  │   ┌─────────────┐    ┌──────────────┐    ┌─────────────┐   │  │
//! │  │   │   Backend   │──► │   Decoder    │──► │  Assembler  │   │  │
//! │  │   │ (HTTP/mpsc) │    │ (bytes→event)│    │  (reducer)  │   │  │
//! │  │   └─────────────┘    └──────────────┘    └─────────────┘   │  │
//! │  └────────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ChatSession`]: One conversation; owns the message list
//! - [`StreamDecoder`]: Bytes in, [`ChatEvent`]s out, across arbitrary chunking
//! - [`MessageAssembler`]: Pure reducer from actions to message snapshots
//! - [`HttpChatBackend`]: The trainer service over HTTP
//! - [`DisplayMessage`]: What a surface renders
//!
//! # Quick Start
//!
//! ```ignore
//! use maumfit_chat::{load_config, ChatSession, HttpChatBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let backend = HttpChatBackend::from_config(&config)?;
//!     let mut session = ChatSession::new(&config);
//!
//!     session
//!         .run_exchange(&backend, "하체 운동 추천해줘", |messages| {
//!             // Render the snapshot
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`assembler`]: Message list reducer and terminal placement
//! - [`backend`]: Chat backend trait and HTTP implementation
//! - [`config`]: TOML configuration file support
//! - [`decoder`]: Incremental UTF-8, line and record decoding
//! - [`error`]: Error types
//! - [`events`]: Server events of a chat reply
//! - [`messages`]: Display messages and ids
//! - [`session`]: Chat session driving exchanges

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assembler;
pub mod backend;
pub mod config;
pub mod decoder;
pub mod error;
pub mod events;
pub mod messages;
pub mod session;

// Re-exports for convenience
pub use assembler::{reduce, ChatAction, MessageAssembler, TerminalPlacement, Transcript};
pub use backend::{
    spawn_event_forwarder, ChatBackend, ChatRequest, GeoPoint, HttpChatBackend, StreamUpdate,
};
pub use decoder::{parse_record, ChatEventStream, DecoderStats, StreamDecoder, Utf8Decoder};
pub use error::{ChatError, RecordError};
pub use events::ChatEvent;
pub use messages::{
    Attachments, DisplayMessage, MessageId, MessageKind, MessageRole, SessionId, Video, Voucher,
};
pub use session::{ChatSession, ExchangeOutcome, SessionState};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, load_config_with, ChatConfig,
    ChatConfigToml, ConfigError, ConfigOverrides, ConfigSource,
};
