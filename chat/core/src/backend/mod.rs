//! Chat Backend Integration
//!
//! Abstracted access to the trainer chat service through a common trait.
//!
//! # Usage
//!
//! ```ignore
//! use maumfit_chat::backend::{ChatBackend, ChatRequest, HttpChatBackend};
//!
//! let backend = HttpChatBackend::from_config(&config)?;
//! let request = ChatRequest::new(session_id, "하체 운동 추천해줘");
//! let mut rx = backend.send_streaming(&request).await?;
//! while let Some(update) = rx.recv().await {
//!     // StreamUpdate::Event / Complete / Error
//! }
//! ```

mod forward;
mod http;
mod traits;

pub use forward::spawn_event_forwarder;
pub use http::{HttpChatBackend, DEFAULT_CHANNEL_CAPACITY};
pub use traits::{ChatBackend, ChatRequest, GeoPoint, StreamUpdate};
