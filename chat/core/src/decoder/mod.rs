//! Chat Stream Decoder
//!
//! Turns the raw body of a streaming chat response into typed
//! [`ChatEvent`](crate::events::ChatEvent)s.
//!
//! # Pipeline
//!
//! ```text
//! bytes ──► Utf8Decoder ──► line buffer ──► parse_record ──► ChatEvent
//!           (split chars)   (split on \n)   (data: + JSON)
//! ```
//!
//! Chunk boundaries are arbitrary: a record, or a single multi-byte
//! character, may span any number of reads. Malformed records are logged and
//! skipped; only a failing byte source ends a stream early.
//!
//! # Example
//!
//! ```ignore
//! use maumfit_chat::decoder::ChatEventStream;
//!
//! let mut events = ChatEventStream::new(response.bytes_stream());
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event?);
//! }
//! ```

mod record;
mod stream;
mod utf8;

pub use record::{parse_record, DATA_PREFIX};
pub use stream::{ChatEventStream, DecoderStats, StreamDecoder};
pub use utf8::Utf8Decoder;
