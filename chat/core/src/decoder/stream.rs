//! Stream decoding
//!
//! [`StreamDecoder`] is the synchronous core: bytes in, events out, with all
//! buffering state held in the value. [`ChatEventStream`] drives it from an
//! asynchronous byte source one read at a time.

use std::collections::VecDeque;
use std::fmt::Display;

use futures::{Stream, StreamExt};
use tracing::{debug, trace, warn};

use super::record::parse_record;
use super::utf8::Utf8Decoder;
use crate::error::ChatError;
use crate::events::ChatEvent;

/// Counters for one decoded response
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Chunks fed in
    pub chunks: u64,
    /// Bytes fed in
    pub bytes: u64,
    /// Records turned into events
    pub records: u64,
    /// `data:` records dropped as malformed
    pub skipped: u64,
}

/// Reassembles newline-delimited `data:` records from arbitrary chunks
///
/// One decoder per response; it is not restartable once [`finish`] ran.
///
/// [`finish`]: StreamDecoder::finish
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Carries split multi-byte characters between chunks
    utf8: Utf8Decoder,
    /// Text after the last newline seen
    buffer: String,
    /// Counters
    stats: DecoderStats,
    /// Set once end-of-stream was processed
    finished: bool,
}

impl StreamDecoder {
    /// Create a fresh decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk and return every event completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ChatEvent> {
        if self.finished {
            debug!(len = chunk.len(), "Chunk after end of stream ignored");
            return Vec::new();
        }

        self.stats.chunks += 1;
        self.stats.bytes += chunk.len() as u64;

        let text = self.utf8.decode(chunk);
        self.buffer.push_str(&text);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            self.process_line(&line, &mut events);
        }
        events
    }

    /// Process end of stream
    ///
    /// Flushes the UTF-8 decoder and treats a non-blank remainder as one last
    /// line. Subsequent calls return nothing.
    pub fn finish(&mut self) -> Vec<ChatEvent> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;

        let flushed = self.utf8.finish();
        self.buffer.push_str(&flushed);

        let mut events = Vec::new();
        let rest = std::mem::take(&mut self.buffer);
        if !rest.trim().is_empty() {
            self.process_line(&rest, &mut events);
        }

        debug!(
            chunks = self.stats.chunks,
            records = self.stats.records,
            skipped = self.stats.skipped,
            "Chat stream decoded"
        );
        events
    }

    /// Whether [`finish`](Self::finish) has run
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Text held back waiting for a newline
    #[must_use]
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Counters so far
    #[must_use]
    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<ChatEvent>) {
        match parse_record(line) {
            Ok(Some(event)) => {
                self.stats.records += 1;
                trace!(?event, "Decoded chat record");
                events.push(event);
            }
            Ok(None) => {}
            Err(e) => {
                self.stats.skipped += 1;
                warn!(error = %e, "Skipping malformed chat record");
            }
        }
    }
}

/// Lazy, pull-based event stream over an asynchronous byte source
///
/// Each call to [`next`](Self::next) reads from the source only when no
/// decoded event is waiting. A read error is yielded once and the stream is
/// then exhausted; dropping the value releases the source.
pub struct ChatEventStream<S> {
    /// `None` once the source ended, failed or was closed
    source: Option<S>,
    decoder: StreamDecoder,
    pending: VecDeque<ChatEvent>,
}

impl<S, B, E> ChatEventStream<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    /// Wrap a byte source
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            decoder: StreamDecoder::new(),
            pending: VecDeque::new(),
        }
    }

    /// Next event, `None` once the stream is complete
    pub async fn next(&mut self) -> Option<Result<ChatEvent, ChatError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }

            let source = self.source.as_mut()?;
            match source.next().await {
                Some(Ok(chunk)) => {
                    let events = self.decoder.feed(chunk.as_ref());
                    self.pending.extend(events);
                }
                Some(Err(e)) => {
                    self.source = None;
                    return Some(Err(ChatError::Transport(e.to_string())));
                }
                None => {
                    self.source = None;
                    let events = self.decoder.finish();
                    self.pending.extend(events);
                }
            }
        }
    }

    /// Stop reading and release the source
    ///
    /// Events already decoded but not yet taken are discarded.
    pub fn close(&mut self) {
        if self.source.take().is_some() {
            debug!(
                discarded = self.pending.len(),
                "Chat event stream closed early"
            );
        }
        self.pending.clear();
    }

    /// Whether the source is gone and nothing is left to yield
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.source.is_none() && self.pending.is_empty()
    }

    /// Decoder counters
    #[must_use]
    pub fn stats(&self) -> &DecoderStats {
        self.decoder.stats()
    }

    /// Adapt into a [`futures::Stream`]
    pub fn into_stream(self) -> impl Stream<Item = Result<ChatEvent, ChatError>> {
        futures::stream::unfold(self, |mut events| async move {
            events.next().await.map(|item| (item, events))
        })
    }
}
