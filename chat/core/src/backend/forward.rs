//! Event forwarding task
//!
//! Decodes a byte source on a spawned task and hands the results to the
//! session over a bounded channel. The task stops reading as soon as the
//! receiver goes away, which is how an exchange is cancelled.

use std::fmt::Display;

use futures::Stream;
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::traits::StreamUpdate;
use crate::decoder::ChatEventStream;

/// Spawn a task decoding `source` into [`StreamUpdate`]s
///
/// The channel yields events in stream order followed by exactly one
/// `Complete` or `Error`, unless the receiver is dropped first.
pub fn spawn_event_forwarder<S, B, E>(source: S, capacity: usize) -> mpsc::Receiver<StreamUpdate>
where
    S: Stream<Item = Result<B, E>> + Unpin + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(forward_events(ChatEventStream::new(source), tx));
    rx
}

async fn forward_events<S, B, E>(mut events: ChatEventStream<S>, tx: mpsc::Sender<StreamUpdate>)
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    loop {
        let next = tokio::select! {
            () = tx.closed() => {
                debug!("Chat receiver dropped, releasing response");
                return;
            }
            next = events.next() => next,
        };

        let update = match next {
            Some(Ok(event)) => StreamUpdate::Event(event),
            Some(Err(e)) => {
                error!(error = %e, "Chat stream failed");
                let _ = tx.send(StreamUpdate::Error(e.to_string())).await;
                return;
            }
            None => {
                debug!(records = events.stats().records, "Chat stream complete");
                let _ = tx.send(StreamUpdate::Complete).await;
                return;
            }
        };

        if tx.send(update).await.is_err() {
            debug!("Chat receiver dropped, releasing response");
            return;
        }
    }
}
