//! Streaming relay from an upstream body to a downstream response
//!
//! A spawned pump pulls chunks from the upstream stream and pushes them into
//! a small bounded channel that backs the response body. A full channel
//! stalls the pump, so upstream is read no faster than the client drains.
//! Dropping the response body closes the channel and the pump releases the
//! upstream stream.

use std::io;
use std::pin::Pin;

use axum::body::Body;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::domain::DomainError;

/// Stream type for upstream response bodies
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, DomainError>> + Send>>;

/// Chunks buffered between the pump and the client
const RELAY_CAPACITY: usize = 4;

/// Pipe `upstream` into a response body, chunk for chunk
pub fn relay<S>(upstream: S) -> Body
where
    S: Stream<Item = Result<Bytes, DomainError>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Result<Bytes, io::Error>>(RELAY_CAPACITY);
    tokio::spawn(pump(Box::pin(upstream), tx));
    Body::from_stream(ReceiverStream::new(rx))
}

async fn pump(mut upstream: ByteStream, tx: mpsc::Sender<Result<Bytes, io::Error>>) {
    let mut chunks = 0usize;

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                debug!(chunks, "Client disconnected, releasing upstream stream");
                return;
            }
            next = upstream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                chunks += 1;
                if tx.send(Ok(chunk)).await.is_err() {
                    debug!(chunks, "Client disconnected, releasing upstream stream");
                    return;
                }
            }
            Some(Err(e)) => {
                warn!(chunks, error = %e, "Upstream stream failed, aborting response");
                let _ = tx.send(Err(io::Error::other(e.to_string()))).await;
                return;
            }
            None => {
                debug!(chunks, "Upstream stream complete");
                return;
            }
        }
    }
}
