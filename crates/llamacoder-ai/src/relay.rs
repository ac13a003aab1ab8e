//! Forwards an upstream chunk stream to a downstream byte stream, one
//! `data: <json>\n\n` record per chunk, closed by `data: [DONE]\n\n`.
//!
//! Production runs in a spawned task that stops pulling from the upstream
//! as soon as the reader goes away, the abort handle fires or the deadline
//! passes. An upstream failure ends the output with a single error item and
//! no sentinel.

use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt as _;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::errors::{ConfigError, RelayError};

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";
pub const RECORD_TERMINATOR: &str = "\n\n";

/// Frames one chunk as an event-stream record.
pub fn encode_record<T: serde::Serialize + ?Sized>(chunk: &T) -> Result<Bytes, RelayError> {
    let json = serde_json::to_string(chunk).map_err(|e| RelayError::Encode(e.to_string()))?;
    let mut record =
        String::with_capacity(DATA_PREFIX.len() + json.len() + RECORD_TERMINATOR.len());
    record.push_str(DATA_PREFIX);
    record.push_str(&json);
    record.push_str(RECORD_TERMINATOR);
    Ok(Bytes::from(record))
}

/// The terminal `data: [DONE]` record.
pub fn sentinel_record() -> Bytes {
    Bytes::from(format!("{DATA_PREFIX}{DONE_SENTINEL}{RECORD_TERMINATOR}"))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayOptions {
    /// Records buffered between the producer task and the reader.
    pub buffer_capacity: usize,
    /// Overall deadline for the whole relay.
    pub timeout: Option<Duration>,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: 128,
            timeout: None,
        }
    }
}

impl RelayOptions {
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Handle used to stop a running relay.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Stops production. Records already buffered are still delivered; no
    /// sentinel follows them.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Downstream side of a relay.
pub struct RelayStream {
    rx: mpsc::Receiver<Result<Bytes, RelayError>>,
    abort_handle: AbortHandle,
}

impl RelayStream {
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Next framed record, or `None` once production has ended.
    pub async fn next_record(&mut self) -> Option<Result<Bytes, RelayError>> {
        self.rx.recv().await
    }
}

impl futures::Stream for RelayStream {
    type Item = Result<Bytes, RelayError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Starts relaying `upstream`. Must be called from within a tokio runtime.
pub fn relay<S, T, E>(upstream: S, options: RelayOptions) -> Result<RelayStream, ConfigError>
where
    S: futures::Stream<Item = Result<T, E>> + Send + 'static,
    T: serde::Serialize + Send + 'static,
    E: Display + Send + 'static,
{
    if options.buffer_capacity == 0 {
        return Err(ConfigError::Validation(
            "relay buffer_capacity must be greater than 0".into(),
        ));
    }
    let (tx, rx) = mpsc::channel(options.buffer_capacity);
    let (abort_tx, abort_rx) = watch::channel(false);
    tokio::spawn(relay_task(upstream, tx, abort_rx, options.timeout));
    Ok(RelayStream {
        rx,
        abort_handle: AbortHandle { tx: abort_tx },
    })
}

async fn relay_task<S, T, E>(
    upstream: S,
    tx: mpsc::Sender<Result<Bytes, RelayError>>,
    mut abort_rx: watch::Receiver<bool>,
    timeout: Option<Duration>,
) where
    S: futures::Stream<Item = Result<T, E>> + Send + 'static,
    T: serde::Serialize + Send + 'static,
    E: Display + Send + 'static,
{
    let mut upstream = std::pin::pin!(upstream);
    let deadline = timeout.map(|t| Instant::now() + t);
    let expired = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(expired);

    let mut records = 0_u64;
    loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => {
                debug!(records, "relay reader disconnected; releasing upstream");
                return;
            }
            _ = aborted(&mut abort_rx) => {
                debug!(records, "relay aborted; releasing upstream");
                return;
            }
            _ = &mut expired => {
                warn!(records, "relay timed out; releasing upstream");
                let _ = tx.try_send(Err(RelayError::TimedOut));
                return;
            }
            next = upstream.next() => next,
        };

        let (item, last) = match next {
            Some(Ok(chunk)) => match encode_record(&chunk) {
                Ok(record) => (Ok(record), false),
                Err(err) => {
                    warn!(records, error = %err, "relay failed to encode chunk");
                    (Err(err), true)
                }
            },
            Some(Err(err)) => {
                warn!(records, error = %err, "upstream failed mid-stream");
                (Err(RelayError::Upstream(err.to_string())), true)
            }
            None => (Ok(sentinel_record()), true),
        };

        // A full buffer must not hide an abort or the deadline.
        tokio::select! {
            biased;
            sent = tx.send(item) => {
                if sent.is_err() {
                    debug!(records, "relay reader disconnected; releasing upstream");
                    return;
                }
            }
            _ = aborted(&mut abort_rx) => {
                debug!(records, "relay aborted while the reader was behind");
                return;
            }
            _ = &mut expired => {
                warn!(records, "relay timed out while the reader was behind");
                return;
            }
        }

        if last {
            debug!(records, "relay finished");
            return;
        }
        records += 1;
    }
}

/// Resolves once the abort flag is set; never resolves if the handle is gone.
async fn aborted(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
