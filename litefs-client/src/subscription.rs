//! Event subscription with reconnect-on-next-read
//!
//! Connects to the node's `/events` endpoint on demand and decodes one event
//! per line of the streamed body. A failed read drops the connection and the
//! following `next()` opens a new one; there is no internal retry loop, the
//! caller decides when to try again.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use litefs_ndjson::LineParser;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::events::{Event, EventData};

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// One open response body and its decode cursor
struct Connection {
    body: ByteStream,
    parser: LineParser,
    lines: VecDeque<String>,
    finished: bool,
}

impl Connection {
    fn new(body: ByteStream) -> Self {
        Self {
            body,
            parser: LineParser::new(),
            lines: VecDeque::new(),
            finished: false,
        }
    }

    async fn next_event(&mut self) -> Result<Event> {
        loop {
            while let Some(line) = self.lines.pop_front() {
                if line.trim().is_empty() {
                    continue;
                }
                return Event::decode(&line);
            }

            if self.finished {
                return Err(Error::StreamEnded);
            }

            match self.body.next().await {
                Some(Ok(chunk)) => self.lines.extend(self.parser.feed(&chunk)),
                Some(Err(e)) => return Err(Error::Truncated(e.to_string())),
                None => {
                    self.finished = true;
                    // An object without its trailing newline still counts
                    // if it is complete.
                    if let Some(line) = self.parser.take_partial() {
                        return Event::decode(&line)
                            .map_err(|e| Error::Truncated(format!("unexpected EOF: {e}")));
                    }
                }
            }
        }
    }
}

/// A subscription to a LiteFS node's event stream
///
/// `next()` is meant for a single reader; concurrent callers are serialized.
/// `close()` may be called from anywhere and unblocks a pending `next()`.
pub struct EventSubscription {
    http: reqwest::Client,
    events_url: String,
    cancel: CancellationToken,
    conn: Mutex<Option<Connection>>,
}

impl EventSubscription {
    pub(crate) fn new(http: reqwest::Client, events_url: String) -> Self {
        Self {
            http,
            events_url,
            cancel: CancellationToken::new(),
            conn: Mutex::new(None),
        }
    }

    /// Read the next event, connecting first if no stream is open
    ///
    /// Any error drops the current connection; calling `next()` again starts
    /// a new request. Returns [`Error::Closed`] once the subscription is
    /// closed, including when `close()` interrupts this call.
    pub async fn next(&self) -> Result<Event> {
        if self.cancel.is_cancelled() {
            return Err(Error::Closed);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Closed),
            result = async {
                let mut slot = self.conn.lock().await;
                self.read_next(&mut slot).await
            } => result,
        }
    }

    async fn read_next(&self, slot: &mut Option<Connection>) -> Result<Event> {
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => match self.connect().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(url = %self.events_url, error = %e, "Failed to connect to events endpoint");
                    return Err(e);
                }
            },
        };

        match conn.next_event().await {
            Ok(event) => {
                if let EventData::Unknown { event_type } = &event.data {
                    tracing::debug!(event_type = %event_type, "Unknown event type, ignoring payload");
                }
                *slot = Some(conn);
                Ok(event)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Event stream read failed, dropping connection");
                Err(e)
            }
        }
    }

    async fn connect(&self) -> Result<Connection> {
        tracing::debug!(url = %self.events_url, "Connecting to events endpoint");

        let response = self.http.get(&self.events_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus(status.as_u16()));
        }

        tracing::info!(url = %self.events_url, "Connected to events endpoint");
        Ok(Connection::new(Box::pin(response.bytes_stream())))
    }

    /// Abort any in-progress request and release the open stream
    ///
    /// Idempotent. Every later `next()` returns [`Error::Closed`].
    pub fn close(&self) {
        self.cancel.cancel();

        // A reader holding the lock drops the connection itself when it
        // observes the cancellation.
        if let Ok(mut slot) = self.conn.try_lock() {
            slot.take();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once `close()` has been called
    pub async fn closed(&self) {
        self.cancel.cancelled().await
    }

    /// Push-based view of the subscription
    ///
    /// Spawns a task that feeds `next()` results into a bounded channel.
    /// Events and errors share the channel, so an error never overtakes the
    /// events read before it. The channel closes after [`Error::Closed`] has
    /// been delivered; dropping the receiver closes the subscription.
    pub fn into_channel(self: Arc<Self>, capacity: usize) -> mpsc::Receiver<Result<Event>> {
        let (tx, rx) = mpsc::channel(capacity.max(1));

        tokio::spawn(async move {
            loop {
                let result = tokio::select! {
                    result = self.next() => result,
                    _ = tx.closed() => break,
                };

                let closed = matches!(result, Err(Error::Closed));
                if tx.send(result).await.is_err() || closed {
                    break;
                }
            }
            self.close();
        });

        rx
    }
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("events_url", &self.events_url)
            .field("closed", &self.is_closed())
            .finish()
    }
}
