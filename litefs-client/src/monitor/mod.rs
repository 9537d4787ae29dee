//! Primary monitor
//!
//! Follows a node's event stream in a background task and caches the
//! cluster's leadership. Readers never block on the network: they get the
//! last known leadership together with the most recent error, if any.

mod state;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backoff::Backoff;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::subscription::EventSubscription;

pub use state::PrimaryStatus;
use state::SharedState;

/// A value read from the monitor, plus the failure that may have made it stale
///
/// `error` is `None` when the value reflects the latest event. Otherwise the
/// value is the last one received before `error` occurred.
#[derive(Debug, Clone)]
pub struct Observed<T> {
    pub value: T,
    pub error: Option<Error>,
}

impl<T> Observed<T> {
    pub fn is_stale(&self) -> bool {
        self.error.is_some()
    }

    /// Discard the stale value if an error is attached
    pub fn into_result(self) -> Result<T> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.value),
        }
    }
}

/// Monitors the current primary of the LiteFS cluster
///
/// Created with a running background task; dropping the monitor closes it.
pub struct PrimaryMonitor {
    subscription: Arc<EventSubscription>,
    shared: Arc<SharedState>,
    ready: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl PrimaryMonitor {
    /// Start monitoring with the default retry floor
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(subscription: EventSubscription) -> Self {
        let config = ClientConfig::default();
        Self::with_backoff(
            subscription,
            Backoff::new(config.retry_min_ms, config.retry_max_ms),
        )
    }

    /// Start monitoring, pacing consecutive failures with `backoff`
    pub fn with_backoff(subscription: EventSubscription, backoff: Backoff) -> Self {
        let subscription = Arc::new(subscription);
        let (shared, ready) = SharedState::new();
        let shared = Arc::new(shared);

        let task = tokio::spawn(run(subscription.clone(), shared.clone(), backoff));

        Self {
            subscription,
            shared,
            ready,
            task,
        }
    }

    /// Wait until the first event or error has been received
    ///
    /// Returns the error if the first outcome was a failure. Cancel-safe; wrap
    /// in your own timeout or `select!`, or use [`wait_ready`](Self::wait_ready).
    pub async fn ready(&self) -> Result<()> {
        let mut ready = self.ready.clone();
        if ready.wait_for(|ready| *ready).await.is_err() {
            return Err(Error::Closed);
        }
        self.shared.last_error().map_or(Ok(()), Err)
    }

    /// [`ready`](Self::ready) bounded by `timeout`
    ///
    /// Returns [`Error::DeadlineExceeded`] if nothing arrived in time; the
    /// monitor itself is unaffected.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.ready())
            .await
            .map_err(|_| Error::DeadlineExceeded)?
    }

    /// Whether this node is the primary
    ///
    /// [`Error::NotReady`] before the first event; afterwards the most recent
    /// value together with the most recent error, if any.
    pub fn is_primary(&self) -> Result<Observed<bool>> {
        self.observe(|status| status.is_primary)
    }

    /// Hostname of the current primary, same contract as [`is_primary`](Self::is_primary)
    pub fn hostname(&self) -> Result<Observed<String>> {
        self.observe(|status| status.hostname.clone())
    }

    /// Both fields from one consistent snapshot
    pub fn status(&self) -> Result<Observed<PrimaryStatus>> {
        self.observe(PrimaryStatus::clone)
    }

    fn observe<T>(&self, f: impl FnOnce(&PrimaryStatus) -> T) -> Result<Observed<T>> {
        if !*self.ready.borrow() {
            return Err(Error::NotReady);
        }
        Ok(self.shared.observe(f))
    }

    /// Unsubscribe from the node's event stream
    ///
    /// Pending and later readers see [`Error::Closed`] alongside the last
    /// known values. Idempotent.
    pub fn close(&self) {
        self.subscription.close();
        self.shared.set_closed();
    }

    /// Whether the background task is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PrimaryMonitor {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for PrimaryMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimaryMonitor")
            .field("subscription", &self.subscription)
            .field("ready", &*self.ready.borrow())
            .finish()
    }
}

async fn run(subscription: Arc<EventSubscription>, shared: Arc<SharedState>, mut backoff: Backoff) {
    loop {
        match subscription.next().await {
            Ok(event) => {
                backoff.reset();
                if let Some((is_primary, hostname)) = event.leadership() {
                    shared.set_status(is_primary, hostname);
                }
            }
            Err(Error::Closed) => {
                shared.set_closed();
                break;
            }
            Err(e) => {
                shared.set_error(e);
                if let Some(delay) = backoff.on_failure() {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = subscription.closed() => {}
                    }
                }
            }
        }

        shared.mark_ready();
    }

    tracing::debug!("Primary monitor stopped");
}
