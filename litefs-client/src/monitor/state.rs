//! Leadership state shared between the monitor task and its readers

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::error::Error;

/// Leadership as last reported by the node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryStatus {
    pub is_primary: bool,
    /// Hostname of the current primary
    pub hostname: String,
}

#[derive(Debug, Default)]
struct Inner {
    status: PrimaryStatus,
    error: Option<Error>,
    closed: bool,
}

/// Written by the monitor task only, read by any number of callers
pub(super) struct SharedState {
    inner: RwLock<Inner>,
    ready: watch::Sender<bool>,
}

impl SharedState {
    pub(super) fn new() -> (Self, watch::Receiver<bool>) {
        let (ready, ready_rx) = watch::channel(false);
        let state = Self {
            inner: RwLock::new(Inner::default()),
            ready,
        };
        (state, ready_rx)
    }

    /// Replace the leadership and clear any recorded error
    pub(super) fn set_status(&self, is_primary: bool, hostname: &str) {
        let mut inner = self.inner.write();
        if inner.closed {
            return;
        }

        if inner.status.is_primary != is_primary || inner.status.hostname != hostname {
            tracing::info!(is_primary, hostname, "Primary status changed");
        }
        inner.status = PrimaryStatus {
            is_primary,
            hostname: hostname.to_string(),
        };
        inner.error = None;
    }

    /// Record a failure, keeping the last known leadership
    pub(super) fn set_error(&self, error: Error) {
        let mut inner = self.inner.write();
        if inner.closed {
            return;
        }

        tracing::debug!(error = %error, "Recorded monitor error, will reconnect");
        inner.error = Some(error);
    }

    /// Record closure; nothing recorded afterwards can clear it
    pub(super) fn set_closed(&self) {
        {
            let mut inner = self.inner.write();
            inner.closed = true;
            inner.error = Some(Error::Closed);
        }
        self.mark_ready();
    }

    /// Release the readiness gate; later calls are no-ops
    pub(super) fn mark_ready(&self) {
        self.ready.send_if_modified(|ready| !std::mem::replace(ready, true));
    }

    pub(super) fn last_error(&self) -> Option<Error> {
        self.inner.read().error.clone()
    }

    pub(super) fn observe<T>(&self, f: impl FnOnce(&PrimaryStatus) -> T) -> super::Observed<T> {
        let inner = self.inner.read();
        super::Observed {
            value: f(&inner.status),
            error: inner.error.clone(),
        }
    }
}
