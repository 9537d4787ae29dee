//! HTTP client for a LiteFS node

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backoff::Backoff;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::events::Event;
use crate::monitor::PrimaryMonitor;
use crate::subscription::EventSubscription;

/// Channel capacity of [`Client::subscribe_channel`]
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;

/// Client for one LiteFS node
#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
    http: reqwest::Client,
}

impl Client {
    /// Create a client from a validated configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate().map_err(Error::Config)?;

        let http = reqwest::Client::builder()
            // No overall timeout - the event stream is long-lived
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self { config, http })
    }

    /// Create a client that sends requests through `http`
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Result<Self> {
        config.validate().map_err(Error::Config)?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Subscribe to the node's event stream
    ///
    /// No request is made until the first `next()`.
    pub fn subscribe_events(&self) -> EventSubscription {
        EventSubscription::new(self.http.clone(), self.config.events_url())
    }

    /// Subscribe to the node's event stream as a channel
    ///
    /// The returned subscription handle closes the stream; see
    /// [`EventSubscription::into_channel`].
    pub fn subscribe_channel(&self) -> (Arc<EventSubscription>, mpsc::Receiver<Result<Event>>) {
        let subscription = Arc::new(self.subscribe_events());
        let events = subscription.clone().into_channel(DEFAULT_CHANNEL_CAPACITY);
        (subscription, events)
    }

    /// Monitor the primary status of the cluster via the node's event stream
    ///
    /// Must be called from within a Tokio runtime.
    pub fn monitor_primary(&self) -> PrimaryMonitor {
        PrimaryMonitor::with_backoff(
            self.subscribe_events(),
            Backoff::new(self.config.retry_min_ms, self.config.retry_max_ms),
        )
    }
}

impl Default for Client {
    /// Client for the local node at [`DEFAULT_URL`](crate::config::DEFAULT_URL)
    fn default() -> Self {
        let config = ClientConfig::default();
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client settings");
                reqwest::Client::new()
            });

        Self { config, http }
    }
}

/// Subscribe to the local node's event stream
pub fn subscribe_events() -> EventSubscription {
    Client::default().subscribe_events()
}

/// Monitor the primary status through the local node
///
/// Must be called from within a Tokio runtime.
pub fn monitor_primary() -> PrimaryMonitor {
    Client::default().monitor_primary()
}
