//! LiteFS client
//!
//! Watches the leadership of a LiteFS cluster from one of its nodes by
//! following the node's `/events` stream, and wraps the node's two
//! file-based interfaces: the HALT lock and the replication lag file.
//!
//! # Overview
//!
//! - [`EventSubscription`] reads one event at a time, reconnecting on the
//!   next read after any failure
//! - [`PrimaryMonitor`] follows a subscription in a background task and
//!   answers "am I the primary, and who is?" without blocking
//! - [`with_halt`] pauses writes on the primary around a replica-side write
//! - [`lag`] reports how far this node is behind the primary
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use litefs_client::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let monitor = Client::default().monitor_primary();
//!     monitor.wait_ready(Duration::from_secs(5)).await?;
//!
//!     let status = monitor.status()?;
//!     if let Some(e) = &status.error {
//!         eprintln!("status may be stale: {e}");
//!     }
//!     println!("primary={} host={}", status.value.is_primary, status.value.hostname);
//!
//!     monitor.close();
//!     Ok(())
//! }
//! ```

pub mod backoff;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod halt;
pub mod lag;
pub mod monitor;
pub mod subscription;

// Re-export main types
pub use client::{monitor_primary, subscribe_events, Client};
pub use config::{ClientConfig, DEFAULT_URL};
pub use error::{Error, LagError, Result};
pub use events::{Event, EventData, InitEventData, PrimaryChangeEventData, TxEventData};
pub use halt::{halt, try_halt, unhalt, with_halt};
pub use lag::lag;
pub use monitor::{Observed, PrimaryMonitor, PrimaryStatus};
pub use subscription::EventSubscription;
