//! Event types and decoding
//!
//! Types representing the events streamed by a LiteFS node's `/events`
//! endpoint, one JSON object per line:
//!
//! ```text
//! {"type":"init","data":{"isPrimary":true,"hostname":"node-1"}}
//! {"type":"tx","db":"db","data":{"txID":"0000000000000027",...}}
//! {"type":"primaryChange","data":{"isPrimary":false,"hostname":"node-2"}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const EVENT_TYPE_INIT: &str = "init";
pub const EVENT_TYPE_TX: &str = "tx";
pub const EVENT_TYPE_PRIMARY_CHANGE: &str = "primaryChange";

/// Payload of an `init` event, sent first on every new subscription
///
/// Missing fields take their zero value, in all three payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitEventData {
    #[serde(rename = "isPrimary")]
    pub is_primary: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
}

/// Payload of a `tx` event, one per committed transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxEventData {
    #[serde(rename = "txID")]
    pub tx_id: String,
    #[serde(rename = "postApplyChecksum")]
    pub post_apply_checksum: String,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
    /// Database size in pages after the commit
    pub commit: u32,
    pub timestamp: DateTime<Utc>,
}

/// Payload of a `primaryChange` event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryChangeEventData {
    #[serde(rename = "isPrimary")]
    pub is_primary: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
}

/// Typed payload, selected by the event's `type` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    Init(InitEventData),
    Tx(TxEventData),
    PrimaryChange(PrimaryChangeEventData),
    /// A type this client does not know; the payload is discarded
    Unknown { event_type: String },
}

/// A single event from the stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent", into = "RawEvent")]
pub struct Event {
    /// Database the event refers to, if any
    pub db: Option<String>,
    pub data: EventData,
}

impl Event {
    /// Decode one line of the event stream
    pub fn decode(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// Encode as a single JSON line (without the trailing newline)
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The wire `type` string
    pub fn event_type(&self) -> &str {
        match &self.data {
            EventData::Init(_) => EVENT_TYPE_INIT,
            EventData::Tx(_) => EVENT_TYPE_TX,
            EventData::PrimaryChange(_) => EVENT_TYPE_PRIMARY_CHANGE,
            EventData::Unknown { event_type } => event_type,
        }
    }

    /// Leadership carried by this event as `(is_primary, hostname)`
    ///
    /// Only `init` and `primaryChange` events carry leadership.
    pub fn leadership(&self) -> Option<(bool, &str)> {
        match &self.data {
            EventData::Init(d) => Some((d.is_primary, d.hostname.as_str())),
            EventData::PrimaryChange(d) => Some((d.is_primary, d.hostname.as_str())),
            EventData::Tx(_) | EventData::Unknown { .. } => None,
        }
    }
}

/// Wire envelope; `data` is decoded in a second pass once `type` is known
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawEvent {
    /// Absent on the wire is the empty type, which is just another unknown kind
    #[serde(rename = "type", default)]
    event_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    db: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl TryFrom<RawEvent> for Event {
    type Error = serde_json::Error;

    fn try_from(raw: RawEvent) -> std::result::Result<Self, Self::Error> {
        let data = match raw.event_type.as_str() {
            EVENT_TYPE_INIT => EventData::Init(payload(raw.data)?),
            EVENT_TYPE_TX => EventData::Tx(payload(raw.data)?),
            EVENT_TYPE_PRIMARY_CHANGE => EventData::PrimaryChange(payload(raw.data)?),
            _ => EventData::Unknown {
                event_type: raw.event_type,
            },
        };

        Ok(Event {
            db: Some(raw.db).filter(|db| !db.is_empty()),
            data,
        })
    }
}

impl From<Event> for RawEvent {
    fn from(event: Event) -> Self {
        let event_type = event.event_type().to_string();
        let data = match event.data {
            EventData::Init(d) => serde_json::to_value(d).ok(),
            EventData::Tx(d) => serde_json::to_value(d).ok(),
            EventData::PrimaryChange(d) => serde_json::to_value(d).ok(),
            EventData::Unknown { .. } => None,
        };

        RawEvent {
            event_type,
            db: event.db.unwrap_or_default(),
            data,
        }
    }
}

/// Missing or `null` data decodes to the payload's default
fn payload<T>(data: Option<serde_json::Value>) -> std::result::Result<T, serde_json::Error>
where
    T: for<'de> Deserialize<'de> + Default,
{
    match data {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value),
    }
}
