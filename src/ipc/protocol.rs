//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.
//! The host surface sends requests; the daemon answers each one and, for
//! subscribed connections, pushes icon notifications as they render.

use serde::{Deserialize, Serialize};

use crate::adapters::AdapterInfo;
use crate::events::{DisplayUpdate, SurfaceEvent};

/// Requests from the host surface to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Deliver a button lifecycle event
    Event { event: SurfaceEvent },

    /// Request current daemon status
    GetStatus,

    /// Ping to check connectivity
    Ping,

    /// Receive `set_image` notifications on this connection
    Subscribe,
}

/// Responses from daemon to the host surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Event accepted for processing
    Ack,

    /// Current daemon status
    Status(DaemonStatus),

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

/// Push notification from daemon to subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A button's icon changed
    SetImage(DisplayUpdate),
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Uptime in seconds
    pub uptime_secs: u64,

    /// Registered speech-to-text integrations
    pub adapters: Vec<AdapterInfo>,
}
