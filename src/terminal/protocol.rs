// ABOUTME: Wire frame definitions for the container exec WebSocket endpoint
// Frames are op-tagged JSON objects matching the backend's exec contract

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Frames sent from the console to the exec endpoint.
///
/// Serialized as `{"op":"<name>", ...}` text messages. The tag names and
/// field names are part of the wire contract and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ClientFrame {
    /// Raw keystrokes, decoded as text.
    Input { data: String },
    /// Terminal geometry update.
    Resize { cols: u16, rows: u16 },
    /// Liveness probe; `t` is epoch milliseconds at send time.
    Ping { t: i64 },
    /// Best-effort notice sent right before the transport is closed.
    Exit,
}

/// Control frames the exec endpoint may send as text messages.
///
/// Anything that does not parse as one of these is treated as raw process
/// output and written to the surface verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ServerFrame {
    /// Application-level error reported by the remote side.
    Error { data: String },
}

impl ClientFrame {
    pub fn input(data: impl Into<String>) -> Self {
        ClientFrame::Input { data: data.into() }
    }

    pub fn resize(cols: u16, rows: u16) -> Self {
        ClientFrame::Resize { cols, rows }
    }

    /// Ping stamped with the current wall clock.
    pub fn ping() -> Self {
        ClientFrame::Ping {
            t: Utc::now().timestamp_millis(),
        }
    }
}
