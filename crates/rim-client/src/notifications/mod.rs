//! Live notification stream over a WebSocket.

mod close;
mod socket;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use close::{AUTH_REJECTED_CLOSE_CODE, CloseInfo};
pub use socket::NotificationSocket;

/// A notification pushed by the server.
///
/// Any JSON document is accepted. Server events are objects carrying a
/// `type` field, exposed through [`Notification::kind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Notification(Value);

impl Notification {
    /// Parse a frame payload.
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload).map(Self)
    }

    /// The event type, if the payload names one.
    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// Look up a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Notification {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Lifecycle of a [`NotificationSocket`].
///
/// ```text
/// Idle -> Connecting -> Open -> Closing -> Closed
///             ^                              |
///             +---- (reconnect scheduled) ---+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected.
    Idle,
    /// Handshake in progress.
    Connecting,
    /// Receiving notifications.
    Open,
    /// Client-initiated close in progress.
    Closing,
    /// Not connected. `reconnect_scheduled` is true while a retry timer runs.
    Closed { reconnect_scheduled: bool },
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_event() {
        let n = Notification::parse(
            r#"{"type":"maintenance_due","bike_id":7,"component":"chain"}"#,
        )
        .unwrap();
        assert_eq!(n.kind(), Some("maintenance_due"));
        assert_eq!(n.get("component"), Some(&Value::from("chain")));
    }

    #[test]
    fn untyped_payload_is_accepted() {
        let n = Notification::parse("[1, 2, 3]").unwrap();
        assert_eq!(n.kind(), None);
        assert_eq!(n.into_value(), serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn malformed_payload_is_rejected() {
        assert!(Notification::parse("{not json").is_err());
        assert!(Notification::parse("").is_err());
    }
}
