//! Close classification.

use std::fmt;

use tokio_tungstenite::tungstenite::protocol::CloseFrame;

/// Close code the server uses for an invalid or expired token.
pub const AUTH_REJECTED_CLOSE_CODE: u16 = 4001;

pub(crate) const NORMAL_CLOSE_CODE: u16 = 1000;

/// No close frame was received.
pub(crate) const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// Why a notification connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// From a received close frame. A close without a frame is a normal
    /// close with no reason.
    pub(crate) fn from_frame(frame: Option<&CloseFrame>) -> Self {
        match frame {
            Some(frame) => Self::new(u16::from(frame.code), frame.reason.as_str()),
            None => Self::new(NORMAL_CLOSE_CODE, ""),
        }
    }

    /// The connection dropped without a close handshake.
    pub(crate) fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(ABNORMAL_CLOSE_CODE, reason)
    }

    /// Whether the server refused the token, so reconnecting is pointless.
    ///
    /// Either the dedicated close code, or a reason that mentions the token
    /// being invalid or expired.
    pub fn is_auth_rejection(&self) -> bool {
        if self.code == AUTH_REJECTED_CLOSE_CODE {
            return true;
        }
        let reason = self.reason.to_ascii_lowercase();
        reason.contains("token") && (reason.contains("invalid") || reason.contains("expired"))
    }
}

impl fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "code {}", self.code)
        } else {
            write!(f, "code {}: {}", self.code, self.reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    #[test]
    fn auth_close_code_is_terminal() {
        assert!(CloseInfo::new(4001, "").is_auth_rejection());
    }

    #[test]
    fn token_reasons_are_terminal() {
        assert!(CloseInfo::new(1008, "Invalid token").is_auth_rejection());
        assert!(CloseInfo::new(1008, "token expired").is_auth_rejection());
        assert!(!CloseInfo::new(1008, "token missing").is_auth_rejection());
        assert!(!CloseInfo::new(1008, "invalid payload").is_auth_rejection());
    }

    #[test]
    fn other_closes_are_transient() {
        assert!(!CloseInfo::new(1011, "internal error").is_auth_rejection());
        assert!(!CloseInfo::abnormal("connection reset").is_auth_rejection());
        assert!(!CloseInfo::from_frame(None).is_auth_rejection());
    }

    #[test]
    fn from_frame_keeps_code_and_reason() {
        let frame = CloseFrame {
            code: CloseCode::from(4001),
            reason: "expired".into(),
        };
        assert_eq!(
            CloseInfo::from_frame(Some(&frame)),
            CloseInfo::new(4001, "expired")
        );
    }

    #[test]
    fn display() {
        assert_eq!(CloseInfo::new(1000, "").to_string(), "code 1000");
        assert_eq!(CloseInfo::new(1011, "boom").to_string(), "code 1011: boom");
    }
}
