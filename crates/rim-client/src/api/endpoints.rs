//! RIM API endpoint paths and wire types.

use serde::{Deserialize, Serialize};

// ============================================================================
// Endpoint Paths
// ============================================================================

/// Exchange credentials for a token pair.
pub const LOGIN: &str = "/auth/login";

/// Exchange a refresh token for a new token pair.
pub const REFRESH: &str = "/auth/refresh";

/// Profile of the authenticated rider.
pub const ME: &str = "/auth/me";

/// Notification WebSocket stream.
pub const NOTIFICATIONS: &str = "/ws/notifications";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for the refresh endpoint.
#[derive(Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response from the refresh endpoint.
///
/// Servers that do not rotate refresh tokens omit `refresh_token`.
#[derive(Deserialize)]
pub(crate) struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Error body returned by the API.
///
/// `detail` is usually a string but validation failures return a list.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn into_detail(self) -> Option<String> {
        match self.detail {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Null) | None => self.message,
            Some(other) => Some(other.to_string()),
        }
    }
}

/// Returns true if `path` names the refresh endpoint.
pub(crate) fn is_refresh_path(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    path.trim_matches('/') == REFRESH.trim_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_path_detection() {
        assert!(is_refresh_path("/auth/refresh"));
        assert!(is_refresh_path("auth/refresh/"));
        assert!(is_refresh_path("/auth/refresh?x=1"));
        assert!(!is_refresh_path("/auth/login"));
        assert!(!is_refresh_path("/bikes/auth/refresh"));
    }

    #[test]
    fn error_detail_variants() {
        let plain: ErrorResponse = serde_json::from_str(r#"{"detail":"Not found"}"#).unwrap();
        assert_eq!(plain.into_detail().as_deref(), Some("Not found"));

        let message: ErrorResponse = serde_json::from_str(r#"{"message":"Nope"}"#).unwrap();
        assert_eq!(message.into_detail().as_deref(), Some("Nope"));

        let list: ErrorResponse =
            serde_json::from_str(r#"{"detail":[{"loc":["body","vin"],"msg":"required"}]}"#)
                .unwrap();
        assert!(list.into_detail().unwrap().contains("required"));
    }
}
