//! Client configuration.
//!
//! Base URLs come from, in order of precedence: explicit setters, runtime
//! environment (`ClientConfig::from_env`), values baked in at build time
//! through `RIM_API_URL` / `RIM_WS_URL`, and finally the local development
//! defaults.

use std::time::Duration;

use rim_core::{ApiUrl, Result, SocketUrl};

/// Fallback API base URL when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Fallback WebSocket base URL when nothing else is configured.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000";

/// Default timeout applied to every HTTP call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default delay before a dropped notification socket reconnects.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Where the host application should send the user after the session is lost.
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";

/// Environment variable naming the API base URL.
pub const API_URL_ENV: &str = "RIM_API_URL";

/// Environment variable naming the WebSocket base URL.
pub const WS_URL_ENV: &str = "RIM_WS_URL";

/// Environment variable overriding the HTTP timeout, in seconds.
pub const TIMEOUT_ENV: &str = "RIM_HTTP_TIMEOUT_SECS";

/// Settings shared by [`ApiClient`](crate::ApiClient) and
/// [`NotificationSocket`](crate::NotificationSocket).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: ApiUrl,
    pub ws_url: SocketUrl,
    pub timeout: Duration,
    pub reconnect_delay: Duration,
    pub login_path: String,
}

impl ClientConfig {
    /// Build a config from explicit base URLs and default timings.
    pub fn new(api_url: ApiUrl, ws_url: SocketUrl) -> Self {
        Self {
            api_url,
            ws_url,
            timeout: DEFAULT_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    /// Config from build-time values, falling back to the defaults.
    pub fn from_build_env() -> Result<Self> {
        let api_url = ApiUrl::new(option_env!("RIM_API_URL").unwrap_or(DEFAULT_API_URL))?;
        let ws_url = SocketUrl::new(option_env!("RIM_WS_URL").unwrap_or(DEFAULT_WS_URL))?;
        Ok(Self::new(api_url, ws_url))
    }

    /// Config from the runtime environment, falling back to build-time values.
    ///
    /// When only `RIM_API_URL` is set, the socket URL is derived from it so
    /// both point at the same server.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::from_build_env()?;

        let api = std::env::var(API_URL_ENV).ok();
        let ws = std::env::var(WS_URL_ENV).ok();

        if let Some(api) = api.as_deref() {
            config.api_url = ApiUrl::new(api)?;
        }
        match ws.as_deref() {
            Some(ws) => config.ws_url = SocketUrl::new(ws)?,
            None if api.is_some() => config.ws_url = config.api_url.to_socket_url()?,
            None => {}
        }

        if let Some(secs) = std::env::var(TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_urls() {
        assert!(ApiUrl::new(DEFAULT_API_URL).is_ok());
        assert!(SocketUrl::new(DEFAULT_WS_URL).is_ok());
    }

    #[test]
    fn new_uses_default_timings() {
        let config = ClientConfig::new(
            ApiUrl::new("https://api.rim.example").unwrap(),
            SocketUrl::new("wss://api.rim.example").unwrap(),
        );
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.reconnect_delay, Duration::from_secs(3));
        assert_eq!(config.login_path, "/auth/login");
    }

    #[test]
    fn setters_override() {
        let config = ClientConfig::from_build_env()
            .unwrap()
            .with_timeout(Duration::from_secs(5))
            .with_reconnect_delay(Duration::from_millis(50))
            .with_login_path("/login");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.reconnect_delay, Duration::from_millis(50));
        assert_eq!(config.login_path, "/login");
    }
}
