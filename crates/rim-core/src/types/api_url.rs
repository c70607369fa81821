//! API base URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, InvalidInputError};

use super::{SocketUrl, is_loopback, join, normalize};

/// A validated base URL for the RIM REST API.
///
/// The URL must be absolute and use HTTPS (or HTTP for localhost). A path
/// prefix such as `/api/v1` is preserved and endpoints are joined onto it.
///
/// # Example
///
/// ```
/// use rim_core::ApiUrl;
///
/// let api = ApiUrl::new("https://api.rim.example/v1/").unwrap();
/// assert_eq!(api.endpoint("/auth/refresh"), "https://api.rim.example/v1/auth/refresh");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiUrl(Url);

impl ApiUrl {
    /// Create a new API URL from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not valid or doesn't meet requirements.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| InvalidInputError::ApiUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate(&url, s)?;

        Ok(Self(normalize(url)))
    }

    /// Returns the full URL for an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        join(self.0.as_str(), path)
    }

    /// Returns the WebSocket URL served from the same origin
    /// (`https` becomes `wss`, `http` becomes `ws`).
    pub fn to_socket_url(&self) -> Result<SocketUrl, Error> {
        let base = self.0.as_str();
        let ws = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        SocketUrl::new(ws)
    }

    /// Returns the base URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the inner URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    fn validate(url: &Url, original: &str) -> Result<(), Error> {
        let invalid = |reason: &str| {
            Error::from(InvalidInputError::ApiUrl {
                value: original.to_string(),
                reason: reason.to_string(),
            })
        };

        if url.cannot_be_a_base() {
            return Err(invalid("must be an absolute URL"));
        }

        let scheme = url.scheme();
        if scheme != "https" && !(scheme == "http" && is_loopback(url)) {
            return Err(invalid("must use HTTPS (HTTP allowed only for localhost)"));
        }

        if url.host_str().is_none() {
            return Err(invalid("must have a host"));
        }

        Ok(())
    }
}

impl fmt::Display for ApiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ApiUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ApiUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for ApiUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ApiUrl::new(&s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for ApiUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_https_url() {
        let api = ApiUrl::new("https://api.rim.example").unwrap();
        assert_eq!(api.host(), Some("api.rim.example"));
    }

    #[test]
    fn valid_localhost_http() {
        let api = ApiUrl::new("http://localhost:8000").unwrap();
        assert_eq!(api.host(), Some("localhost"));
        assert!(ApiUrl::new("http://127.0.0.1:8000").is_ok());
    }

    #[test]
    fn endpoint_construction() {
        let api = ApiUrl::new("https://api.rim.example").unwrap();
        assert_eq!(
            api.endpoint("/auth/login"),
            "https://api.rim.example/auth/login"
        );
        assert_eq!(
            api.endpoint("bikes/42"),
            "https://api.rim.example/bikes/42"
        );
    }

    #[test]
    fn normalizes_trailing_slash() {
        let api = ApiUrl::new("https://api.rim.example/").unwrap();
        assert_eq!(
            api.endpoint("/auth/refresh"),
            "https://api.rim.example/auth/refresh"
        );
    }

    #[test]
    fn keeps_path_prefix() {
        let api = ApiUrl::new("http://localhost:8000/api").unwrap();
        assert_eq!(
            api.endpoint("/diagnostics"),
            "http://localhost:8000/api/diagnostics"
        );
    }

    #[test]
    fn derives_socket_url() {
        let api = ApiUrl::new("https://api.rim.example").unwrap();
        assert_eq!(
            api.to_socket_url().unwrap().as_str(),
            "wss://api.rim.example/"
        );

        let local = ApiUrl::new("http://localhost:8000").unwrap();
        assert_eq!(
            local.to_socket_url().unwrap().as_str(),
            "ws://localhost:8000/"
        );
    }

    #[test]
    fn invalid_http_non_localhost() {
        assert!(ApiUrl::new("http://api.rim.example").is_err());
    }

    #[test]
    fn invalid_relative_url() {
        assert!(ApiUrl::new("/auth/login").is_err());
    }

    #[test]
    fn invalid_scheme() {
        assert!(ApiUrl::new("ftp://api.rim.example").is_err());
    }
}
