//! WebSocket base URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, InvalidInputError};

use super::{is_loopback, join, normalize};

/// A validated base URL for RIM WebSocket endpoints.
///
/// The URL must be absolute and use `wss` (or `ws` for localhost).
///
/// # Example
///
/// ```
/// use rim_core::SocketUrl;
///
/// let ws = SocketUrl::new("wss://api.rim.example").unwrap();
/// let url = ws.stream_url("/ws/notifications", "tok en").unwrap();
/// assert_eq!(url.as_str(), "wss://api.rim.example/ws/notifications?token=tok+en");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SocketUrl(Url);

impl SocketUrl {
    /// Create a new socket URL from a string, validating the format.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| InvalidInputError::SocketUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate(&url, s)?;

        Ok(Self(normalize(url)))
    }

    /// Returns the URL of a token-authenticated stream endpoint.
    ///
    /// The token is passed as the `token` query parameter, URL-encoded.
    pub fn stream_url(&self, path: &str, token: &str) -> Result<Url, Error> {
        let joined = join(self.0.as_str(), path);
        let mut url = Url::parse(&joined).map_err(|e| InvalidInputError::SocketUrl {
            value: joined.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }

    /// Returns the base URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    fn validate(url: &Url, original: &str) -> Result<(), Error> {
        let invalid = |reason: &str| {
            Error::from(InvalidInputError::SocketUrl {
                value: original.to_string(),
                reason: reason.to_string(),
            })
        };

        if url.cannot_be_a_base() {
            return Err(invalid("must be an absolute URL"));
        }

        let scheme = url.scheme();
        if scheme != "wss" && !(scheme == "ws" && is_loopback(url)) {
            return Err(invalid("must use wss (ws allowed only for localhost)"));
        }

        if url.host_str().is_none() {
            return Err(invalid("must have a host"));
        }

        Ok(())
    }
}

impl fmt::Display for SocketUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SocketUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for SocketUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for SocketUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SocketUrl::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_wss_url() {
        let ws = SocketUrl::new("wss://api.rim.example").unwrap();
        assert_eq!(ws.host(), Some("api.rim.example"));
    }

    #[test]
    fn ws_only_for_localhost() {
        assert!(SocketUrl::new("ws://localhost:8000").is_ok());
        assert!(SocketUrl::new("ws://127.0.0.1:9000").is_ok());
        assert!(SocketUrl::new("ws://api.rim.example").is_err());
    }

    #[test]
    fn rejects_http_scheme() {
        assert!(SocketUrl::new("https://api.rim.example").is_err());
    }

    #[test]
    fn stream_url_with_prefix_and_token() {
        let ws = SocketUrl::new("ws://localhost:8000/api/").unwrap();
        let url = ws.stream_url("/ws/notifications", "abc.def").unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:8000/api/ws/notifications?token=abc.def"
        );
    }

    #[test]
    fn stream_url_encodes_token() {
        let ws = SocketUrl::new("wss://api.rim.example").unwrap();
        let url = ws.stream_url("ws/notifications", "a&b=c").unwrap();
        assert_eq!(
            url.query(),
            Some("token=a%26b%3Dc")
        );
    }
}
