//! Validated service URLs.
//!
//! Both URL types are checked at construction time: absolute, with a host,
//! and using the secure scheme unless the host is loopback.

mod api_url;
mod socket_url;

pub use api_url::ApiUrl;
pub use socket_url::SocketUrl;

use url::Url;

pub(crate) fn is_loopback(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|h| h == "localhost" || h == "127.0.0.1" || h == "[::1]" || h == "::1")
}

/// Strip a root-only path so joined endpoints never get a double slash.
pub(crate) fn normalize(mut url: Url) -> Url {
    if url.path() == "/" {
        url.set_path("");
    }
    url
}

/// Join a base URL string and an endpoint path with exactly one slash.
pub(crate) fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
