//! rim-client - REST client and notification socket for the RIM API.
//!
//! [`ApiClient`] attaches the stored access token to every request and
//! recovers from a 401 with a single shared token refresh.
//! [`NotificationSocket`] keeps the push-notification WebSocket connected.

mod api;
pub mod config;
mod notifications;

pub use api::endpoints;
pub use api::{ApiClient, ApiRequest, ApiResponse, SessionEvent};
pub use config::ClientConfig;
pub use notifications::{
    AUTH_REJECTED_CLOSE_CODE, CloseInfo, ConnectionState, Notification, NotificationSocket,
};

pub use reqwest::{Method, StatusCode, header};
