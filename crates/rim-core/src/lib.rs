//! rim-core - Core types and traits for the RIM client.
//!
//! Everything the API client, the notification socket and the credential
//! stores share lives here: the error taxonomy, the token types, validated
//! service URLs, the [`TokenStore`] trait and the [`ObserverList`] used for
//! callback subscriptions.

pub mod credentials;
pub mod error;
pub mod observers;
pub mod tokens;
pub mod traits;
pub mod types;

pub use credentials::Credentials;
pub use error::Error;
pub use observers::{ObserverList, SubscriptionId};
pub use tokens::{AccessToken, CredentialPair, RefreshToken};
pub use traits::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TokenStore};
pub use types::{ApiUrl, SocketUrl};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
