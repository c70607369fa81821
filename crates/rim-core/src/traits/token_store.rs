//! Persisted credential storage trait.

use crate::{AccessToken, CredentialPair, RefreshToken, Result};

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Client-side storage for the session credential pair.
///
/// Both tokens are written and cleared together. The single exception is
/// [`TokenStore::set_access_token`], used when a refresh response carries
/// only a new access token.
pub trait TokenStore: Send + Sync {
    /// Returns the stored access token, if any.
    fn access_token(&self) -> Option<AccessToken>;

    /// Returns the stored refresh token, if any.
    fn refresh_token(&self) -> Option<RefreshToken>;

    /// Replace both tokens.
    fn save(&self, pair: &CredentialPair) -> Result<()>;

    /// Replace only the access token, keeping the refresh token.
    fn set_access_token(&self, token: &AccessToken) -> Result<()>;

    /// Remove both tokens.
    fn clear(&self) -> Result<()>;

    /// Returns the full pair when both tokens are present.
    fn load(&self) -> Option<CredentialPair> {
        Some(CredentialPair::new(
            self.access_token()?,
            self.refresh_token()?,
        ))
    }
}
