//! In-memory credential store.

use std::sync::RwLock;

use rim_core::error::StorageError;
use rim_core::{AccessToken, CredentialPair, RefreshToken, Result, TokenStore};

#[derive(Default)]
struct Slots {
    access_token: Option<AccessToken>,
    refresh_token: Option<RefreshToken>,
}

/// Credential store that lives only as long as the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    slots: RwLock<Slots>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a credential pair.
    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            slots: RwLock::new(Slots {
                access_token: Some(pair.access_token),
                refresh_token: Some(pair.refresh_token),
            }),
        }
    }

    /// Create a store holding only an access token.
    pub fn with_access_token(token: AccessToken) -> Self {
        Self {
            slots: RwLock::new(Slots {
                access_token: Some(token),
                refresh_token: None,
            }),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<AccessToken> {
        self.slots.read().ok()?.access_token.clone()
    }

    fn refresh_token(&self) -> Option<RefreshToken> {
        self.slots.read().ok()?.refresh_token.clone()
    }

    fn save(&self, pair: &CredentialPair) -> Result<()> {
        let mut slots = self.slots.write().map_err(|_| StorageError::Poisoned)?;
        slots.access_token = Some(pair.access_token.clone());
        slots.refresh_token = Some(pair.refresh_token.clone());
        Ok(())
    }

    fn set_access_token(&self, token: &AccessToken) -> Result<()> {
        let mut slots = self.slots.write().map_err(|_| StorageError::Poisoned)?;
        slots.access_token = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slots = self.slots.write().map_err(|_| StorageError::Poisoned)?;
        *slots = Slots::default();
        Ok(())
    }
}

impl std::fmt::Debug for MemoryTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTokenStore")
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(access: &str, refresh: &str) -> CredentialPair {
        CredentialPair::new(AccessToken::new(access), RefreshToken::new(refresh))
    }

    #[test]
    fn starts_empty() {
        let store = MemoryTokenStore::new();
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(store.load().is_none());
    }

    #[test]
    fn save_then_clear() {
        let store = MemoryTokenStore::new();
        store.save(&pair("a-1", "r-1")).unwrap();
        assert_eq!(store.load(), Some(pair("a-1", "r-1")));

        store.clear().unwrap();
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
    }

    #[test]
    fn access_only_update_keeps_refresh_token() {
        let store = MemoryTokenStore::with_pair(pair("a-1", "r-1"));
        store.set_access_token(&AccessToken::new("a-2")).unwrap();
        assert_eq!(store.load(), Some(pair("a-2", "r-1")));
    }

    #[test]
    fn access_token_without_refresh_token_has_no_pair() {
        let store = MemoryTokenStore::with_access_token(AccessToken::new("a-1"));
        assert!(store.access_token().is_some());
        assert!(store.load().is_none());
    }
}
