//! File-backed credential store.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use rim_core::error::{Error, StorageError};
use rim_core::{AccessToken, CredentialPair, RefreshToken, Result, TokenStore};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// On-disk layout. Keys match `ACCESS_TOKEN_KEY` / `REFRESH_TOKEN_KEY`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// Credential store persisted as a JSON file.
///
/// The file is read once by [`FileTokenStore::open`]; every mutation writes
/// through under an exclusive advisory lock on a sibling `.lock` file. On
/// Unix the file is created with mode `0600`.
pub struct FileTokenStore {
    path: PathBuf,
    cache: RwLock<StoredTokens>,
}

impl FileTokenStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A missing file is an empty store. A file that exists but cannot be
    /// parsed is an error.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let stored = if path.exists() {
            let json = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
            serde_json::from_str(&json).map_err(|e| StorageError::Corrupt {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
        } else {
            StoredTokens::default()
        };

        debug!(
            has_access = stored.access_token.is_some(),
            has_refresh = stored.refresh_token.is_some(),
            "Loaded credential store"
        );

        Ok(Self {
            path,
            cache: RwLock::new(stored),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the tokens were last written, if ever.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.cache.read().ok()?.updated_at
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Apply `update` to the cached tokens and persist the result.
    fn write<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(&mut StoredTokens),
    {
        let mut cache = self.cache.write().map_err(|_| StorageError::Poisoned)?;

        let mut next = cache.clone();
        update(&mut next);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let lock_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| io_error(&lock_path, e))?;
        lock_file
            .lock_exclusive()
            .map_err(|e| io_error(&lock_path, e))?;

        let result = self.persist(&next);

        if let Err(e) = lock_file.unlock() {
            warn!(error = %e, "Failed to release credential store lock");
        }

        result?;
        *cache = next;
        Ok(())
    }

    fn persist(&self, stored: &StoredTokens) -> Result<()> {
        if stored.access_token.is_none() && stored.refresh_token.is_none() {
            if self.path.exists() {
                fs::remove_file(&self.path).map_err(|e| io_error(&self.path, e))?;
            }
            return Ok(());
        }

        let json = serde_json::to_string_pretty(stored).map_err(|e| StorageError::Corrupt {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        fs::write(&self.path, json).map_err(|e| io_error(&self.path, e))?;

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&self.path)
                .map_err(|e| io_error(&self.path, e))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms).map_err(|e| io_error(&self.path, e))?;
        }

        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Option<AccessToken> {
        let cache = self.cache.read().ok()?;
        cache.access_token.clone().map(AccessToken::new)
    }

    fn refresh_token(&self) -> Option<RefreshToken> {
        let cache = self.cache.read().ok()?;
        cache.refresh_token.clone().map(RefreshToken::new)
    }

    fn save(&self, pair: &CredentialPair) -> Result<()> {
        self.write(|stored| {
            stored.access_token = Some(pair.access_token.as_str().to_string());
            stored.refresh_token = Some(pair.refresh_token.as_str().to_string());
            stored.updated_at = Some(Utc::now());
        })
    }

    fn set_access_token(&self, token: &AccessToken) -> Result<()> {
        self.write(|stored| {
            stored.access_token = Some(token.as_str().to_string());
            stored.updated_at = Some(Utc::now());
        })
    }

    fn clear(&self) -> Result<()> {
        self.write(|stored| *stored = StoredTokens::default())
    }
}

impl std::fmt::Debug for FileTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTokenStore")
            .field("path", &self.path)
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}

fn io_error(path: &Path, err: std::io::Error) -> Error {
    Error::Storage(StorageError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rim_core::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
    use tempfile::TempDir;

    fn pair(access: &str, refresh: &str) -> CredentialPair {
        CredentialPair::new(AccessToken::new(access), RefreshToken::new(refresh))
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::open(dir.path().join("credentials.json")).unwrap();
        assert!(store.load().is_none());
        assert!(store.updated_at().is_none());
    }

    #[test]
    fn save_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = FileTokenStore::open(&path).unwrap();
        store.save(&pair("a-1", "r-1")).unwrap();
        assert!(store.updated_at().is_some());

        let reopened = FileTokenStore::open(&path).unwrap();
        assert_eq!(reopened.load(), Some(pair("a-1", "r-1")));
    }

    #[test]
    fn file_uses_fixed_storage_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileTokenStore::open(&path).unwrap();
        store.save(&pair("a-1", "r-1")).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[ACCESS_TOKEN_KEY], "a-1");
        assert_eq!(raw[REFRESH_TOKEN_KEY], "r-1");
    }

    #[test]
    fn access_only_update_keeps_refresh_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileTokenStore::open(&path).unwrap();
        store.save(&pair("a-1", "r-1")).unwrap();
        store.set_access_token(&AccessToken::new("a-2")).unwrap();

        let reopened = FileTokenStore::open(&path).unwrap();
        assert_eq!(reopened.load(), Some(pair("a-2", "r-1")));
    }

    #[test]
    fn clear_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileTokenStore::open(&path).unwrap();
        store.save(&pair("a-1", "r-1")).unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());

        // Clearing an already empty store is fine.
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "not json").unwrap();

        let err = FileTokenStore::open(&path).unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Corrupt { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn file_is_private() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileTokenStore::open(&path).unwrap();
        store.save(&pair("a-1", "r-1")).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn debug_hides_tokens() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::open(dir.path().join("credentials.json")).unwrap();
        store.save(&pair("secret-access", "secret-refresh")).unwrap();
        let debug = format!("{:?}", store);
        assert!(!debug.contains("secret"));
    }
}
