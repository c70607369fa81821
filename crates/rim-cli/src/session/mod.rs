//! The CLI's view of the session: an [`ApiClient`] over the credential file.

pub mod storage;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use rim_client::{ApiClient, ClientConfig, SessionEvent};
use rim_core::error::AuthError;
use rim_core::{AccessToken, ApiUrl, SocketUrl, TokenStore};
use rim_store::FileTokenStore;

use crate::cli::ConnectionArgs;
use crate::output;

pub struct CliSession {
    client: ApiClient,
    store: Arc<FileTokenStore>,
}

impl CliSession {
    /// Open the credential store and build a client for it.
    pub fn open(args: &ConnectionArgs) -> Result<Self> {
        let config = client_config(args)?;
        let path = storage::credentials_path(args.credentials.as_deref())?;
        debug!(path = %path.display(), api = %config.api_url, "Opening session");

        let store = Arc::new(
            FileTokenStore::open(&path)
                .with_context(|| format!("Failed to open credentials at {}", path.display()))?,
        );
        let client = ApiClient::new(config, store.clone()).context("Failed to build API client")?;

        client.subscribe(|event| {
            if let SessionEvent::SessionExpired { .. } = event {
                output::warn("Session expired. Run 'rim login' to sign in again.");
            }
        });

        Ok(Self { client, store })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn credentials_path(&self) -> &Path {
        self.store.path()
    }

    pub fn store(&self) -> &FileTokenStore {
        &self.store
    }

    /// The stored access token, or an error telling the user to log in.
    pub fn require_login(&self) -> Result<AccessToken> {
        self.store
            .access_token()
            .ok_or(AuthError::NotAuthenticated)
            .context("Run 'rim login' first")
    }
}

/// Build the client config from flags and environment over the built-in
/// defaults.
fn client_config(args: &ConnectionArgs) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_build_env().context("Invalid built-in API URL")?;

    if let Some(api) = &args.api_url {
        config.api_url = ApiUrl::new(api).context("Invalid API URL")?;
    }
    match &args.ws_url {
        Some(ws) => config.ws_url = SocketUrl::new(ws).context("Invalid WebSocket URL")?,
        None if args.api_url.is_some() => {
            config.ws_url = config
                .api_url
                .to_socket_url()
                .context("Cannot derive WebSocket URL from API URL")?;
        }
        None => {}
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    Ok(config)
}
