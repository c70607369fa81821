//! Authenticated HTTP client with single-flight token refresh.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, trace, warn};

use rim_core::error::{ApiError, AuthError, Error, InvalidInputError};
use rim_core::{
    AccessToken, CredentialPair, Credentials, ObserverList, RefreshToken, Result, SubscriptionId,
    TokenStore,
};

use crate::config::ClientConfig;

use super::endpoints::{self, ErrorResponse, RefreshRequest, RefreshResponse};
use super::refresh::{RefreshCoordinator, RefreshRole};
use super::request::{ApiRequest, ApiResponse};

/// Session lifecycle events emitted by [`ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// `login` stored a fresh credential pair.
    LoggedIn,
    /// A refresh stored new tokens.
    TokensRefreshed,
    /// `logout` cleared the credential pair.
    LoggedOut,
    /// The session could not be recovered and the credentials were cleared.
    /// The host should send the user to `login_path`.
    SessionExpired { login_path: String },
}

/// HTTP client for the RIM API.
///
/// Every request carries `Authorization: Bearer <access_token>` when a token
/// is stored. A 401 triggers one token refresh, shared by every request that
/// fails while it is in flight, after which each request is retried once.
///
/// Cheap to clone; clones share the token store, refresh state and
/// subscribers.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use rim_client::{ApiClient, ClientConfig};
/// use rim_core::Credentials;
/// use rim_store::MemoryTokenStore;
///
/// # async fn example() -> Result<(), rim_core::Error> {
/// let client = ApiClient::new(ClientConfig::from_env()?, Arc::new(MemoryTokenStore::new()))?;
/// client.login(Credentials::new("rider@example.com", "secret")).await?;
///
/// let bikes: serde_json::Value = client.get("/bikes").await?;
/// println!("{bikes}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    store: Arc<dyn TokenStore>,
    refresh: RefreshCoordinator,
    events: ObserverList<SessionEvent>,
}

impl ApiClient {
    /// Create a client over the given credential store.
    pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("rim-client/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                config,
                store,
                refresh: RefreshCoordinator::default(),
                events: ObserverList::new(),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    /// Whether an access token is currently stored.
    pub fn is_authenticated(&self) -> bool {
        self.inner.store.access_token().is_some()
    }

    /// Whether a token refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner.refresh.is_refreshing()
    }

    /// Observe session lifecycle events.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Log in and store the returned credential pair.
    ///
    /// A rejected login is returned as-is; it never triggers a refresh.
    #[instrument(skip_all, fields(email = %credentials.email()))]
    pub async fn login(&self, credentials: Credentials) -> Result<()> {
        info!("Logging in");

        let url = self.inner.config.api_url.endpoint(endpoints::LOGIN);
        let response = self.inner.http.post(&url).json(&credentials).send().await?;
        let pair: CredentialPair = handle_response(response).await?.json()?;

        self.inner.store.save(&pair)?;
        debug!("Login succeeded, credentials stored");
        self.inner.events.notify(&SessionEvent::LoggedIn);
        Ok(())
    }

    /// Clear the stored credentials.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        info!("Logging out");
        self.inner.store.clear()?;
        self.inner.events.notify(&SessionEvent::LoggedOut);
        Ok(())
    }

    /// Refresh the access token now.
    ///
    /// Joins the in-flight refresh if there is one. On failure the session is
    /// expired exactly as if a request had hit a 401.
    #[instrument(skip(self))]
    pub async fn refresh_session(&self) -> Result<()> {
        self.recover().await.map(|_| ())
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Send a request, recovering from a 401 with one refresh and one retry.
    ///
    /// Non-2xx responses come back as [`Error::Api`]; transport failures as
    /// [`Error::Transport`]. A request to the refresh endpoint itself, or a
    /// retried request that fails again, is never refreshed.
    #[instrument(skip_all, fields(method = %request.method(), path = %request.path()))]
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let token = self.inner.store.access_token();

        match self.execute(&request, token.as_ref()).await {
            Err(err) if err.is_unauthorized() && !request.is_refresh() => {
                debug!("Request unauthorized, recovering session");
                let token = self.recover().await?;
                trace!("Retrying request with refreshed token");
                self.execute(&request, Some(&token)).await
            }
            result => result,
        }
    }

    /// GET `path` and decode the JSON body.
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    /// POST a JSON body to `path` and decode the JSON response.
    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(ApiRequest::post(path).json(body)?).await?.json()
    }

    /// PUT a JSON body to `path` and decode the JSON response.
    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(ApiRequest::put(path).json(body)?).await?.json()
    }

    /// PATCH `path` with a JSON body and decode the JSON response.
    pub async fn patch<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(ApiRequest::patch(path).json(body)?).await?.json()
    }

    /// DELETE `path`, ignoring any response body.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(ApiRequest::delete(path)).await.map(|_| ())
    }

    /// One attempt at `request` with the given token.
    async fn execute(
        &self,
        request: &ApiRequest,
        token: Option<&AccessToken>,
    ) -> Result<ApiResponse> {
        let url = self.inner.config.api_url.endpoint(request.path());

        let mut headers = request.headers().clone();
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&token.bearer())
                .map_err(|_| InvalidInputError::TokenEncoding)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = self
            .inner
            .http
            .request(request.method().clone(), &url)
            .headers(headers);
        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        handle_response(response).await
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Obtain a fresh access token, either by refreshing or by waiting on
    /// the refresh already in flight.
    async fn recover(&self) -> Result<AccessToken> {
        let guard = match self.inner.refresh.join() {
            RefreshRole::Waiter(pending) => {
                debug!("Refresh already in flight, waiting");
                return pending.wait().await.map_err(Error::from);
            }
            RefreshRole::Initiator(guard) => guard,
        };

        let Some(refresh_token) = self.inner.store.refresh_token() else {
            warn!("No refresh token stored; session expired");
            guard.settle(Err(AuthError::MissingRefreshToken));
            self.expire_session();
            return Err(AuthError::MissingRefreshToken.into());
        };

        match self.request_refresh(&refresh_token).await {
            Ok(token) => {
                guard.settle(Ok(token.clone()));
                self.inner.events.notify(&SessionEvent::TokensRefreshed);
                Ok(token)
            }
            Err(err) => {
                warn!(error = %err, "Token refresh failed; session expired");
                guard.settle(Err(AuthError::refresh_failed(&err)));
                self.expire_session();
                Err(err)
            }
        }
    }

    /// Call the refresh endpoint and store whatever it returns.
    #[instrument(skip_all)]
    async fn request_refresh(&self, refresh_token: &RefreshToken) -> Result<AccessToken> {
        info!("Refreshing access token");

        let url = self.inner.config.api_url.endpoint(endpoints::REFRESH);
        let response = self
            .inner
            .http
            .post(&url)
            .json(&RefreshRequest {
                refresh_token: refresh_token.as_str(),
            })
            .send()
            .await?;

        let body: RefreshResponse = handle_response(response).await?.json()?;
        let access_token = AccessToken::new(body.access_token);

        match body.refresh_token {
            Some(refresh_token) => self.inner.store.save(&CredentialPair::new(
                access_token.clone(),
                RefreshToken::new(refresh_token),
            ))?,
            None => self.inner.store.set_access_token(&access_token)?,
        }

        debug!("Access token refreshed");
        Ok(access_token)
    }

    /// Drop the credentials and tell subscribers to send the user to login.
    fn expire_session(&self) {
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to clear credential store");
        }
        self.inner.events.notify(&SessionEvent::SessionExpired {
            login_path: self.inner.config.login_path.clone(),
        });
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.inner.config.api_url)
            .field("refreshing", &self.inner.refresh.is_refreshing())
            .field("events", &self.inner.events)
            .finish()
    }
}

/// Turn a response into an [`ApiResponse`] or an [`ApiError`].
async fn handle_response(response: reqwest::Response) -> Result<ApiResponse> {
    let status = response.status();
    trace!(status = %status, "API response");

    if status.is_success() {
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(ApiResponse::new(status, headers, body))
    } else {
        Err(parse_error_response(response).await.into())
    }
}

async fn parse_error_response(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();

    match response.json::<ErrorResponse>().await {
        Ok(body) => ApiError::new(status, body.into_detail()),
        Err(_) => ApiError::new(status, None),
    }
}
