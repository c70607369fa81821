//! Self-reconnecting notification socket.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

use rim_core::error::TransportError;
use rim_core::{AccessToken, ObserverList, Result, SocketUrl, SubscriptionId};

use super::close::{AUTH_REJECTED_CLOSE_CODE, CloseInfo};
use super::{ConnectionState, Notification};
use crate::api::endpoints;
use crate::config::ClientConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type MessageHandler = Arc<dyn Fn(&Notification) + Send + Sync>;

/// How long a client-initiated close waits for the server's close frame.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

enum Control {
    Send(Message),
    Close,
}

/// How a connection attempt ended.
enum Exit {
    /// The connection dropped or was closed by the server.
    Closed(CloseInfo),
    /// `disconnect` was called.
    Disconnected,
}

/// A notification WebSocket that reconnects after transient drops.
///
/// One socket holds at most one live connection. After any close that is
/// not an auth rejection it waits `reconnect_delay` and reconnects with the
/// same token and handler, indefinitely, until [`disconnect`] is called.
/// An auth rejection (close code 4001, or a reason naming an invalid or
/// expired token) disables reconnection until the next explicit
/// [`connect`].
///
/// Dropping the socket aborts its connection task.
///
/// [`connect`]: NotificationSocket::connect
/// [`disconnect`]: NotificationSocket::disconnect
pub struct NotificationSocket {
    inner: Arc<SocketInner>,
}

struct SocketInner {
    ws_url: SocketUrl,
    reconnect_delay: Duration,
    shared: Mutex<Shared>,
    messages: ObserverList<Notification>,
    states: ObserverList<ConnectionState>,
}

struct Shared {
    state: ConnectionState,
    reconnect: bool,
    /// Bumped by every `connect` that starts a new task. A task whose
    /// generation is stale must not touch the shared state.
    generation: u64,
    control: Option<mpsc::UnboundedSender<Control>>,
    task: Option<JoinHandle<()>>,
}

impl SocketInner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NotificationSocket {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_url(config.ws_url.clone(), config.reconnect_delay)
    }

    pub fn with_url(ws_url: SocketUrl, reconnect_delay: Duration) -> Self {
        Self {
            inner: Arc::new(SocketInner {
                ws_url,
                reconnect_delay,
                shared: Mutex::new(Shared {
                    state: ConnectionState::Idle,
                    reconnect: false,
                    generation: 0,
                    control: None,
                    task: None,
                }),
                messages: ObserverList::new(),
                states: ObserverList::new(),
            }),
        }
    }

    /// Open the notification stream for `token`, delivering each parsed
    /// notification to `on_message`.
    ///
    /// Does nothing while a connection is open or being established.
    /// Otherwise any previous connection task is replaced and reconnection
    /// is re-enabled. Must be called within a Tokio runtime.
    #[instrument(skip_all, fields(host = ?self.inner.ws_url.host()))]
    pub fn connect<F>(&self, token: &AccessToken, on_message: F) -> Result<()>
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let url = self
            .inner
            .ws_url
            .stream_url(endpoints::NOTIFICATIONS, token.as_str())?;

        let mut shared = self.inner.lock();

        let live = shared.task.as_ref().is_some_and(|task| !task.is_finished());
        if live
            && matches!(
                shared.state,
                ConnectionState::Open | ConnectionState::Connecting
            )
        {
            debug!(state = ?shared.state, "Notification socket already connected");
            return Ok(());
        }

        if let Some(task) = shared.task.take() {
            task.abort();
        }

        shared.generation += 1;
        shared.reconnect = true;

        let (tx, rx) = mpsc::unbounded_channel();
        shared.control = Some(tx);

        let session = Session {
            inner: Arc::clone(&self.inner),
            generation: shared.generation,
            url,
            on_message: Arc::new(on_message),
        };
        debug!(generation = shared.generation, "Starting notification socket");
        shared.task = Some(tokio::spawn(session.run(rx)));

        Ok(())
    }

    /// Close the connection and disable reconnection.
    ///
    /// Safe to call at any time, any number of times.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) {
        let (generation, control, task) = {
            let mut shared = self.inner.lock();
            shared.reconnect = false;
            (shared.generation, shared.control.take(), shared.task.take())
        };

        if let Some(control) = control {
            let _ = control.send(Control::Close);
        }

        if let Some(mut task) = task {
            if tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT * 2, &mut task)
                .await
                .is_err()
            {
                warn!("Notification socket did not close in time; aborting");
                task.abort();
            }
        }

        let closed = ConnectionState::Closed {
            reconnect_scheduled: false,
        };
        let changed = {
            let mut shared = self.inner.lock();
            // A `connect` during the close handshake owns the state now.
            if shared.generation != generation {
                debug!("Notification socket reconnected during disconnect");
                return;
            }
            let changed = shared.state != closed;
            shared.state = closed;
            changed
        };
        if changed {
            self.inner.states.notify(&closed);
        }
    }

    /// Send a JSON text frame over the open connection.
    pub fn send(&self, value: &serde_json::Value) -> Result<()> {
        let shared = self.inner.lock();
        let control = match (&shared.state, &shared.control) {
            (ConnectionState::Open, Some(control)) => control,
            (state, _) => {
                return Err(TransportError::WebSocket {
                    message: format!("notification socket is not open ({:?})", state),
                }
                .into());
            }
        };

        control
            .send(Control::Send(Message::text(value.to_string())))
            .map_err(|_| {
                TransportError::WebSocket {
                    message: "notification socket task has stopped".to_string(),
                }
                .into()
            })
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Whether a dropped connection will be retried.
    pub fn reconnect_enabled(&self) -> bool {
        self.inner.lock().reconnect
    }

    /// Observe every notification, in addition to the `connect` handler.
    pub fn subscribe_messages<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.inner.messages.subscribe(callback)
    }

    /// Observe connection state transitions.
    pub fn subscribe_state<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ConnectionState) + Send + Sync + 'static,
    {
        self.inner.states.subscribe(callback)
    }

    /// Remove a message or state subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.messages.unsubscribe(id) || self.inner.states.unsubscribe(id)
    }
}

impl Drop for NotificationSocket {
    fn drop(&mut self) {
        if let Some(task) = self.inner.lock().task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for NotificationSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.inner.lock();
        f.debug_struct("NotificationSocket")
            .field("ws_url", &self.inner.ws_url)
            .field("state", &shared.state)
            .field("reconnect", &shared.reconnect)
            .finish()
    }
}

/// One logical connection: the token, handler and control channel given to
/// a single `connect` call, across all of its reconnects.
struct Session {
    inner: Arc<SocketInner>,
    generation: u64,
    url: Url,
    on_message: MessageHandler,
}

impl Session {
    async fn run(self, mut control: mpsc::UnboundedReceiver<Control>) {
        loop {
            if !self.set_state(ConnectionState::Connecting) {
                return;
            }

            let close = match self.connect_once(&mut control).await {
                Exit::Closed(close) => close,
                Exit::Disconnected => {
                    self.set_state(ConnectionState::Closed {
                        reconnect_scheduled: false,
                    });
                    return;
                }
            };

            if !self.after_close(&close) {
                return;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.inner.reconnect_delay) => {
                    debug!("Reconnecting notification socket");
                }
                _ = wait_for_close(&mut control) => {
                    self.set_state(ConnectionState::Closed {
                        reconnect_scheduled: false,
                    });
                    return;
                }
            }
        }
    }

    async fn connect_once(&self, control: &mut mpsc::UnboundedReceiver<Control>) -> Exit {
        // The URL carries the token; log the path only.
        info!(path = self.url.path(), "Connecting to notification stream");

        let connected = tokio::select! {
            result = connect_async(self.url.as_str()) => result,
            _ = wait_for_close(control) => return Exit::Disconnected,
        };

        let ws = match connected {
            Ok((ws, _)) => ws,
            Err(tungstenite::Error::Http(response))
                if matches!(response.status().as_u16(), 401 | 403) =>
            {
                return Exit::Closed(CloseInfo::new(
                    AUTH_REJECTED_CLOSE_CODE,
                    format!("handshake rejected: invalid token ({})", response.status()),
                ));
            }
            Err(e) => {
                warn!(error = %e, "Notification socket failed to connect");
                return Exit::Closed(CloseInfo::abnormal(e.to_string()));
            }
        };

        if !self.set_state(ConnectionState::Open) {
            return Exit::Disconnected;
        }
        debug!("Notification socket open");

        let (write, read) = ws.split();
        self.pump(write, read, control).await
    }

    async fn pump(
        &self,
        mut write: SplitSink<WsStream, Message>,
        mut read: SplitStream<WsStream>,
        control: &mut mpsc::UnboundedReceiver<Control>,
    ) -> Exit {
        loop {
            tokio::select! {
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.deliver(text.as_str()),
                    Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                        Ok(text) => self.deliver(text),
                        Err(e) => warn!(error = %e, "Dropping non-UTF-8 notification"),
                    },
                    Some(Ok(Message::Ping(data))) => {
                        trace!("Received ping");
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            warn!(error = %e, "Failed to send pong");
                        }
                    }
                    Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        let close = CloseInfo::from_frame(frame.as_ref());
                        // Let tungstenite answer the close handshake.
                        drain(&mut read).await;
                        return Exit::Closed(close);
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Notification socket error");
                        return Exit::Closed(CloseInfo::abnormal(e.to_string()));
                    }
                    None => return Exit::Closed(CloseInfo::abnormal("stream ended")),
                },
                command = control.recv() => match command {
                    Some(Control::Send(message)) => {
                        if let Err(e) = write.send(message).await {
                            warn!(error = %e, "Failed to send on notification socket");
                            return Exit::Closed(CloseInfo::abnormal(e.to_string()));
                        }
                    }
                    Some(Control::Close) | None => {
                        self.set_state(ConnectionState::Closing);
                        let frame = CloseFrame {
                            code: CloseCode::Normal,
                            reason: "client disconnect".into(),
                        };
                        if let Err(e) = write.send(Message::Close(Some(frame))).await {
                            debug!(error = %e, "Close frame not sent");
                        }
                        drain(&mut read).await;
                        return Exit::Disconnected;
                    }
                },
            }
        }
    }

    fn deliver(&self, payload: &str) {
        match Notification::parse(payload) {
            Ok(notification) => {
                trace!(kind = ?notification.kind(), "Notification received");
                (self.on_message)(&notification);
                self.inner.messages.notify(&notification);
            }
            Err(e) => {
                warn!(error = %e, len = payload.len(), "Dropping malformed notification");
            }
        }
    }

    /// Record a close and decide whether to retry.
    fn after_close(&self, close: &CloseInfo) -> bool {
        let retry = {
            let mut shared = self.inner.lock();
            if shared.generation != self.generation {
                return false;
            }
            if close.is_auth_rejection() {
                shared.reconnect = false;
            }
            shared.reconnect
        };

        if close.is_auth_rejection() {
            warn!(%close, "Notification socket rejected the token; not reconnecting");
        } else if retry {
            info!(%close, delay = ?self.inner.reconnect_delay, "Notification socket closed; reconnecting");
        } else {
            info!(%close, "Notification socket closed");
        }

        self.set_state(ConnectionState::Closed {
            reconnect_scheduled: retry,
        });
        retry
    }

    /// Move to `state` and notify subscribers if it changed. Returns false if
    /// this session has been superseded.
    fn set_state(&self, state: ConnectionState) -> bool {
        {
            let mut shared = self.inner.lock();
            if shared.generation != self.generation {
                return false;
            }
            if shared.state == state {
                return true;
            }
            shared.state = state;
        }
        trace!(?state, "Notification socket state");
        self.inner.states.notify(&state);
        true
    }
}

/// Resolve once a close is requested or every sender is gone. Frames queued
/// while no connection is open are dropped.
async fn wait_for_close(control: &mut mpsc::UnboundedReceiver<Control>) {
    while let Some(command) = control.recv().await {
        match command {
            Control::Close => return,
            Control::Send(_) => debug!("Dropping frame sent while disconnected"),
        }
    }
}

/// Read until the peer finishes the close handshake, bounded in time.
async fn drain(read: &mut SplitStream<WsStream>) {
    let _ = tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, async {
        while let Some(Ok(_)) = read.next().await {}
    })
    .await;
}
