//! Realtime messaging and presence client.
//!
//! Manages one lazily-created, reusable WebSocket connection shared by the
//! whole client. Public methods hand work to a background connection task
//! over a command channel; the task owns the stream, parses every inbound
//! frame into [`ServerEvent`], dispatches to registered handlers, sends
//! keepalive pings, and reconnects with capped exponential backoff.
//!
//! Handlers are registered client-side (see [`crate::registry`]) and survive
//! disconnects: after a reconnect they keep receiving events without
//! re-registration, and the last presence watch list is re-emitted so the
//! server rebuilds its fan-out for this session.

use crate::auth::Auth;
use crate::error::{ChatLinkError, Result};
use crate::event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
use crate::models::{ClientEvent, ConnectionOptions, Message as ChatMessage, ServerEvent};
use crate::registry::{SharedRegistry, Subscription};
use crate::timeouts::ChatLinkTimeouts;
use crate::token::{SharedTokenStore, TokenStore};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use reqwest::Url;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant as TokioInstant;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, error::Error as WsError, protocol::Message},
};

type WebSocketStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>;

/// Inbound frames above this size are dropped with a warning.
const MAX_WS_TEXT_MESSAGE_BYTES: usize = 1 << 20; // 1 MiB

/// Stand-in deadline for disabled timers.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365);

/// Command channel capacity between the public API and the connection task.
const CMD_CHANNEL_CAPACITY: usize = 256;

/// Result of a connect-triggering call.
///
/// Distinguishes "not logged in" from "connection underway" so callers do
/// not have to guess why nothing happened. Transport-level failures are
/// never surfaced here — observe them via
/// [`connection_state`](RealtimeClient::connection_state) and
/// [`EventHandlers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A connection exists or is being established in the background.
    Ready,
    /// No credential is stored; nothing was done.
    NotAuthenticated,
}

/// Observable state of the shared connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport session (never connected, dropped, or torn down).
    Disconnected,
    /// A connect or reconnect attempt is underway.
    Connecting,
    /// The transport session is established.
    Connected,
}

const STATE_DISCONNECTED: u8 = 0;
const STATE_CONNECTING: u8 = 1;
const STATE_CONNECTED: u8 = 2;

fn load_state(state: &AtomicU8) -> ConnectionState {
    match state.load(Ordering::SeqCst) {
        STATE_CONNECTED => ConnectionState::Connected,
        STATE_CONNECTING => ConnectionState::Connecting,
        _ => ConnectionState::Disconnected,
    }
}

// ── Commands ────────────────────────────────────────────────────────────────

/// Commands sent from the public API to the background connection task.
enum ConnCmd {
    /// Redial request for a task sitting disconnected (auto-reconnect off,
    /// or attempts exhausted). No-op while a session is up.
    Connect,
    EmitTyping { to_user_id: String, is_typing: bool },
    WatchPresence { user_ids: Vec<String> },
    Shutdown,
}

struct ConnectionHandle {
    cmd_tx: mpsc::Sender<ConnCmd>,
    task: JoinHandle<()>,
    /// State cell owned by this task alone; a retired task keeps writing to
    /// its own cell and can never clobber its replacement's.
    state: Arc<AtomicU8>,
}

// ── Public client ───────────────────────────────────────────────────────────

/// Client for the realtime messaging and presence channel.
///
/// At most one transport connection exists per client; acquire the client
/// once and share it. Construction never performs network I/O — the
/// connection is established lazily on the first connect-triggering call.
pub struct RealtimeClient {
    base_url: String,
    tokens: SharedTokenStore,
    registry: SharedRegistry,
    timeouts: ChatLinkTimeouts,
    options: ConnectionOptions,
    event_handlers: EventHandlers,
    handle: Mutex<Option<ConnectionHandle>>,
    /// Most recent presence watch list, replayed after every (re)connect —
    /// including an explicit `disconnect()` followed by `connect()`.
    last_watch: Arc<Mutex<Option<Vec<String>>>>,
    epoch: AtomicU64,
}

impl RealtimeClient {
    pub(crate) fn new(
        base_url: String,
        tokens: SharedTokenStore,
        timeouts: ChatLinkTimeouts,
        options: ConnectionOptions,
        event_handlers: EventHandlers,
    ) -> Self {
        Self {
            base_url,
            tokens,
            registry: SharedRegistry::new(),
            timeouts,
            options,
            event_handlers,
            handle: Mutex::new(None),
            last_watch: Arc::new(Mutex::new(None)),
            epoch: AtomicU64::new(0),
        }
    }

    fn has_credential(&self) -> bool {
        matches!(self.tokens.get(), Ok(Some(_)))
    }

    /// Ensure the shared connection exists, creating it if needed.
    ///
    /// With no stored credential this is a no-op returning
    /// [`ConnectOutcome::NotAuthenticated`]. Otherwise the single background
    /// connection task is spawned if absent. Calling `connect` on a live
    /// connection changes nothing (see
    /// [`connection_epoch`](Self::connection_epoch)); calling it while the
    /// task sits disconnected — auto-reconnect disabled, or reconnection
    /// attempts exhausted — asks that task to redial. A credential replaced
    /// between calls is picked up on the next handshake; the connection is
    /// reused, not recreated.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) -> ConnectOutcome {
        if !self.has_credential() {
            return ConnectOutcome::NotAuthenticated;
        }

        let mut guard = self.handle.lock().unwrap();
        if let Some(handle) = guard.as_ref() {
            if !handle.task.is_finished() {
                if load_state(&handle.state) == ConnectionState::Disconnected {
                    let _ = handle.cmd_tx.try_send(ConnCmd::Connect);
                }
                return ConnectOutcome::Ready;
            }
        }

        let state = Arc::new(AtomicU8::new(STATE_CONNECTING));
        let (cmd_tx, cmd_rx) = mpsc::channel(CMD_CHANNEL_CAPACITY);
        let task = tokio::spawn(connection_task(
            cmd_rx,
            self.base_url.clone(),
            Arc::clone(&self.tokens),
            self.registry.clone(),
            self.timeouts.clone(),
            self.options.clone(),
            self.event_handlers.clone(),
            Arc::clone(&state),
            Arc::clone(&self.last_watch),
        ));
        *guard = Some(ConnectionHandle { cmd_tx, task, state });
        self.epoch.fetch_add(1, Ordering::SeqCst);

        ConnectOutcome::Ready
    }

    /// Tear down the active connection. No-op when there is none.
    ///
    /// Previously registered subscriptions are kept client-side; a later
    /// [`connect`](Self::connect) resumes delivery to them without
    /// re-registration. The last presence watch list is kept as well and
    /// replayed on the next connect.
    pub fn disconnect(&self) {
        let taken = self.handle.lock().unwrap().take();
        if let Some(handle) = taken {
            // Dropping cmd_tx also ends the task, so a full channel is fine.
            let _ = handle.cmd_tx.try_send(ConnCmd::Shutdown);
            debug!("[chat-link] Disconnect requested");
        }
    }

    /// Current observable connection state.
    ///
    /// Reads the state cell of the current connection task; with no task,
    /// [`ConnectionState::Disconnected`].
    pub fn connection_state(&self) -> ConnectionState {
        match self.handle.lock().unwrap().as_ref() {
            Some(handle) => load_state(&handle.state),
            None => ConnectionState::Disconnected,
        }
    }

    /// Number of times a connection task has been created.
    ///
    /// Stays constant across repeated `connect()` calls and across credential
    /// changes, which mutate the existing connection's auth parameter rather
    /// than recreating it.
    pub fn connection_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    // ── Subscriptions ───────────────────────────────────────────────────

    /// Subscribe to `messages:new`. Implicitly connects.
    ///
    /// Without a stored credential, registers nothing and returns an inert
    /// disposer that is safe to invoke.
    pub fn on_new_message(
        &self,
        handler: impl Fn(ChatMessage) + Send + Sync + 'static,
    ) -> Subscription {
        if self.connect() == ConnectOutcome::NotAuthenticated {
            return Subscription::inert();
        }
        self.registry.add_new_message(Arc::new(handler))
    }

    /// Subscribe to `messages:typing`. Implicitly connects.
    pub fn on_typing(
        &self,
        handler: impl Fn(crate::models::TypingSignal) + Send + Sync + 'static,
    ) -> Subscription {
        if self.connect() == ConnectOutcome::NotAuthenticated {
            return Subscription::inert();
        }
        self.registry.add_typing(Arc::new(handler))
    }

    /// Subscribe to `presence:snapshot`. Implicitly connects.
    pub fn on_presence_snapshot(
        &self,
        handler: impl Fn(crate::models::PresenceSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        if self.connect() == ConnectOutcome::NotAuthenticated {
            return Subscription::inert();
        }
        self.registry.add_presence_snapshot(Arc::new(handler))
    }

    /// Subscribe to `presence:update`. Implicitly connects.
    pub fn on_presence_update(
        &self,
        handler: impl Fn(crate::models::PresenceState) + Send + Sync + 'static,
    ) -> Subscription {
        if self.connect() == ConnectOutcome::NotAuthenticated {
            return Subscription::inert();
        }
        self.registry.add_presence_update(Arc::new(handler))
    }

    // ── Outbound emitters ───────────────────────────────────────────────

    /// Best-effort typing notification. Fire-and-forget: no acknowledgement
    /// is awaited, and the emission is silently dropped when there is no
    /// credential or connection.
    pub fn emit_typing(&self, to_user_id: impl Into<String>, is_typing: bool) {
        self.try_command(ConnCmd::EmitTyping {
            to_user_id: to_user_id.into(),
            is_typing,
        });
    }

    /// Replace the watched user set.
    ///
    /// The input is de-duplicated and ordered before emission, so
    /// `["7", "7", "3"]` and `["3", "7"]` produce identical payloads. The
    /// server answers with a `presence:snapshot` for exactly this set, then
    /// incremental `presence:update` deltas. The list is remembered and
    /// re-emitted automatically after every reconnect, including an explicit
    /// [`disconnect`](Self::disconnect) followed by
    /// [`connect`](Self::connect). Silently dropped when there is no
    /// credential or connection.
    pub fn watch_presence<I, S>(&self, user_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let user_ids = normalize_watch_list(user_ids);
        let guard = self.handle.lock().unwrap();
        if let Some(handle) = guard.as_ref() {
            *self.last_watch.lock().unwrap() = Some(user_ids.clone());
            if handle
                .cmd_tx
                .try_send(ConnCmd::WatchPresence { user_ids })
                .is_err()
            {
                debug!("[chat-link] Dropped realtime emission (task busy or gone)");
            }
        } else {
            debug!("[chat-link] Dropped realtime emission (no connection)");
        }
    }

    fn try_command(&self, cmd: ConnCmd) {
        let guard = self.handle.lock().unwrap();
        if let Some(handle) = guard.as_ref() {
            if handle.cmd_tx.try_send(cmd).is_err() {
                debug!("[chat-link] Dropped realtime emission (task busy or gone)");
            }
        } else {
            debug!("[chat-link] Dropped realtime emission (no connection)");
        }
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.handle.lock() {
            if let Some(handle) = guard.take() {
                let _ = handle.cmd_tx.try_send(ConnCmd::Shutdown);
            }
        }
    }
}

/// De-duplicate and order a watch list (order-insensitive set equality).
fn normalize_watch_list<I, S>(user_ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let set: std::collections::BTreeSet<String> =
        user_ids.into_iter().map(Into::into).collect();
    set.into_iter().collect()
}

/// Derive the realtime endpoint from the HTTP base URL: bare origin with the
/// path suffix stripped and the scheme swapped to ws(s).
fn resolve_ws_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url.trim()).map_err(|e| {
        ChatLinkError::ConfigurationError(format!("Invalid base_url '{}': {}", base_url, e))
    })?;

    if url.host_str().is_none() {
        return Err(ChatLinkError::ConfigurationError(
            "base_url must include a host".to_string(),
        ));
    }

    let ws_scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ChatLinkError::ConfigurationError(format!(
                "Unsupported base_url scheme '{}'; expected http(s) or ws(s)",
                other
            )));
        }
    };

    url.set_scheme(ws_scheme).map_err(|_| {
        ChatLinkError::ConfigurationError("Failed to set WebSocket URL scheme".to_string())
    })?;
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

// ── Background connection task ──────────────────────────────────────────────

async fn establish_ws(
    base_url: &str,
    tokens: &SharedTokenStore,
    timeouts: &ChatLinkTimeouts,
    event_handlers: &EventHandlers,
) -> Result<WebSocketStream> {
    // Re-read the store on every attempt so a token replaced mid-session
    // takes effect on the next handshake.
    let auth = Auth::from_store(tokens)?;
    if !auth.is_authenticated() {
        let msg = "No stored credential for realtime handshake".to_string();
        event_handlers.emit_error(ConnectionError::new(&msg, true));
        return Err(ChatLinkError::AuthenticationError(msg));
    }

    let mut url = resolve_ws_url(base_url)?;
    auth.apply_to_ws_url(&mut url);

    debug!("[chat-link] Establishing realtime connection to {}", url.host_str().unwrap_or("?"));

    let request = url.as_str().into_client_request().map_err(|e| {
        ChatLinkError::WebSocketError(format!("Failed to build WebSocket request: {}", e))
    })?;

    let connect_result = if !ChatLinkTimeouts::is_no_timeout(timeouts.connection_timeout) {
        tokio::time::timeout(timeouts.connection_timeout, connect_async(request)).await
    } else {
        Ok(connect_async(request).await)
    };

    match connect_result {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(WsError::Http(response))) => {
            let status = response.status();
            let body_text = response
                .into_body()
                .as_ref()
                .filter(|b| !b.is_empty())
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();

            let message = match status.as_u16() {
                401 => "Unauthorized: realtime handshake rejected the credential".to_string(),
                403 => "Forbidden: realtime access denied".to_string(),
                code => {
                    if body_text.is_empty() {
                        format!("Realtime HTTP error: {}", code)
                    } else {
                        format!("Realtime HTTP error {}: {}", code, body_text)
                    }
                }
            };
            event_handlers.emit_error(ConnectionError::new(&message, false));
            Err(ChatLinkError::WebSocketError(message))
        }
        Ok(Err(e)) => {
            let msg = format!("Connection failed: {}", e);
            event_handlers.emit_error(ConnectionError::new(&msg, true));
            Err(ChatLinkError::WebSocketError(msg))
        }
        Err(_) => {
            let msg = format!("Connection timeout ({:?})", timeouts.connection_timeout);
            event_handlers.emit_error(ConnectionError::new(&msg, true));
            Err(ChatLinkError::TimeoutError(msg))
        }
    }
}

async fn send_event(ws: &mut WebSocketStream, event: &ClientEvent) -> Result<()> {
    let payload = serde_json::to_string(event).map_err(|e| {
        ChatLinkError::SerializationError(format!("Failed to serialize event: {}", e))
    })?;
    ws.send(Message::Text(payload.into()))
        .await
        .map_err(|e| ChatLinkError::WebSocketError(format!("Failed to send event: {}", e)))
}

/// Parse one inbound text frame and fan it out to registered handlers.
///
/// Handlers for a family run serialized in arrival order; no ordering is
/// promised across families.
fn dispatch_frame(text: &str, registry: &SharedRegistry, event_handlers: &EventHandlers) {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(ServerEvent::NewMessage(message)) => registry.dispatch_new_message(message),
        Ok(ServerEvent::Typing(signal)) => registry.dispatch_typing(signal),
        Ok(ServerEvent::PresenceSnapshot(snapshot)) => {
            registry.dispatch_presence_snapshot(snapshot)
        }
        Ok(ServerEvent::PresenceUpdate(state)) => registry.dispatch_presence_update(state),
        Err(e) => {
            warn!("[chat-link] Unrecognized realtime frame: {}", e);
            event_handlers.emit_error(ConnectionError::new(
                format!("Unrecognized realtime frame: {}", e),
                true,
            ));
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn connection_task(
    mut cmd_rx: mpsc::Receiver<ConnCmd>,
    base_url: String,
    tokens: SharedTokenStore,
    registry: SharedRegistry,
    timeouts: ChatLinkTimeouts,
    options: ConnectionOptions,
    event_handlers: EventHandlers,
    state: Arc<AtomicU8>,
    last_watch: Arc<Mutex<Option<Vec<String>>>>,
) {
    let mut ws_stream: Option<WebSocketStream> = None;
    let mut shutdown_requested = false;
    let mut reconnect_attempts: u32 = 0;

    let has_keepalive = !timeouts.keepalive_interval.is_zero();
    let keepalive_dur = if has_keepalive {
        timeouts.keepalive_interval
    } else {
        FAR_FUTURE
    };
    let mut idle_deadline = TokioInstant::now() + keepalive_dur;

    let has_pong_timeout = has_keepalive && !timeouts.pong_timeout.is_zero();
    let mut awaiting_pong = false;
    let mut pong_deadline = TokioInstant::now() + FAR_FUTURE;

    if let Some(stream) =
        open_session(&base_url, &tokens, &timeouts, &event_handlers, &state, &last_watch).await
    {
        ws_stream = Some(stream);
        idle_deadline = TokioInstant::now() + keepalive_dur;
    }

    loop {
        if shutdown_requested {
            if let Some(mut ws) = ws_stream.take() {
                let _ = ws.close(None).await;
            }
            let was_connected = state.swap(STATE_DISCONNECTED, Ordering::SeqCst) == STATE_CONNECTED;
            if was_connected {
                event_handlers
                    .emit_disconnect(DisconnectReason::with_code("Client disconnected", 1000));
            }
            return;
        }

        if let Some(mut ws) = ws_stream.take() {
            let idle_sleep = tokio::time::sleep_until(idle_deadline);
            tokio::pin!(idle_sleep);

            let pong_sleep = tokio::time::sleep_until(pong_deadline);
            tokio::pin!(pong_sleep);

            // Whether the stream is still usable after this iteration.
            let mut keep_stream = true;

            tokio::select! {
                biased;

                _ = &mut pong_sleep, if has_pong_timeout && awaiting_pong => {
                    warn!("[chat-link] Pong timeout ({:?})", timeouts.pong_timeout);
                    event_handlers.emit_disconnect(DisconnectReason::new(format!(
                        "Pong timeout ({:?})", timeouts.pong_timeout,
                    )));
                    state.store(STATE_DISCONNECTED, Ordering::SeqCst);
                    awaiting_pong = false;
                    keep_stream = false;
                }

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(ConnCmd::EmitTyping { to_user_id, is_typing }) => {
                            let event = ClientEvent::Typing { to_user_id, is_typing };
                            if let Err(e) = send_event(&mut ws, &event).await {
                                // Fire-and-forget: report, then let the read
                                // side discover the broken stream.
                                debug!("[chat-link] Typing emission failed: {}", e);
                            }
                        },
                        Some(ConnCmd::WatchPresence { user_ids }) => {
                            let event = ClientEvent::WatchPresence { user_ids };
                            if let Err(e) = send_event(&mut ws, &event).await {
                                debug!("[chat-link] Presence watch failed: {}", e);
                            }
                        },
                        // Already connected.
                        Some(ConnCmd::Connect) => {},
                        Some(ConnCmd::Shutdown) | None => {
                            shutdown_requested = true;
                        },
                    }
                }

                _ = &mut idle_sleep, if has_keepalive && !awaiting_pong => {
                    match ws.send(Message::Ping(Bytes::new())).await {
                        Ok(()) => {
                            if has_pong_timeout {
                                awaiting_pong = true;
                                pong_deadline = TokioInstant::now() + timeouts.pong_timeout;
                            }
                            idle_deadline = TokioInstant::now() + keepalive_dur;
                        }
                        Err(e) => {
                            warn!("[chat-link] Keepalive ping failed: {}", e);
                            event_handlers.emit_disconnect(DisconnectReason::new(format!(
                                "Keepalive ping failed: {}", e
                            )));
                            state.store(STATE_DISCONNECTED, Ordering::SeqCst);
                            awaiting_pong = false;
                            keep_stream = false;
                        }
                    }
                }

                frame = ws.next() => {
                    idle_deadline = TokioInstant::now() + keepalive_dur;
                    if awaiting_pong {
                        awaiting_pong = false;
                        pong_deadline = TokioInstant::now() + FAR_FUTURE;
                    }

                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if text.len() > MAX_WS_TEXT_MESSAGE_BYTES {
                                warn!("[chat-link] Dropping oversized frame ({} bytes)", text.len());
                            } else {
                                dispatch_frame(&text, &registry, &event_handlers);
                            }
                        },
                        Some(Ok(Message::Binary(_))) => {
                            warn!("[chat-link] Ignoring unexpected binary frame");
                        },
                        Some(Ok(Message::Close(frame))) => {
                            let reason = match frame {
                                Some(f) => DisconnectReason::with_code(f.reason.to_string(), f.code.into()),
                                None => DisconnectReason::new("Server closed connection"),
                            };
                            event_handlers.emit_disconnect(reason);
                            state.store(STATE_DISCONNECTED, Ordering::SeqCst);
                            keep_stream = false;
                        },
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = ws.send(Message::Pong(payload)).await;
                        },
                        Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {},
                        Some(Err(e)) => {
                            let msg = e.to_string();
                            event_handlers.emit_error(ConnectionError::new(&msg, true));
                            event_handlers.emit_disconnect(DisconnectReason::new(format!(
                                "WebSocket error: {}", msg
                            )));
                            state.store(STATE_DISCONNECTED, Ordering::SeqCst);
                            keep_stream = false;
                        },
                        None => {
                            event_handlers.emit_disconnect(DisconnectReason::new("WebSocket stream ended"));
                            state.store(STATE_DISCONNECTED, Ordering::SeqCst);
                            keep_stream = false;
                        },
                    }
                }
            }

            if keep_stream {
                ws_stream = Some(ws);
            }
        } else {
            // ── Not connected: redial on request or with backoff ────────
            if !options.auto_reconnect {
                match cmd_rx.recv().await {
                    Some(ConnCmd::Connect) => {
                        // Explicit connect(): one attempt, no backoff.
                        if let Some(stream) = open_session(
                            &base_url, &tokens, &timeouts, &event_handlers, &state, &last_watch,
                        )
                        .await
                        {
                            ws_stream = Some(stream);
                            idle_deadline = TokioInstant::now() + keepalive_dur;
                            awaiting_pong = false;
                            pong_deadline = TokioInstant::now() + FAR_FUTURE;
                        }
                    }
                    Some(ConnCmd::WatchPresence { .. }) => {
                        debug!("[chat-link] Presence watch deferred until reconnect");
                    }
                    Some(ConnCmd::EmitTyping { .. }) => {
                        debug!("[chat-link] Dropped typing emission (disconnected)");
                    }
                    Some(ConnCmd::Shutdown) | None => {
                        shutdown_requested = true;
                    }
                }
                continue;
            }

            if let Some(max) = options.max_reconnect_attempts {
                if reconnect_attempts >= max {
                    warn!("[chat-link] Max reconnection attempts ({}) reached", max);
                    event_handlers.emit_error(ConnectionError::new(
                        format!("Max reconnection attempts ({}) reached", max),
                        false,
                    ));
                    // Park until an explicit connect() restarts the count.
                    loop {
                        match cmd_rx.recv().await {
                            Some(ConnCmd::Connect) => {
                                reconnect_attempts = 0;
                                break;
                            }
                            Some(ConnCmd::WatchPresence { .. }) => {}
                            Some(ConnCmd::EmitTyping { .. }) => {}
                            Some(ConnCmd::Shutdown) | None => return,
                        }
                    }
                    continue;
                }
            }

            let delay = options.backoff_delay_ms(reconnect_attempts);
            reconnect_attempts += 1;
            info!(
                "[chat-link] Reconnecting in {}ms (attempt {})",
                delay, reconnect_attempts
            );

            let sleep_fut = tokio::time::sleep(Duration::from_millis(delay));
            tokio::pin!(sleep_fut);

            let mut got_shutdown = false;
            loop {
                tokio::select! {
                    biased;
                    cmd = cmd_rx.recv() => {
                        match cmd {
                            // Explicit connect() cuts the backoff short.
                            Some(ConnCmd::Connect) => { break; },
                            Some(ConnCmd::WatchPresence { .. }) => {},
                            Some(ConnCmd::EmitTyping { .. }) => {
                                debug!("[chat-link] Dropped typing emission (reconnecting)");
                            },
                            Some(ConnCmd::Shutdown) | None => {
                                got_shutdown = true;
                                break;
                            },
                        }
                    }
                    _ = &mut sleep_fut => { break; }
                }
            }

            if got_shutdown {
                shutdown_requested = true;
                continue;
            }

            if let Some(stream) =
                open_session(&base_url, &tokens, &timeouts, &event_handlers, &state, &last_watch)
                    .await
            {
                reconnect_attempts = 0;
                ws_stream = Some(stream);
                idle_deadline = TokioInstant::now() + keepalive_dur;
                awaiting_pong = false;
                pong_deadline = TokioInstant::now() + FAR_FUTURE;
            }
        }
    }
}

/// One connect attempt: establish the transport, publish the state change,
/// fire `on_connect`, and replay the remembered watch list so the server
/// rebuilds presence fan-out for the new session. Handler registrations are
/// client-side and need no replay.
async fn open_session(
    base_url: &str,
    tokens: &SharedTokenStore,
    timeouts: &ChatLinkTimeouts,
    event_handlers: &EventHandlers,
    state: &AtomicU8,
    last_watch: &Mutex<Option<Vec<String>>>,
) -> Option<WebSocketStream> {
    state.store(STATE_CONNECTING, Ordering::SeqCst);
    match establish_ws(base_url, tokens, timeouts, event_handlers).await {
        Ok(mut stream) => {
            info!("[chat-link] Realtime connected");
            state.store(STATE_CONNECTED, Ordering::SeqCst);
            event_handlers.emit_connect();
            let watch = last_watch.lock().unwrap().clone();
            if let Some(user_ids) = watch {
                let _ = send_event(&mut stream, &ClientEvent::WatchPresence { user_ids }).await;
            }
            Some(stream)
        }
        Err(e) => {
            state.store(STATE_DISCONNECTED, Ordering::SeqCst);
            warn!("[chat-link] Connection attempt failed: {}", e);
            None
        }
    }
}
