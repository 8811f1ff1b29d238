//! Async client engine for the Taboo protocol.
//!
//! [`TabooClient`] is a thin handle. A background task owns the transport,
//! the session and every piece of game state; the handle talks to it over an
//! unbounded command channel. State is published on `tokio::sync::watch`
//! channels ([`roster`](TabooClient::roster), [`round`](TabooClient::round),
//! [`countdown`](TabooClient::countdown), [`connection`](TabooClient::connection))
//! and one-off happenings arrive as [`TabooEvent`]s on the bounded receiver
//! returned by [`TabooClient::start`].
//!
//! The engine reconnects on its own: whenever the transport closes or fails
//! it waits [`TabooConfig::reconnect_delay`] and dials again, forever, until
//! [`disconnect`](TabooClient::disconnect) or [`shutdown`](TabooClient::shutdown).
//!
//! # Example
//!
//! ```rust,no_run
//! use taboo_client::{MemorySessionStore, TabooClient, TabooConfig, TabooEvent, Team, WebSocketConnector};
//!
//! # async fn example() {
//! let config = TabooConfig::new("ws://localhost:8081/ws").with_player_name("Ada");
//! let (mut client, mut events) =
//!     TabooClient::start(WebSocketConnector::new(), config, MemorySessionStore::new());
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         TabooEvent::IdentityAssigned { .. } => {
//!             let _ = client.request_team_change(Team::Red);
//!         }
//!         TabooEvent::GameEnded { winner, .. } => {
//!             println!("winner: {winner:?}");
//!             break;
//!         }
//!         _ => {}
//!     }
//! }
//! client.shutdown().await;
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Sleep;
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::countdown::{Countdown, CountdownSnapshot, DEFAULT_TICK_INTERVAL};
use crate::dispatch::{GameContext, Intent};
use crate::error::{Result, TabooError};
use crate::event::{ConnectionState, TabooEvent};
use crate::protocol::{ClientMessage, Team, DEFAULT_ROUND_SECONDS};
use crate::roster::RosterSnapshot;
use crate::round::RoundSnapshot;
use crate::session::{Session, SessionStore};
use crate::transport::{Connector, Transport};

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default pause between a lost connection and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Name used for a fresh identity when none is configured or persisted.
pub const DEFAULT_PLAYER_NAME: &str = "Player";

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`TabooClient`].
///
/// Only the server URL is required.
///
/// # Example
///
/// ```
/// use taboo_client::TabooConfig;
/// use std::time::Duration;
///
/// let config = TabooConfig::new(TabooConfig::websocket_url(true, "taboo.example", "/ws"))
///     .with_player_name("Ada")
///     .with_reconnect_delay(Duration::from_secs(5));
/// assert_eq!(config.url, "wss://taboo.example/ws");
/// assert_eq!(config.player_name, "Ada");
/// ```
#[derive(Debug, Clone)]
pub struct TabooConfig {
    /// Server endpoint handed to the [`Connector`].
    pub url: String,
    /// Name sent with a fresh `connect` if no name was persisted.
    pub player_name: String,
    /// Fixed delay before every reconnect attempt. No growth, no cap.
    ///
    /// Defaults to **2 seconds**.
    pub reconnect_delay: Duration,
    /// How often a running countdown is recomputed and republished.
    ///
    /// Defaults to **250 ms**.
    pub tick_interval: Duration,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer cannot keep up, events are dropped (with a warning
    /// logged) so the engine never blocks. `Disconnected` is always delivered.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`TabooClient::shutdown`] waits for the engine before
    /// aborting it.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl TabooConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            player_name: DEFAULT_PLAYER_NAME.to_owned(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            tick_interval: DEFAULT_TICK_INTERVAL,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Build a WebSocket endpoint: `wss` when the hosting page is served
    /// securely, `ws` otherwise.
    pub fn websocket_url(secure: bool, host: &str, path: &str) -> String {
        let scheme = if secure { "wss" } else { "ws" };
        format!("{scheme}://{host}/{}", path.trim_start_matches('/'))
    }

    #[must_use]
    pub fn with_player_name(mut self, name: impl Into<String>) -> Self {
        self.player_name = name.into();
        self
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Values below 1 ms are clamped to 1 ms.
    #[must_use]
    pub fn with_tick_interval(mut self, every: Duration) -> Self {
        self.tick_interval = every.max(Duration::from_millis(1));
        self
    }

    /// Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// A zero timeout aborts the engine immediately on shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

// ── Client handle ───────────────────────────────────────────────────

#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    Intent(Intent),
}

/// Handle to the client engine.
///
/// Created via [`TabooClient::start`]. Every method queues a command and
/// returns immediately; requests are fire-and-forget and silently dropped
/// while the transport is not open.
pub struct TabooClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    roster_rx: watch::Receiver<RosterSnapshot>,
    round_rx: watch::Receiver<RoundSnapshot>,
    countdown_rx: watch::Receiver<CountdownSnapshot>,
    connection_rx: watch::Receiver<ConnectionState>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl TabooClient {
    /// Spawn the engine and issue the first connect.
    ///
    /// The persisted identity in `store` decides the first handshake: a
    /// `reconnect` if both player id and session token are known, a `connect`
    /// otherwise.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start<C: Connector>(
        connector: C,
        config: TabooConfig,
        store: impl SessionStore,
    ) -> (Self, mpsc::Receiver<TabooEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let session = Session::load(store, &config.player_name);
        let countdown = Countdown::new(Duration::from_secs(u64::from(DEFAULT_ROUND_SECONDS)))
            .with_tick_interval(config.tick_interval);
        let ctx = GameContext::new(session, countdown);

        let (roster_tx, roster_rx) = watch::channel(ctx.roster_snapshot());
        let (round_tx, round_rx) = watch::channel(ctx.round_snapshot());
        let (countdown_tx, countdown_rx) = watch::channel(ctx.countdown_snapshot());
        let (connection_tx, connection_rx) = watch::channel(ConnectionState::Disconnected);

        // Cannot fail: the receiver is alive.
        let _ = cmd_tx.send(Command::Connect);

        let engine = Engine {
            connector: Arc::new(connector),
            url: config.url,
            reconnect_delay: config.reconnect_delay,
            ctx,
            link: Link::Idle,
            event_tx,
            roster_tx,
            round_tx,
            countdown_tx,
            connection_tx,
        };
        let task = tokio::spawn(engine.run(cmd_rx, shutdown_rx));

        let client = Self {
            cmd_tx,
            roster_rx,
            round_rx,
            countdown_rx,
            connection_rx,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };
        (client, event_rx)
    }

    // ── Connection ──────────────────────────────────────────────────

    /// Open the connection. A no-op while one is open or being established;
    /// skips a pending reconnect delay.
    ///
    /// # Errors
    ///
    /// Returns [`TabooError::NotConnected`] if the engine has stopped.
    pub fn connect(&self) -> Result<()> {
        self.send(Command::Connect)
    }

    /// Close the connection and cancel any pending reconnect until the next
    /// [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns [`TabooError::NotConnected`] if the engine has stopped.
    pub fn disconnect(&self) -> Result<()> {
        self.send(Command::Disconnect)
    }

    // ── Intents ─────────────────────────────────────────────────────

    /// Ask to join `team`. The roster changes when the server confirms.
    ///
    /// # Errors
    ///
    /// Returns [`TabooError::NotConnected`] if the engine has stopped.
    pub fn request_team_change(&self, team: Team) -> Result<()> {
        self.intent(Intent::ChangeTeam(team))
    }

    /// # Errors
    ///
    /// Returns [`TabooError::NotConnected`] if the engine has stopped.
    pub fn request_ready(&self, is_ready: bool) -> Result<()> {
        self.intent(Intent::SetReady(is_ready))
    }

    /// # Errors
    ///
    /// Returns [`TabooError::NotConnected`] if the engine has stopped.
    pub fn request_skip(&self) -> Result<()> {
        self.intent(Intent::SkipWord)
    }

    /// # Errors
    ///
    /// Returns [`TabooError::NotConnected`] if the engine has stopped.
    pub fn request_guess(&self) -> Result<()> {
        self.intent(Intent::GuessWord)
    }

    /// # Errors
    ///
    /// Returns [`TabooError::NotConnected`] if the engine has stopped.
    pub fn request_start_round(&self) -> Result<()> {
        self.intent(Intent::StartRound)
    }

    /// # Errors
    ///
    /// Returns [`TabooError::NotConnected`] if the engine has stopped.
    pub fn request_resume_round(&self) -> Result<()> {
        self.intent(Intent::ResumeRound)
    }

    /// # Errors
    ///
    /// Returns [`TabooError::NotConnected`] if the engine has stopped.
    pub fn request_reset_game(&self) -> Result<()> {
        self.intent(Intent::ResetGame)
    }

    /// Rename the local player. Applied and persisted locally right away,
    /// and announced to the server once an id is known.
    ///
    /// # Errors
    ///
    /// Returns [`TabooError::NotConnected`] if the engine has stopped.
    pub fn change_name(&self, name: impl Into<String>) -> Result<()> {
        self.intent(Intent::ChangeName(name.into()))
    }

    // ── Snapshots ───────────────────────────────────────────────────

    pub fn roster(&self) -> watch::Receiver<RosterSnapshot> {
        self.roster_rx.clone()
    }

    pub fn round(&self) -> watch::Receiver<RoundSnapshot> {
        self.round_rx.clone()
    }

    pub fn countdown(&self) -> watch::Receiver<CountdownSnapshot> {
        self.countdown_rx.clone()
    }

    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection_rx.clone()
    }

    /// Returns `true` while the transport is open.
    pub fn is_connected(&self) -> bool {
        *self.connection_rx.borrow() == ConnectionState::Connected
    }

    /// Stop the engine, closing the transport.
    ///
    /// The event receiver yields a final `Disconnected` and then `None`.
    pub async fn shutdown(&mut self) {
        debug!("TabooClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("client engine terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("client engine did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("client engine aborted: {join_err}");
                    }
                }
            }
        }
    }

    fn intent(&self, intent: Intent) -> Result<()> {
        self.send(Command::Intent(intent))
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx.send(cmd).map_err(|_| TabooError::NotConnected)
    }
}

impl std::fmt::Debug for TabooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabooClient")
            .field("connection", &*self.connection_rx.borrow())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for TabooClient {
    fn drop(&mut self) {
        // No executor to drive a graceful close from here; dropping the
        // engine future drops the transport with it.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Engine ──────────────────────────────────────────────────────────

type PendingConnect<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// Where the single connection currently stands.
enum Link<T> {
    /// Not connected and not trying to.
    Idle,
    Connecting(PendingConnect<T>),
    Open(T),
    /// Waiting out the reconnect delay.
    Backoff(Pin<Box<Sleep>>),
}

enum LinkEvent<T> {
    Opened(T),
    ConnectFailed(TabooError),
    Frame(String),
    Lost(Option<String>),
    BackoffElapsed,
}

/// Wait for whatever the current link state produces next. Pending forever
/// while idle. Cancel-safe: the pending connect and the sleep stay pinned
/// inside the link, and `Transport::recv` is cancel-safe.
async fn next_link_event<T: Transport>(link: &mut Link<T>) -> LinkEvent<T> {
    match link {
        Link::Idle => std::future::pending().await,
        Link::Connecting(pending) => match pending.as_mut().await {
            Ok(transport) => LinkEvent::Opened(transport),
            Err(e) => LinkEvent::ConnectFailed(e),
        },
        Link::Open(transport) => match transport.recv().await {
            Some(Ok(text)) => LinkEvent::Frame(text),
            Some(Err(e)) => LinkEvent::Lost(Some(format!("transport receive error: {e}"))),
            None => LinkEvent::Lost(None),
        },
        Link::Backoff(sleep) => {
            sleep.as_mut().await;
            LinkEvent::BackoffElapsed
        }
    }
}

struct Engine<C: Connector> {
    connector: Arc<C>,
    url: String,
    reconnect_delay: Duration,
    ctx: GameContext,
    link: Link<C::Transport>,
    event_tx: mpsc::Sender<TabooEvent>,
    roster_tx: watch::Sender<RosterSnapshot>,
    round_tx: watch::Sender<RoundSnapshot>,
    countdown_tx: watch::Sender<CountdownSnapshot>,
    connection_tx: watch::Sender<ConnectionState>,
}

impl<C: Connector> Engine<C> {
    /// Multiplex commands, the link, countdown ticks and shutdown.
    ///
    /// Exits when the shutdown signal fires or every client handle is gone.
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        debug!(url = %self.url, "client engine started");

        loop {
            let ticking = self.ctx.countdown().is_running();
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.on_command(cmd).await,
                        None => {
                            debug!("command channel closed, stopping client engine");
                            self.teardown().await;
                            break;
                        }
                    }
                }

                _ = &mut shutdown_rx => {
                    debug!("shutdown signal received");
                    self.teardown().await;
                    break;
                }

                event = next_link_event(&mut self.link) => self.on_link_event(event).await,

                status = self.ctx.countdown_mut().tick(), if ticking => {
                    let event = self.ctx.on_countdown(status);
                    self.publish_countdown();
                    if let Some(event) = event {
                        self.emit(event);
                    }
                }
            }
        }

        debug!("client engine exited");
    }

    async fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect => match self.link {
                Link::Idle | Link::Backoff(_) => self.begin_connect(),
                Link::Connecting(_) | Link::Open(_) => {
                    debug!("connect ignored, connection already open or in progress");
                }
            },
            Command::Disconnect => {
                let was_open = self.close_link().await;
                self.ctx.on_transport_lost();
                self.publish_countdown();
                self.set_connection(ConnectionState::Disconnected);
                if was_open {
                    emit_disconnected(&self.event_tx, Some("disconnected by client".into())).await;
                }
            }
            Command::Intent(intent) => {
                let message = self.ctx.intent(intent);
                self.publish_state();
                if let Some(message) = message {
                    self.send(message).await;
                }
            }
        }
    }

    async fn on_link_event(&mut self, event: LinkEvent<C::Transport>) {
        match event {
            LinkEvent::Opened(transport) => {
                info!(url = %self.url, "connected to server");
                self.link = Link::Open(transport);
                self.set_connection(ConnectionState::Connected);
                let handshake = self.ctx.handshake();
                self.send(handshake).await;
                if matches!(self.link, Link::Open(_)) {
                    self.emit(TabooEvent::Connected);
                }
            }
            LinkEvent::ConnectFailed(e) => {
                warn!(url = %self.url, "connection attempt failed: {e}");
                self.schedule_reconnect();
                self.set_connection(ConnectionState::Disconnected);
            }
            LinkEvent::Frame(text) => match codec::decode(&text) {
                Ok(message) => {
                    debug!(kind = message.kind(), "received server message");
                    let event = self.ctx.dispatch(message);
                    let expired = self.ctx.take_expiry();
                    self.publish_state();
                    for event in event.into_iter().chain(expired) {
                        self.emit(event);
                    }
                }
                Err(e) => warn!("dropping undecodable frame: {e} (raw: {text})"),
            },
            LinkEvent::Lost(reason) => self.on_lost(reason).await,
            LinkEvent::BackoffElapsed => {
                debug!("reconnect delay elapsed");
                self.begin_connect();
            }
        }
    }

    fn begin_connect(&mut self) {
        debug!(url = %self.url, "opening connection");
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        self.link = Link::Connecting(Box::pin(async move { connector.connect(&url).await }));
        self.set_connection(ConnectionState::Connecting);
    }

    fn schedule_reconnect(&mut self) {
        debug!(delay = ?self.reconnect_delay, "scheduling reconnect");
        self.link = Link::Backoff(Box::pin(tokio::time::sleep(self.reconnect_delay)));
    }

    async fn on_lost(&mut self, reason: Option<String>) {
        match &reason {
            Some(reason) => error!("connection lost: {reason}"),
            None => info!("connection closed by server"),
        }
        self.schedule_reconnect();
        self.ctx.on_transport_lost();
        self.publish_countdown();
        self.set_connection(ConnectionState::Disconnected);
        emit_disconnected(&self.event_tx, reason).await;
    }

    /// Encode and send. A no-op unless the transport is open; a failed send
    /// counts as a lost connection.
    async fn send(&mut self, message: ClientMessage) {
        let Link::Open(transport) = &mut self.link else {
            debug!(kind = message.kind(), "not connected, dropping outgoing message");
            return;
        };
        let json = match codec::encode(&message) {
            Ok(json) => json,
            Err(e) => {
                error!(kind = message.kind(), "failed to encode client message: {e}");
                return;
            }
        };
        debug!(kind = message.kind(), "sending client message");
        if let Err(e) = transport.send(json).await {
            self.on_lost(Some(format!("transport send error: {e}"))).await;
        }
    }

    /// Drop the link, closing an open transport. Returns whether it was open.
    async fn close_link(&mut self) -> bool {
        match std::mem::replace(&mut self.link, Link::Idle) {
            Link::Open(mut transport) => {
                if let Err(e) = transport.close().await {
                    debug!("error while closing transport: {e}");
                }
                true
            }
            Link::Idle | Link::Connecting(_) | Link::Backoff(_) => false,
        }
    }

    async fn teardown(&mut self) {
        self.close_link().await;
        self.ctx.on_transport_lost();
        self.publish_countdown();
        self.set_connection(ConnectionState::Disconnected);
        emit_disconnected(&self.event_tx, Some("client shut down".into())).await;
    }

    fn set_connection(&self, state: ConnectionState) {
        publish(&self.connection_tx, state);
    }

    fn publish_countdown(&self) {
        publish(&self.countdown_tx, self.ctx.countdown_snapshot());
    }

    fn publish_state(&self) {
        publish(&self.roster_tx, self.ctx.roster_snapshot());
        publish(&self.round_tx, self.ctx.round_snapshot());
        self.publish_countdown();
    }

    /// Emit an event. If the channel is full, log a warning and drop the
    /// event so the engine never blocks on a slow consumer.
    fn emit(&self, event: TabooEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!("event channel full, dropping event: {dropped:?}");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("event channel closed, receiver dropped");
            }
        }
    }
}

/// Emit a [`Disconnected`](TabooEvent::Disconnected) event.
///
/// Uses `send().await` instead of `try_send` so it is never dropped on a full
/// channel.
async fn emit_disconnected(event_tx: &mpsc::Sender<TabooEvent>, reason: Option<String>) {
    if event_tx
        .send(TabooEvent::Disconnected { reason })
        .await
        .is_err()
    {
        debug!("event channel closed, receiver dropped");
    }
}

/// Replace the watched value, waking receivers only if it changed.
fn publish<T: PartialEq>(tx: &watch::Sender<T>, value: T) {
    tx.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ── Mock transport ──────────────────────────────────────────────

    /// Replays scripted frames, records what was sent, then hangs.
    struct ScriptedTransport {
        incoming: std::collections::VecDeque<String>,
        sent: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), TabooError> {
            self.sent
                .send(message)
                .map_err(|_| TabooError::TransportClosed)
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, TabooError>> {
            match self.incoming.pop_front() {
                Some(frame) => Some(Ok(frame)),
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> std::result::Result<(), TabooError> {
            Ok(())
        }
    }

    struct ScriptedConnector {
        script: Vec<String>,
        sent: mpsc::UnboundedSender<String>,
        attempts: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        type Transport = ScriptedTransport;

        async fn connect(&self, _url: &str) -> std::result::Result<ScriptedTransport, TabooError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(ScriptedTransport {
                incoming: self.script.iter().cloned().collect(),
                sent: self.sent.clone(),
            })
        }
    }

    fn scripted(
        script: &[&str],
        delay: Duration,
    ) -> (
        ScriptedConnector,
        mpsc::UnboundedReceiver<String>,
        Arc<AtomicUsize>,
    ) {
        let (sent, sent_rx) = mpsc::unbounded_channel();
        let attempts = Arc::new(AtomicUsize::new(0));
        let connector = ScriptedConnector {
            script: script.iter().map(|s| (*s).to_owned()).collect(),
            sent,
            attempts: Arc::clone(&attempts),
            delay,
        };
        (connector, sent_rx, attempts)
    }

    const CONNECT_ACK: &str =
        r#"{"type":"connect_ack","playerId":"p1","sessionToken":"t1","name":"Ada"}"#;

    // ── Tests ───────────────────────────────────────────────────────

    #[test]
    fn config_defaults() {
        let config = TabooConfig::new("ws://localhost:8081/ws");
        assert_eq!(config.player_name, DEFAULT_PLAYER_NAME);
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn config_clamps_degenerate_values() {
        let config = TabooConfig::new("ws://x")
            .with_event_channel_capacity(0)
            .with_tick_interval(Duration::ZERO);
        assert_eq!(config.event_channel_capacity, 1);
        assert_eq!(config.tick_interval, Duration::from_millis(1));
    }

    #[test]
    fn websocket_url_follows_page_security() {
        assert_eq!(
            TabooConfig::websocket_url(false, "localhost:8081", "/ws"),
            "ws://localhost:8081/ws"
        );
        assert_eq!(
            TabooConfig::websocket_url(true, "taboo.example", "ws"),
            "wss://taboo.example/ws"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn start_sends_connect_then_emits_identity() {
        let (connector, mut sent, _attempts) = scripted(&[CONNECT_ACK], Duration::ZERO);
        let config = TabooConfig::new("mock://").with_player_name("Ada");
        let (mut client, mut events) = TabooClient::start(connector, config, MemorySessionStore::new());

        assert_eq!(events.recv().await.unwrap(), TabooEvent::Connected);
        assert_eq!(
            events.recv().await.unwrap(),
            TabooEvent::IdentityAssigned {
                player_id: "p1".into(),
                name: "Ada".into(),
                resumed: false,
            }
        );
        assert_eq!(sent.recv().await.unwrap(), r#"{"type":"connect","name":"Ada"}"#);
        assert!(client.is_connected());
        let roster = client.roster();
        assert_eq!(roster.borrow().players[0].id.as_deref(), Some("p1"));

        client.shutdown().await;
        assert!(matches!(
            events.recv().await.unwrap(),
            TabooEvent::Disconnected { .. }
        ));
        assert!(events.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn connect_while_pending_opens_one_transport() {
        let (connector, _sent, attempts) = scripted(&[], Duration::from_millis(500));
        let (mut client, mut events) = TabooClient::start(
            connector,
            TabooConfig::new("mock://"),
            MemorySessionStore::new(),
        );
        client.connect().unwrap();
        client.connect().unwrap();

        assert_eq!(events.recv().await.unwrap(), TabooEvent::Connected);
        client.connect().unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn undecodable_frames_are_dropped() {
        let (connector, _sent, _attempts) = scripted(
            &["not json", r#"{"type":"mystery"}"#, r#"{"no":"type"}"#, CONNECT_ACK],
            Duration::ZERO,
        );
        let (mut client, mut events) = TabooClient::start(
            connector,
            TabooConfig::new("mock://"),
            MemorySessionStore::new(),
        );

        assert_eq!(events.recv().await.unwrap(), TabooEvent::Connected);
        assert!(matches!(
            events.recv().await.unwrap(),
            TabooEvent::IdentityAssigned { .. }
        ));
        assert!(client.is_connected());
        client.shutdown().await;
    }

    #[tokio::test]
    async fn handle_errors_after_shutdown() {
        let (connector, _sent, _attempts) = scripted(&[], Duration::ZERO);
        let (mut client, _events) = TabooClient::start(
            connector,
            TabooConfig::new("mock://"),
            MemorySessionStore::new(),
        );
        client.shutdown().await;
        assert!(matches!(
            client.request_guess(),
            Err(TabooError::NotConnected)
        ));
        assert!(!client.is_connected());
    }
}
