//! Shared real-time client: connection lifecycle and actor task.
//!
//! One [`RealtimeClient`] task owns the transport handle, the reconnect
//! state, and the subscription bookkeeping. Everything else talks to it
//! through a cloneable [`RealtimeHandle`]: commands flow in over a channel,
//! status changes flow out over a `watch`, and data frames fan out over a
//! `broadcast`. This keeps all mutation on a single task, so consumers see
//! data frames in exactly the order the transport received them.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use pulse_core::{Frame, FrameCodec, RealtimeConfig, CLOSE_NORMAL};

use crate::router::MessageRouter;
use crate::state::ConnectionStatus;
use crate::subscription::{SubscriptionSet, SubscriptionSnapshot};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Commands accepted by the client task.
#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    Subscribe(String),
    Unsubscribe(String),
    Send(serde_json::Value),
}

/// How a live connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// Intentional close (local disconnect, server close 1000, or all
    /// handles dropped). No reconnection.
    Shutdown,
    /// Transport lost abnormally.
    Lost,
    /// Socket error observed.
    Errored,
}

/// Supervisor control flow.
#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    Dial,
    Backoff(Duration),
}

/// Cloneable handle to the shared real-time client.
///
/// All UI features share one handle (or clones of it); none may construct
/// a second transport.
#[derive(Debug, Clone)]
pub struct RealtimeHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    status_rx: watch::Receiver<ConnectionStatus>,
    router: Arc<MessageRouter>,
    subs: Arc<RwLock<SubscriptionSet>>,
}

impl RealtimeHandle {
    /// Returns the current connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// Returns true if the connection is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Returns a watch receiver for observing status transitions.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    /// Requests a connection.
    ///
    /// Idempotent: a no-op while connected or connecting; while a
    /// reconnect timer is pending, cancels the timer and dials
    /// immediately.
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    /// Disconnects intentionally and suppresses reconnection.
    ///
    /// Cancels any pending reconnect timer. Consumers are not cancelled;
    /// they observe the status transition.
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Subscribes to a logical channel.
    ///
    /// The channel is remembered across disconnects and replayed on every
    /// new connection. Duplicate calls never produce a second in-flight
    /// subscribe request.
    pub fn subscribe(&self, channel: impl Into<String>) {
        self.command(Command::Subscribe(channel.into()));
    }

    /// Unsubscribes from a logical channel.
    pub fn unsubscribe(&self, channel: impl Into<String>) {
        self.command(Command::Unsubscribe(channel.into()));
    }

    /// Sends an application payload over the live connection.
    ///
    /// Not connected is a no-op: the payload is dropped with a warning and
    /// `false` is returned. Only subscriptions are queued for later, never
    /// arbitrary app messages.
    pub fn send(&self, payload: serde_json::Value) -> bool {
        if !self.is_connected() {
            warn!("send while not connected, dropping payload");
            return false;
        }
        self.cmd_tx.send(Command::Send(payload)).is_ok()
    }

    /// Returns a receiver for the live data frame stream.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<Frame> {
        self.router.subscribe_events()
    }

    /// Returns the retained data frame history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Frame> {
        self.router.history()
    }

    /// Returns a snapshot of the subscription sets.
    #[must_use]
    pub fn subscriptions(&self) -> SubscriptionSnapshot {
        self.subs.read().snapshot()
    }

    fn command(&self, command: Command) {
        if self.cmd_tx.send(command).is_err() {
            debug!("client task gone, command dropped");
        }
    }
}

/// The shared real-time client task.
///
/// # Example
///
/// ```ignore
/// use pulse_client::RealtimeClient;
/// use pulse_core::RealtimeConfig;
///
/// let config = RealtimeConfig::builder()
///     .endpoint("wss://dashboard.example.com/ws")
///     .token(session_token)
///     .build();
///
/// let handle = RealtimeClient::spawn(config);
/// handle.subscribe("investigation:42");
/// handle.connect();
/// ```
pub struct RealtimeClient;

impl RealtimeClient {
    /// Spawns the client task and returns a handle to it.
    ///
    /// The task runs until every handle is dropped. Spawning does not
    /// connect; call [`RealtimeHandle::connect`].
    #[must_use]
    pub fn spawn(config: RealtimeConfig) -> RealtimeHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Idle);
        let router = Arc::new(MessageRouter::new(
            config.history_capacity,
            config.event_buffer,
        ));
        let subs = Arc::new(RwLock::new(SubscriptionSet::new()));

        let handle = RealtimeHandle {
            cmd_tx,
            status_rx,
            router: Arc::clone(&router),
            subs: Arc::clone(&subs),
        };

        tokio::spawn(Self::supervise(config, cmd_rx, status_tx, router, subs));
        handle
    }

    /// Supervisor loop: drives the idle/dial/backoff state machine.
    async fn supervise(
        config: RealtimeConfig,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        status_tx: watch::Sender<ConnectionStatus>,
        router: Arc<MessageRouter>,
        subs: Arc<RwLock<SubscriptionSet>>,
    ) {
        let mut attempt: u32 = 0;
        let mut phase = Phase::Idle;

        loop {
            match phase {
                Phase::Idle => {
                    status_tx.send_replace(ConnectionStatus::Idle);
                    let Some(command) = cmd_rx.recv().await else {
                        break;
                    };
                    match command {
                        Command::Connect => {
                            attempt = 0;
                            phase = Phase::Dial;
                        }
                        Command::Disconnect => {}
                        Command::Subscribe(channel) => {
                            if subs.write().request(&channel) {
                                debug!(channel = %channel, "subscription queued until connect");
                            }
                        }
                        Command::Unsubscribe(channel) => {
                            subs.write().remove(&channel);
                        }
                        Command::Send(_) => {
                            warn!("send while not connected, dropping payload");
                        }
                    }
                }

                Phase::Backoff(delay) => {
                    status_tx.send_replace(ConnectionStatus::Reconnecting);
                    info!(
                        delay_ms = delay.as_millis() as u64,
                        attempt = attempt + 1,
                        max_attempts = config.max_reconnect_attempts,
                        "waiting before reconnect"
                    );
                    let sleep = tokio::time::sleep(delay);
                    tokio::pin!(sleep);
                    phase = loop {
                        tokio::select! {
                            () = &mut sleep => {
                                attempt += 1;
                                break Phase::Dial;
                            }
                            command = cmd_rx.recv() => match command {
                                None => return,
                                Some(Command::Disconnect) => {
                                    info!("disconnect requested, cancelling reconnect");
                                    attempt = 0;
                                    break Phase::Idle;
                                }
                                Some(Command::Connect) => {
                                    debug!("connect requested, cancelling reconnect timer");
                                    break Phase::Dial;
                                }
                                Some(Command::Subscribe(channel)) => {
                                    subs.write().request(&channel);
                                }
                                Some(Command::Unsubscribe(channel)) => {
                                    subs.write().remove(&channel);
                                }
                                Some(Command::Send(_)) => {
                                    warn!("send while not connected, dropping payload");
                                }
                            }
                        }
                    };
                }

                Phase::Dial => {
                    status_tx.send_replace(ConnectionStatus::Connecting);
                    let url = config.connection_url();
                    let dialed =
                        tokio::time::timeout(config.connect_timeout(), connect_async(url.as_str()))
                            .await;
                    match dialed {
                        Ok(Ok((ws, _response))) => {
                            attempt = 0;
                            let disposition =
                                Self::run_connection(ws, &mut cmd_rx, &status_tx, &router, &subs)
                                    .await;
                            subs.write().reset_connection();
                            match disposition {
                                Disposition::Shutdown => {
                                    info!("disconnected");
                                    phase = Phase::Idle;
                                }
                                Disposition::Lost | Disposition::Errored => {
                                    if disposition == Disposition::Errored {
                                        status_tx.send_replace(ConnectionStatus::Error);
                                    }
                                    phase = Self::after_loss(&config, attempt);
                                }
                            }
                        }
                        Ok(Err(e)) => {
                            warn!(error = %e, attempt, "connection failed");
                            status_tx.send_replace(ConnectionStatus::Error);
                            phase = Self::after_loss(&config, attempt);
                        }
                        Err(_) => {
                            warn!(
                                timeout_ms = config.connect_timeout_ms,
                                attempt, "connection attempt timed out"
                            );
                            status_tx.send_replace(ConnectionStatus::Error);
                            phase = Self::after_loss(&config, attempt);
                        }
                    }
                }
            }
        }
        debug!("all handles dropped, client task stopping");
    }

    /// Decides the next phase after an abnormal loss or dial failure.
    fn after_loss(config: &RealtimeConfig, attempt: u32) -> Phase {
        if config.should_reconnect(attempt) {
            Phase::Backoff(config.reconnect_delay_for(attempt))
        } else {
            if config.reconnect_enabled {
                warn!(
                    max_attempts = config.max_reconnect_attempts,
                    "reconnect attempts exhausted, going idle"
                );
            }
            Phase::Idle
        }
    }

    /// Drives one live connection until it ends.
    ///
    /// Replays desired subscriptions before publishing `Connected`, so no
    /// consumer ever observes a live status on a channel the new transport
    /// has not been asked to subscribe.
    async fn run_connection(
        ws: WsStream,
        cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
        status_tx: &watch::Sender<ConnectionStatus>,
        router: &MessageRouter,
        subs: &RwLock<SubscriptionSet>,
    ) -> Disposition {
        let codec = FrameCodec::new();
        let (mut sink, mut source) = ws.split();

        let replay = subs.write().begin_replay();
        for channel in &replay {
            if let Err(disposition) =
                Self::send_frame(&mut sink, &codec, &Frame::subscribe(channel.as_str())).await
            {
                subs.write().reset_connection();
                return disposition;
            }
        }
        if !replay.is_empty() {
            info!(channels = replay.len(), "subscriptions replayed");
        }

        status_tx.send_replace(ConnectionStatus::Connected);
        info!("connected");

        loop {
            tokio::select! {
                command = cmd_rx.recv() => match command {
                    None => {
                        let _ = sink.close().await;
                        return Disposition::Shutdown;
                    }
                    Some(Command::Disconnect) => {
                        let close = Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "client disconnect".into(),
                        }));
                        if let Err(e) = sink.send(close).await {
                            debug!(error = %e, "close frame not delivered");
                        }
                        let _ = sink.close().await;
                        return Disposition::Shutdown;
                    }
                    Some(Command::Connect) => {
                        debug!("connect while connected, ignoring");
                    }
                    Some(Command::Subscribe(channel)) => {
                        let send_needed = {
                            let mut guard = subs.write();
                            guard.request(&channel);
                            if guard.needs_subscribe(&channel) {
                                guard.mark_pending(&channel);
                                true
                            } else {
                                false
                            }
                        };
                        if send_needed {
                            if let Err(disposition) =
                                Self::send_frame(&mut sink, &codec, &Frame::subscribe(channel.as_str())).await
                            {
                                return disposition;
                            }
                            debug!(channel = %channel, "subscribe sent");
                        }
                    }
                    Some(Command::Unsubscribe(channel)) => {
                        let was_desired = subs.write().remove(&channel);
                        if was_desired {
                            // Best-effort: the channel is already logically
                            // removed, a lost unsubscribe frame is harmless.
                            let frame = Frame::unsubscribe(channel.as_str());
                            match codec.encode(&frame) {
                                Ok(text) => {
                                    if let Err(e) = sink.send(Message::Text(text)).await {
                                        warn!(channel = %channel, error = %e, "unsubscribe frame not delivered");
                                    }
                                }
                                Err(e) => warn!(error = %e, "unsubscribe frame not encodable"),
                            }
                        }
                    }
                    Some(Command::Send(payload)) => {
                        match serde_json::to_string(&payload) {
                            Ok(text) => {
                                if let Err(e) = sink.send(Message::Text(text)).await {
                                    error!(error = %e, "send failed");
                                }
                            }
                            Err(e) => error!(error = %e, "payload not serializable"),
                        }
                    }
                },

                message = source.next() => match message {
                    None => {
                        warn!("transport stream ended");
                        return Disposition::Lost;
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "socket error");
                        return Disposition::Errored;
                    }
                    Some(Ok(Message::Text(text))) => match codec.decode(&text) {
                        Ok(frame) => router.route(frame, &mut subs.write()),
                        Err(e) => warn!(error = %e, "malformed frame dropped"),
                    },
                    Some(Ok(Message::Binary(bytes))) => match codec.decode_slice(&bytes) {
                        Ok(frame) => router.route(frame, &mut subs.write()),
                        Err(e) => warn!(error = %e, "malformed binary frame dropped"),
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sink.send(Message::Pong(data)).await {
                            warn!(error = %e, "pong not delivered");
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(close_frame))) => {
                        let code = close_frame
                            .as_ref()
                            .map_or(1005, |f| u16::from(f.code));
                        if code == CLOSE_NORMAL {
                            info!("server closed connection normally");
                            return Disposition::Shutdown;
                        }
                        warn!(code, "server closed connection abnormally");
                        return Disposition::Lost;
                    }
                    Some(Ok(Message::Frame(_))) => {}
                },
            }
        }
    }

    /// Encodes and sends one frame; a transport failure ends the
    /// connection.
    async fn send_frame(
        sink: &mut WsSink,
        codec: &FrameCodec,
        frame: &Frame,
    ) -> Result<(), Disposition> {
        let text = match codec.encode(frame) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "frame not encodable");
                return Ok(());
            }
        };
        sink.send(Message::Text(text)).await.map_err(|e| {
            error!(error = %e, "frame not delivered");
            Disposition::Errored
        })
    }
}
