//! Shard implementation for the Discord Gateway connection.
//!
//! A Shard owns a single WebSocket connection: the identify/resume
//! handshake, the heartbeat loop, sequence tracking, and recovery from
//! close codes. Large bots run many shards, each serving a deterministic
//! subset of guilds.

use crate::error::{CloseCode, GatewayError, ReconnectAction};
use crate::event::{parse_event, Event};
use crate::heartbeat::{HeartbeatHandler, MAX_MISSED_ACKS};
use crate::opcode::OpCode;
use crate::payload::{
    heartbeat_payload, GatewayPayload, Hello, Identify, RawGatewayPayload, Ready, Resume,
};
use crate::ratelimit::{exponential_backoff, with_jitter, CommandRatelimiter, IdentifyRateLimiter};
use crate::DEFAULT_GATEWAY_URL;

use cobalt_model::{ApiVersion, Intents};
use flume::Sender;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, sleep_until, timeout, Instant};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// How long to wait for the server's Hello after the socket opens.
const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

/// Close code sent when abandoning a zombied connection. Non-1000 codes
/// keep the session resumable.
const ZOMBIE_CLOSE_CODE: u16 = 4000;

/// Command sent to the shard's event loop from the outside.
#[derive(Debug)]
enum ShardCommand {
    /// Send a raw JSON frame, subject to the command budget.
    Send(String),
    /// Close with code 1000 and stop for good.
    Disconnect,
}

/// Internal action to take after parsing a frame.
#[derive(Debug)]
enum FrameAction {
    Dispatch(Event),
    Heartbeat,
    Reconnect,
    InvalidSession(bool),
    None,
}

/// Type alias for the WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;

/// Shard connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardState {
    /// Not running.
    Disconnected,
    /// Opening the socket, waiting for Hello.
    Connecting,
    /// Identify sent, waiting for Ready.
    Identifying,
    /// Resume sent, waiting for replay + Resumed.
    Resuming,
    /// Fully connected and receiving events.
    Ready,
    /// Backing off before the next connection attempt.
    Reconnecting,
    /// Unrecoverable; will never reconnect.
    Dead,
}

/// Configuration for a shard.
#[derive(Debug, Clone)]
pub struct ShardConfig {
    /// Bot token.
    pub token: String,

    /// Gateway intents.
    pub intents: Intents,

    /// Gateway URL (usually from /gateway/bot).
    pub gateway_url: String,

    /// API version spoken on the socket.
    pub api_version: ApiVersion,

    /// Large guild threshold (50-250).
    pub large_threshold: u8,

    /// Maximum reconnection attempts before giving up.
    pub max_reconnect_attempts: u32,

    /// Base reconnect delay in milliseconds.
    pub reconnect_base_delay_ms: u64,

    /// Maximum reconnect delay in milliseconds.
    pub reconnect_max_delay_ms: u64,
}

impl ShardConfig {
    /// Create a new shard configuration with required fields.
    pub fn new(token: impl Into<String>, intents: Intents) -> Self {
        Self {
            token: token.into(),
            intents,
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            api_version: ApiVersion::default(),
            large_threshold: 250,
            max_reconnect_attempts: 10,
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 60000,
        }
    }

    /// Set a custom gateway URL.
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    /// Select the gateway API version.
    pub fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    /// Set the large guild threshold.
    pub fn with_large_threshold(mut self, threshold: u8) -> Self {
        self.large_threshold = threshold;
        self
    }
}

/// Session data kept for resuming.
#[derive(Debug, Clone)]
struct Session {
    /// Session ID from the Ready event.
    session_id: String,
    /// Resume URL from the Ready event (absent under v6).
    resume_url: Option<String>,
}

/// A Discord Gateway shard.
///
/// Handles the WebSocket connection, heartbeating, event dispatch, and
/// automatic reconnection with resume-vs-reidentify policy.
pub struct Shard {
    /// This shard's ID.
    id: u16,

    /// Total number of shards.
    total: u16,

    /// Shard configuration.
    config: ShardConfig,

    /// Identify gate, shared across the fleet.
    identify_gate: Arc<IdentifyRateLimiter>,

    /// Current connection state.
    state: RwLock<ShardState>,

    /// Session data for resuming.
    session: RwLock<Option<Session>>,

    /// Last dispatch sequence number. 0 = none received yet.
    sequence: AtomicU64,

    /// Heartbeat bookkeeping.
    heartbeat: HeartbeatHandler,

    /// Whether shutdown has been requested.
    shutdown: AtomicBool,

    /// Channel for sending commands into the shard loop.
    command_tx: Sender<ShardCommand>,
    command_rx: flume::Receiver<ShardCommand>,
}

impl Shard {
    /// Create a new shard with its own identify gate.
    pub fn new(id: u16, total: u16, config: ShardConfig) -> Self {
        Self::with_identify_gate(id, total, config, Arc::new(IdentifyRateLimiter::default()))
    }

    /// Create a new shard sharing a fleet-wide identify gate.
    pub fn with_identify_gate(
        id: u16,
        total: u16,
        config: ShardConfig,
        identify_gate: Arc<IdentifyRateLimiter>,
    ) -> Self {
        let (tx, rx) = flume::unbounded();

        Self {
            id,
            total,
            config,
            identify_gate,
            state: RwLock::new(ShardState::Disconnected),
            session: RwLock::new(None),
            sequence: AtomicU64::new(0),
            heartbeat: HeartbeatHandler::default(),
            shutdown: AtomicBool::new(false),
            command_tx: tx,
            command_rx: rx,
        }
    }

    /// This shard's ID.
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Total number of shards in the fleet.
    pub fn total(&self) -> u16 {
        self.total
    }

    /// Current connection state.
    pub fn state(&self) -> ShardState {
        *self.state.read()
    }

    /// Last dispatch sequence number, or `None` before the first dispatch.
    pub fn sequence(&self) -> Option<u64> {
        match self.sequence.load(Ordering::SeqCst) {
            0 => None,
            seq => Some(seq),
        }
    }

    /// Current session ID, while a session is held.
    pub fn session_id(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.session_id.clone())
    }

    /// Last measured heartbeat round-trip time.
    pub fn latency(&self) -> Option<Duration> {
        self.heartbeat.latency()
    }

    /// Request a graceful shutdown: close frame 1000, then the task ends.
    pub fn disconnect(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.command_tx.send(ShardCommand::Disconnect);
    }

    /// Request an abrupt stop. No close frame is sent; the owner is
    /// expected to abort the task if it does not wind down promptly.
    pub fn kill(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Queue a payload for sending over this shard's socket.
    ///
    /// The frame passes through the 120-commands-per-minute budget before
    /// going on the wire.
    pub fn send<T: serde::Serialize>(&self, payload: &T) -> Result<(), GatewayError> {
        let json = serde_json::to_string(payload)
            .map_err(|e| GatewayError::Protocol(format!("serialization error: {e}")))?;
        self.command_tx
            .send(ShardCommand::Send(json))
            .map_err(|_| GatewayError::ShardUnavailable(self.id))
    }

    /// Run the shard event loop.
    ///
    /// Connects, handles events, and reconnects according to the close-code
    /// policy. Parsed events are pushed into `event_tx` in receive order.
    ///
    /// Returns `Ok(())` on graceful shutdown, or the terminal error.
    pub async fn run(&self, event_tx: Sender<Event>) -> Result<(), GatewayError> {
        let mut reconnect_attempts = 0u32;

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                info!(shard_id = self.id, "shard shutdown requested");
                *self.state.write() = ShardState::Disconnected;
                return Ok(());
            }

            match self.connect_and_run(&event_tx).await {
                Ok(()) => {
                    // Graceful disconnect
                    return Ok(());
                }
                Err(GatewayError::HeartbeatTimeout) => {
                    warn!(shard_id = self.id, "heartbeat timeout, will resume");
                    reconnect_attempts += 1;
                }
                Err(GatewayError::InvalidSession { resumable }) => {
                    warn!(
                        shard_id = self.id,
                        resumable, "session invalidated by server"
                    );
                    if !resumable {
                        self.clear_session();
                        // The server wants a short pause before the fresh identify.
                        let delay = Duration::from_millis(rand_delay_ms(1000, 5000));
                        sleep(delay).await;
                    }
                    reconnect_attempts += 1;
                }
                Err(GatewayError::Closed { code, reason }) => {
                    match CloseCode::action(code) {
                        ReconnectAction::Fatal => {
                            let code = code.unwrap_or_default();
                            error!(
                                shard_id = self.id,
                                code,
                                reason = %reason,
                                "fatal close code, shard is dead"
                            );
                            *self.state.write() = ShardState::Dead;
                            return Err(match code {
                                4004 => GatewayError::AuthenticationFailed,
                                4010 | 4011 => GatewayError::InvalidShardConfig(reason),
                                _ => GatewayError::FatalClose { code, reason },
                            });
                        }
                        ReconnectAction::Reidentify => {
                            warn!(
                                shard_id = self.id,
                                code = ?code,
                                reason = %reason,
                                "close requires a fresh session"
                            );
                            self.clear_session();
                        }
                        ReconnectAction::Resume => {
                            warn!(
                                shard_id = self.id,
                                code = ?code,
                                reason = %reason,
                                "connection closed, will resume"
                            );
                        }
                    }
                    reconnect_attempts += 1;
                }
                Err(GatewayError::Protocol(msg)) => {
                    // A stream we cannot decode is not trustworthy for
                    // replay; drop the session.
                    warn!(shard_id = self.id, error = %msg, "protocol error, re-identifying");
                    self.clear_session();
                    reconnect_attempts += 1;
                }
                Err(e) => {
                    error!(shard_id = self.id, error = %e, "shard connection error");
                    reconnect_attempts += 1;
                }
            }

            if reconnect_attempts > self.config.max_reconnect_attempts {
                error!(
                    shard_id = self.id,
                    attempts = reconnect_attempts,
                    "max reconnect attempts exceeded"
                );
                *self.state.write() = ShardState::Dead;
                return Err(GatewayError::Closed {
                    code: None,
                    reason: "max reconnect attempts exceeded".to_string(),
                });
            }

            let backoff = with_jitter(
                exponential_backoff(
                    reconnect_attempts.saturating_sub(1),
                    self.config.reconnect_base_delay_ms,
                    self.config.reconnect_max_delay_ms,
                ),
                0.25,
            );

            info!(
                shard_id = self.id,
                attempt = reconnect_attempts,
                backoff_ms = backoff.as_millis(),
                "waiting before reconnect"
            );

            *self.state.write() = ShardState::Reconnecting;
            sleep(backoff).await;
        }
    }

    /// Connect and run the event loop once.
    async fn connect_and_run(&self, event_tx: &Sender<Event>) -> Result<(), GatewayError> {
        let gateway_url = self.gateway_url()?;

        info!(shard_id = self.id, url = %gateway_url, "connecting to gateway");
        *self.state.write() = ShardState::Connecting;

        let (ws_stream, _response) = connect_async(gateway_url.as_str()).await?;
        let (mut sink, mut stream) = ws_stream.split();

        let hello = self.wait_for_hello(&mut stream).await?;
        let interval = Duration::from_millis(hello.heartbeat_interval);
        self.heartbeat.set_interval(interval);
        self.heartbeat.reset();

        debug!(
            shard_id = self.id,
            interval_ms = hello.heartbeat_interval,
            "received Hello"
        );

        // Non-heartbeat sends share this connection's command budget.
        let commands = CommandRatelimiter::new();

        let session = self.session.read().clone();
        if let Some(ref session_data) = session {
            *self.state.write() = ShardState::Resuming;
            info!(
                shard_id = self.id,
                session_id = %session_data.session_id,
                seq = ?self.sequence(),
                "resuming session"
            );
            self.send_resume(&mut sink, session_data).await?;
        } else {
            self.identify_gate.acquire().await?;
            *self.state.write() = ShardState::Identifying;
            info!(shard_id = self.id, "sending identify");
            self.send_identify(&mut sink).await?;
        }

        // The first heartbeat is offset by rand() * interval so a fleet
        // reconnecting together does not beat in lockstep.
        let mut next_heartbeat = Instant::now() + jittered_first_beat(interval);

        loop {
            tokio::select! {
                message = stream.next() => {
                    match message {
                        Some(Ok(msg)) => {
                            self.handle_message(msg, event_tx, &mut sink).await?;
                        }
                        Some(Err(e)) => {
                            return Err(GatewayError::WebSocket(e));
                        }
                        None => {
                            return Err(GatewayError::Closed {
                                code: None,
                                reason: "websocket stream ended".to_string(),
                            });
                        }
                    }
                }

                _ = sleep_until(next_heartbeat) => {
                    if !self.heartbeat.is_acked() {
                        let missed = self.heartbeat.record_miss();
                        if missed >= MAX_MISSED_ACKS {
                            error!(
                                shard_id = self.id,
                                missed,
                                "no heartbeat ACK, assuming zombie connection"
                            );
                            let _ = sink
                                .send(WsMessage::Close(Some(CloseFrame {
                                    code: WsCloseCode::from(ZOMBIE_CLOSE_CODE),
                                    reason: "heartbeat ack timeout".into(),
                                })))
                                .await;
                            return Err(GatewayError::HeartbeatTimeout);
                        }
                        warn!(shard_id = self.id, missed, "heartbeat not yet acked");
                    }

                    self.send_heartbeat(&mut sink).await?;
                    self.heartbeat.mark_sent();
                    next_heartbeat = Instant::now() + self.heartbeat.interval();
                }

                command = self.command_rx.recv_async() => {
                    match command {
                        Ok(ShardCommand::Send(json)) => {
                            commands.acquire().await;
                            trace!(shard_id = self.id, "sending queued command");
                            sink.send(WsMessage::Text(json.into())).await?;
                        }
                        Ok(ShardCommand::Disconnect) => {
                            info!(shard_id = self.id, "graceful disconnect");
                            let _ = sink
                                .send(WsMessage::Close(Some(CloseFrame {
                                    code: WsCloseCode::Normal,
                                    reason: "".into(),
                                })))
                                .await;
                            *self.state.write() = ShardState::Disconnected;
                            return Ok(());
                        }
                        Err(_) => {
                            return Err(GatewayError::ChannelSend(
                                "shard command channel closed".to_string(),
                            ));
                        }
                    }
                }
            }
        }
    }

    /// Build the gateway URL with query parameters.
    fn gateway_url(&self) -> Result<Url, GatewayError> {
        // Prefer the resume URL while a session is held.
        let base_url = self
            .session
            .read()
            .as_ref()
            .and_then(|s| s.resume_url.clone())
            .unwrap_or_else(|| self.config.gateway_url.clone());

        let mut url = Url::parse(&base_url)?;
        url.query_pairs_mut()
            .append_pair("v", &self.config.api_version.number().to_string())
            .append_pair("encoding", "json");

        Ok(url)
    }

    /// Wait for the Hello payload after connecting.
    async fn wait_for_hello(
        &self,
        stream: &mut SplitStream<WsStream>,
    ) -> Result<Hello, GatewayError> {
        let message = timeout(HELLO_TIMEOUT, stream.next())
            .await
            .map_err(|_| GatewayError::Closed {
                code: None,
                reason: "timeout waiting for Hello".to_string(),
            })?
            .ok_or_else(|| GatewayError::Closed {
                code: None,
                reason: "connection closed before Hello".to_string(),
            })??;

        if let WsMessage::Text(text) = message {
            let payload: RawGatewayPayload<'_> = serde_json::from_str(text.as_str())?;

            if payload.op == OpCode::Hello {
                if let Some(data) = payload.d {
                    let hello: Hello = serde_json::from_str(data.get())?;
                    return Ok(hello);
                }
            }
        }

        Err(GatewayError::Protocol(
            "expected Hello as first payload".to_string(),
        ))
    }

    /// Send an Identify payload.
    async fn send_identify(&self, sink: &mut WsSink) -> Result<(), GatewayError> {
        let identify = Identify::new(self.config.token.as_str(), self.config.intents)
            .with_shard(self.id, self.total)
            .with_large_threshold(self.config.large_threshold);

        let json = GatewayPayload::new(OpCode::Identify, identify).to_json()?;

        trace!(shard_id = self.id, "sending Identify payload");
        sink.send(WsMessage::Text(json.into())).await?;

        Ok(())
    }

    /// Send a Resume payload.
    async fn send_resume(&self, sink: &mut WsSink, session: &Session) -> Result<(), GatewayError> {
        let resume = Resume {
            token: self.config.token.as_str().into(),
            session_id: session.session_id.as_str().into(),
            seq: self.sequence.load(Ordering::SeqCst),
        };

        let json = GatewayPayload::new(OpCode::Resume, resume).to_json()?;

        trace!(shard_id = self.id, "sending Resume payload");
        sink.send(WsMessage::Text(json.into())).await?;

        Ok(())
    }

    /// Send a Heartbeat payload. Heartbeats bypass the command budget.
    async fn send_heartbeat(&self, sink: &mut WsSink) -> Result<(), GatewayError> {
        let json = heartbeat_payload(self.sequence());

        trace!(shard_id = self.id, seq = ?self.sequence(), "sending Heartbeat");
        sink.send(WsMessage::Text(json.into())).await?;

        Ok(())
    }

    /// Handle a received WebSocket message.
    async fn handle_message(
        &self,
        message: WsMessage,
        event_tx: &Sender<Event>,
        sink: &mut WsSink,
    ) -> Result<(), GatewayError> {
        let action = match message {
            WsMessage::Text(text) => self.process_frame(text.as_str())?,
            WsMessage::Binary(_) => {
                // Compression is never requested; a binary frame means the
                // stream is not in a state we can decode.
                return Err(GatewayError::Protocol(
                    "unexpected binary frame".to_string(),
                ));
            }
            WsMessage::Close(frame) => {
                let (code, reason) = frame
                    .map(|f: CloseFrame| (Some(f.code.into()), f.reason.to_string()))
                    .unwrap_or((None, String::new()));

                return Err(GatewayError::Closed { code, reason });
            }
            WsMessage::Ping(data) => {
                sink.send(WsMessage::Pong(data)).await?;
                return Ok(());
            }
            WsMessage::Pong(_) => return Ok(()),
            WsMessage::Frame(_) => return Ok(()),
        };

        match action {
            FrameAction::Dispatch(event) => {
                event_tx.send_async(event).await?;
            }
            FrameAction::Heartbeat => {
                debug!(shard_id = self.id, "server requested heartbeat");
                self.send_heartbeat(sink).await?;
            }
            FrameAction::Reconnect => {
                info!(shard_id = self.id, "server requested reconnect");
                return Err(GatewayError::Closed {
                    code: None,
                    reason: "server requested reconnect".to_string(),
                });
            }
            FrameAction::InvalidSession(resumable) => {
                return Err(GatewayError::InvalidSession { resumable });
            }
            FrameAction::None => {}
        }

        Ok(())
    }

    /// Process a text frame and determine the action.
    ///
    /// Synchronous; holds no locks across awaits.
    fn process_frame(&self, text: &str) -> Result<FrameAction, GatewayError> {
        let payload: RawGatewayPayload<'_> = serde_json::from_str(text)?;

        match payload.op {
            OpCode::Dispatch => {
                // Only dispatches advance the sequence; it never goes
                // backwards while a session lives.
                if let Some(seq) = payload.s {
                    self.sequence.fetch_max(seq, Ordering::SeqCst);
                }

                let (Some(name), Some(data)) = (payload.t, payload.d) else {
                    return Err(GatewayError::Protocol(
                        "dispatch frame missing t or d".to_string(),
                    ));
                };

                let event = parse_event(name, data)?;

                match &event {
                    Event::Ready(ready) => self.handle_ready(ready),
                    Event::Resumed => {
                        *self.state.write() = ShardState::Ready;
                        info!(
                            shard_id = self.id,
                            seq = ?self.sequence(),
                            "session resumed"
                        );
                    }
                    _ => {}
                }

                Ok(FrameAction::Dispatch(event))
            }

            OpCode::Heartbeat => Ok(FrameAction::Heartbeat),
            OpCode::Reconnect => Ok(FrameAction::Reconnect),

            OpCode::InvalidSession => {
                let resumable = payload
                    .d
                    .map(|d| d.get().trim() == "true")
                    .unwrap_or(false);
                Ok(FrameAction::InvalidSession(resumable))
            }

            OpCode::HeartbeatAck => {
                self.heartbeat.mark_acked();
                trace!(
                    shard_id = self.id,
                    rtt_ms = self.heartbeat.latency().unwrap_or_default().as_millis(),
                    "heartbeat ACK received"
                );
                Ok(FrameAction::None)
            }

            other => {
                trace!(shard_id = self.id, opcode = ?other, "ignoring opcode");
                Ok(FrameAction::None)
            }
        }
    }

    /// Capture session data from the Ready event.
    fn handle_ready(&self, ready: &Ready) {
        *self.session.write() = Some(Session {
            session_id: ready.session_id.clone(),
            resume_url: ready.resume_gateway_url.clone(),
        });
        *self.state.write() = ShardState::Ready;

        info!(
            shard_id = self.id,
            session_id = %ready.session_id,
            guilds = ready.guilds.len(),
            "shard ready"
        );
    }

    fn clear_session(&self) {
        *self.session.write() = None;
        self.sequence.store(0, Ordering::SeqCst);
    }
}

fn jittered_first_beat(interval: Duration) -> Duration {
    use rand::Rng;
    interval.mul_f64(rand::rng().random::<f64>())
}

fn rand_delay_ms(min: u64, max: u64) -> u64 {
    use rand::Rng;
    rand::rng().random_range(min..=max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_shard() -> Shard {
        let config = ShardConfig::new("test_token", Intents::default());
        Shard::new(0, 1, config)
    }

    #[test]
    fn shard_creation() {
        let shard = test_shard();
        assert_eq!(shard.id(), 0);
        assert_eq!(shard.total(), 1);
        assert_eq!(shard.state(), ShardState::Disconnected);
        assert_eq!(shard.sequence(), None);
    }

    #[test]
    fn gateway_url_building() {
        let shard = test_shard();
        let url = shard.gateway_url().expect("failed to build URL");
        assert!(url.as_str().contains("v=10"));
        assert!(url.as_str().contains("encoding=json"));
    }

    #[test]
    fn gateway_url_legacy_version() {
        let config =
            ShardConfig::new("test_token", Intents::default()).with_api_version(ApiVersion::V6);
        let shard = Shard::new(0, 1, config);
        let url = shard.gateway_url().unwrap();
        assert!(url.as_str().contains("v=6"));
    }

    #[test]
    fn dispatch_tracks_max_sequence() {
        let shard = test_shard();

        for (seq, content) in [(1u64, "a"), (2, "b"), (3, "c")] {
            let frame = format!(
                r#"{{"op":0,"t":"MESSAGE_CREATE","s":{seq},"d":{{"id":"1","channel_id":"2","content":"{content}"}}}}"#
            );
            let action = shard.process_frame(&frame).unwrap();
            assert!(matches!(action, FrameAction::Dispatch(_)));
        }
        assert_eq!(shard.sequence(), Some(3));

        // A replayed lower sequence must not move the counter backwards.
        let stale = r#"{"op":0,"t":"MESSAGE_CREATE","s":2,"d":{"id":"1","channel_id":"2"}}"#;
        shard.process_frame(stale).unwrap();
        assert_eq!(shard.sequence(), Some(3));
    }

    #[test]
    fn ready_captures_session() {
        let shard = test_shard();
        let frame = r#"{"op":0,"t":"READY","s":1,"d":{"v":10,"user":{"id":"10","username":"bot"},"guilds":[{"id":"20","unavailable":true}],"session_id":"s1","resume_gateway_url":"wss://resume.example"}}"#;

        shard.process_frame(frame).unwrap();

        assert_eq!(shard.state(), ShardState::Ready);
        assert_eq!(shard.session_id().as_deref(), Some("s1"));
        assert_eq!(shard.sequence(), Some(1));
    }

    #[test]
    fn invalid_session_frame() {
        let shard = test_shard();

        let resumable = shard.process_frame(r#"{"op":9,"d":true}"#).unwrap();
        assert!(matches!(resumable, FrameAction::InvalidSession(true)));

        let not_resumable = shard.process_frame(r#"{"op":9,"d":false}"#).unwrap();
        assert!(matches!(not_resumable, FrameAction::InvalidSession(false)));
    }

    #[test]
    fn heartbeat_ack_frame() {
        let shard = test_shard();
        shard.heartbeat.mark_sent();
        assert!(!shard.heartbeat.is_acked());

        shard.process_frame(r#"{"op":11,"d":null}"#).unwrap();
        assert!(shard.heartbeat.is_acked());
    }

    #[test]
    fn garbage_frame_is_protocol_error() {
        let shard = test_shard();
        let err = shard.process_frame("not json").unwrap_err();
        assert!(matches!(err, GatewayError::Protocol(_)));
    }
}
