//! WebSocket Game Server
//!
//! Async WebSocket server. Each connection gets a reader loop and a
//! writer task joined by an mpsc channel; every client message produces
//! exactly one server message. A background loop evicts idle sessions.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit, RwLock, Semaphore};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::game::view::SessionView;
use crate::network::protocol::{
    ClientMessage, ErrorCode, GameStartedInfo, HealthInfo, ServerMessage, StartProvenance,
};
use crate::network::session::{SessionError, SessionManager};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Sessions idle longer than this are evicted.
    pub session_ttl: Duration,
    /// How often the eviction loop runs.
    pub cleanup_interval: Duration,
    /// Expose trap flags in views.
    pub dev_mode: bool,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            session_ttl: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(60),
            dev_mode: false,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Variable present but unparseable.
    #[error("invalid value for {var}: {value:?}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
}

impl ServerConfig {
    /// Load from `CAVE_*` environment variables, defaulting unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            bind_addr: parse_var(&lookup, "CAVE_BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            max_connections: parse_var(&lookup, "CAVE_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            session_ttl: parse_var(&lookup, "CAVE_SESSION_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
            cleanup_interval: parse_var(&lookup, "CAVE_CLEANUP_INTERVAL_SECS")?
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
            dev_mode: match lookup("CAVE_DEV_MODE") {
                None => defaults.dev_mode,
                Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                    var: "CAVE_DEV_MODE",
                    value,
                })?,
            },
            version: defaults.version,
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

// =============================================================================
// SERVER
// =============================================================================

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Session error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Connected client state.
struct ConnectedClient {
    /// Connection time.
    connected_at: Instant,
    /// Messages handled on this connection.
    messages: u64,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Session manager.
    sessions: Arc<SessionManager>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// One permit per open connection, taken at accept.
    connection_slots: Arc<Semaphore>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a server with an in-memory session store.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_manager(config, Arc::new(SessionManager::default()))
    }

    /// Create a server over an existing session manager.
    pub fn with_manager(config: ServerConfig, sessions: Arc<SessionManager>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let connection_slots = Arc::new(Semaphore::new(
            config.max_connections.min(Semaphore::MAX_PERMITS),
        ));

        Self {
            config,
            sessions,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            connection_slots,
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Game server listening on {}", listener.local_addr()?);

        let cleanup_sessions = self.sessions.clone();
        let cleanup_config = self.config.clone();
        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(cleanup_sessions, cleanup_config).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let Ok(permit) = self.connection_slots.clone().try_acquire_owned() else {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            };

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr, permit);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();

        Ok(())
    }

    /// Handle a new WebSocket connection. The permit is held until it closes.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr, permit: OwnedSemaphorePermit) {
        let clients = self.clients.clone();
        let sessions = self.sessions.clone();
        let config = self.config.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let _permit = permit;
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            clients.write().await.insert(
                addr,
                ConnectedClient {
                    connected_at: Instant::now(),
                    messages: 0,
                },
            );

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let reply = match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => {
                                        Self::handle_client_message(client_msg, &sessions, &config).await
                                    }
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        ServerMessage::error(
                                            ErrorCode::InvalidMessage,
                                            format!("Invalid message format: {e}"),
                                        )
                                    }
                                };

                                if let Some(client) = clients.write().await.get_mut(&addr) {
                                    client.messages += 1;
                                }

                                if msg_tx.send(reply).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let queued replies flush before the writer exits
            drop(msg_tx);
            let _ = sender_task.await;

            if let Some(client) = clients.write().await.remove(&addr) {
                info!(
                    "Client {} cleaned up after {} messages in {:?}",
                    addr,
                    client.messages,
                    client.connected_at.elapsed()
                );
            }
        });
    }

    /// Dispatch one client message to the session manager.
    pub async fn handle_client_message(
        msg: ClientMessage,
        sessions: &SessionManager,
        config: &ServerConfig,
    ) -> ServerMessage {
        match msg {
            ClientMessage::StartGame(req) => {
                let welcome = format!(
                    "Welcome {}! Game created with provable fairness.",
                    req.player_name
                );
                match sessions.start_session(req.player_name, req.client_value).await {
                    Ok(start) => ServerMessage::GameStarted(GameStartedInfo {
                        state: SessionView::build(&start.session, welcome, config.dev_mode),
                        provenance: StartProvenance {
                            commitment_hash: start.commitment_hash,
                            client_value_used: start.client_value_used,
                            session_id: start.session.session_id,
                        },
                    }),
                    Err(e) => session_error(e),
                }
            }
            ClientMessage::TakeTurn(req) => {
                match sessions.take_turn(&req.session_id, req.slot_id, req.insurance).await {
                    Ok(resolution) => ServerMessage::GameState(SessionView::build(
                        &resolution.session,
                        resolution.final_outcome,
                        config.dev_mode,
                    )),
                    Err(e) => session_error(e),
                }
            }
            ClientMessage::GetState { session_id } => match sessions.get_session(&session_id).await {
                Ok(session) => ServerMessage::GameState(SessionView::build(
                    &session,
                    "Current game state",
                    config.dev_mode,
                )),
                Err(e) => session_error(e),
            },
            ClientMessage::Reveal { session_id } => match sessions.reveal(&session_id).await {
                Ok(reveal) => ServerMessage::Reveal(reveal),
                Err(e) => session_error(e),
            },
            ClientMessage::Verify(req) => match sessions.verify(&req) {
                Ok(report) => ServerMessage::Verification(report),
                Err(e) => session_error(e),
            },
            ClientMessage::EndSession { session_id } => {
                if sessions.end_session(&session_id).await {
                    ServerMessage::SessionEnded { session_id }
                } else {
                    session_error(SessionError::SessionNotFound(session_id))
                }
            }
            ClientMessage::Health => ServerMessage::Health(HealthInfo {
                status: "healthy".to_string(),
                active_sessions: sessions.session_count(),
                dev_mode: config.dev_mode,
                provably_fair: true,
                version: config.version.clone(),
            }),
            ClientMessage::Ping { timestamp } => ServerMessage::Pong {
                client_timestamp: timestamp,
                server_time: Utc::now().timestamp_millis(),
            },
        }
    }

    /// Run cleanup loop.
    async fn run_cleanup_loop(sessions: Arc<SessionManager>, config: ServerConfig) {
        let ttl = chrono::Duration::from_std(config.session_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        let mut interval = interval(config.cleanup_interval);

        loop {
            interval.tick().await;
            let removed = sessions.evict_idle(ttl).await;
            if removed > 0 {
                debug!("Cleanup pass removed {} sessions", removed);
            }
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Get active session count.
    pub fn session_count(&self) -> usize {
        self.sessions.session_count()
    }
}

fn session_error(e: SessionError) -> ServerMessage {
    ServerMessage::error(e.code(), e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::SessionStatus;
    use crate::network::protocol::{StartGameRequest, TakeTurnRequest};
    use crate::proof::commitment::{canonicalize, ProvenanceRecord};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    async fn start(sessions: &SessionManager, config: &ServerConfig) -> GameStartedInfo {
        let reply = GameServer::handle_client_message(
            ClientMessage::StartGame(StartGameRequest {
                player_name: "ada".into(),
                client_value: None,
            }),
            sessions,
            config,
        )
        .await;
        match reply {
            ServerMessage::GameStarted(info) => info,
            other => panic!("Wrong message type: {other:?}"),
        }
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert!(!config.dev_mode);
    }

    #[test]
    fn test_config_from_lookup() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("CAVE_BIND_ADDR", "127.0.0.1:9000"),
            ("CAVE_MAX_CONNECTIONS", "12"),
            ("CAVE_SESSION_TTL_SECS", "90"),
            ("CAVE_CLEANUP_INTERVAL_SECS", "5"),
            ("CAVE_DEV_MODE", "true"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.session_ttl, Duration::from_secs(90));
        assert_eq!(config.cleanup_interval, Duration::from_secs(5));
        assert!(config.dev_mode);
    }

    #[test]
    fn test_config_unset_uses_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_config_invalid_values() {
        let err = ServerConfig::from_lookup(lookup(&[("CAVE_MAX_CONNECTIONS", "lots")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "CAVE_MAX_CONNECTIONS",
                value: "lots".into()
            }
        );

        assert!(ServerConfig::from_lookup(lookup(&[("CAVE_DEV_MODE", "maybe")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("CAVE_BIND_ADDR", "nowhere")])).is_err());
    }

    #[tokio::test]
    async fn test_start_and_play_via_messages() {
        let sessions = SessionManager::default();
        let config = ServerConfig::default();

        let info = start(&sessions, &config).await;
        assert_eq!(info.provenance.session_id, info.state.session_id);
        assert_eq!(info.provenance.client_value_used, "default_client_seed");
        assert!(info.state.last_outcome.starts_with("Welcome ada!"));

        let reply = GameServer::handle_client_message(
            ClientMessage::TakeTurn(TakeTurnRequest {
                session_id: info.state.session_id.clone(),
                slot_id: 0,
                insurance: false,
            }),
            &sessions,
            &config,
        )
        .await;

        match reply {
            ServerMessage::GameState(view) => {
                assert_eq!(view.history.len(), 1);
                assert!(view.turn == 2 || view.status == SessionStatus::Lost);
            }
            other => panic!("Wrong message type: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_errors_carry_codes() {
        let sessions = SessionManager::default();
        let config = ServerConfig::default();
        let info = start(&sessions, &config).await;

        let cases = vec![
            (
                ClientMessage::GetState { session_id: "missing".into() },
                ErrorCode::SessionNotFound,
            ),
            (
                ClientMessage::Reveal { session_id: info.state.session_id.clone() },
                ErrorCode::RevealBeforeCompletion,
            ),
            (
                ClientMessage::TakeTurn(TakeTurnRequest {
                    session_id: info.state.session_id.clone(),
                    slot_id: 0,
                    insurance: true,
                }),
                ErrorCode::InsuranceNotAllowed,
            ),
            (
                ClientMessage::Verify(Default::default()),
                ErrorCode::VerificationInputMalformed,
            ),
            (
                ClientMessage::EndSession { session_id: "missing".into() },
                ErrorCode::SessionNotFound,
            ),
        ];

        for (msg, expected) in cases {
            match GameServer::handle_client_message(msg, &sessions, &config).await {
                ServerMessage::Error(err) => assert_eq!(err.code, expected),
                other => panic!("Expected error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_full_game_reveal_and_verify() {
        let sessions = SessionManager::default();
        let config = ServerConfig::default();
        let session_id = start(&sessions, &config).await.state.session_id;

        loop {
            let reply = GameServer::handle_client_message(
                ClientMessage::TakeTurn(TakeTurnRequest {
                    session_id: session_id.clone(),
                    slot_id: 0,
                    insurance: false,
                }),
                &sessions,
                &config,
            )
            .await;
            match reply {
                ServerMessage::GameState(view) if view.status.is_terminal() => break,
                ServerMessage::GameState(_) => continue,
                other => panic!("Wrong message type: {other:?}"),
            }
        }

        let reveal = match GameServer::handle_client_message(
            ClientMessage::Reveal { session_id: session_id.clone() },
            &sessions,
            &config,
        )
        .await
        {
            ServerMessage::Reveal(reveal) => reveal,
            other => panic!("Wrong message type: {other:?}"),
        };

        match GameServer::handle_client_message(
            ClientMessage::Verify(reveal.to_verify_request().unwrap()),
            &sessions,
            &config,
        )
        .await
        {
            ServerMessage::Verification(report) => assert!(report.game_is_fair),
            other => panic!("Wrong message type: {other:?}"),
        }

        match GameServer::handle_client_message(
            ClientMessage::EndSession { session_id },
            &sessions,
            &config,
        )
        .await
        {
            ServerMessage::SessionEnded { .. } => {}
            other => panic!("Wrong message type: {other:?}"),
        }
        assert_eq!(sessions.session_count(), 0);
    }

    fn verify_message_json() -> serde_json::Value {
        let (plan, record) = ProvenanceRecord::establish(
            "ab".repeat(32),
            None,
            "3f2504e0-4f89-11d3-9a0c-0305e82c3301",
            6,
        )
        .unwrap();

        serde_json::json!({
            "type": "verify",
            "server_seed": record.server_secret,
            "client_seed": null,
            "session_id": "3f2504e0-4f89-11d3-9a0c-0305e82c3301",
            "all_paths_revealed": canonicalize(&plan),
            "commitment_hash": record.commitment_hash,
        })
    }

    async fn dispatch_text(text: &str) -> ServerMessage {
        let msg = ClientMessage::from_json(text).unwrap();
        GameServer::handle_client_message(msg, &SessionManager::default(), &ServerConfig::default())
            .await
    }

    #[tokio::test]
    async fn test_verify_missing_disclosed_field_is_malformed() {
        let mut json = verify_message_json();
        json["all_paths_revealed"][0]["paths"][0]
            .as_object_mut()
            .unwrap()
            .remove("is_trap");

        match dispatch_text(&json.to_string()).await {
            ServerMessage::Error(err) => {
                assert_eq!(err.code, ErrorCode::VerificationInputMalformed);
                assert!(err.message.contains("revealed_plan[0].paths[0].is_trap"));
            }
            other => panic!("Expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_padded_claim_is_not_fair() {
        match dispatch_text(&verify_message_json().to_string()).await {
            ServerMessage::Verification(report) => assert!(report.game_is_fair),
            other => panic!("Wrong message type: {other:?}"),
        }

        let mut json = verify_message_json();
        json["all_paths_revealed"][0]["paths"][0]["id"] = serde_json::json!(99);
        json["all_paths_revealed"][0]["injected"] = serde_json::json!("tampered");

        match dispatch_text(&json.to_string()).await {
            ServerMessage::Verification(report) => {
                assert!(!report.plan_matches);
                assert!(!report.game_is_fair);
            }
            other => panic!("Wrong message type: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dev_mode_views() {
        let sessions = SessionManager::default();
        let config = ServerConfig {
            dev_mode: true,
            ..Default::default()
        };
        let info = start(&sessions, &config).await;
        assert!(info.state.path_options.iter().all(|o| o.is_trap.is_some()));

        match GameServer::handle_client_message(ClientMessage::Health, &sessions, &config).await {
            ServerMessage::Health(health) => {
                assert!(health.dev_mode);
                assert!(health.provably_fair);
                assert_eq!(health.active_sessions, 1);
            }
            other => panic!("Wrong message type: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ping() {
        let sessions = SessionManager::default();
        let reply = GameServer::handle_client_message(
            ClientMessage::Ping { timestamp: 42 },
            &sessions,
            &ServerConfig::default(),
        )
        .await;
        assert!(matches!(reply, ServerMessage::Pong { client_timestamp: 42, .. }));
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = GameServer::new(ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        });

        assert_eq!(server.connection_count().await, 0);
        assert_eq!(server.session_count(), 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_websocket_round_trip() {
        let server = Arc::new(GameServer::new(ServerConfig::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let runner = server.clone();
        let handle = tokio::spawn(async move { runner.serve(listener).await });

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();

        ws.send(Message::Text(r#"{"type":"health"}"#.into())).await.unwrap();
        let reply = loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => break ServerMessage::from_json(&text).unwrap(),
                _ => continue,
            }
        };
        assert!(matches!(reply, ServerMessage::Health(_)));

        ws.send(Message::Text("garbage".into())).await.unwrap();
        let reply = loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => break ServerMessage::from_json(&text).unwrap(),
                _ => continue,
            }
        };
        match reply {
            ServerMessage::Error(err) => assert_eq!(err.code, ErrorCode::InvalidMessage),
            other => panic!("Wrong message type: {other:?}"),
        }

        server.shutdown();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_connection_limit_counts_pending_handshakes() {
        let server = Arc::new(GameServer::new(ServerConfig {
            max_connections: 1,
            ..Default::default()
        }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let runner = server.clone();
        let handle = tokio::spawn(async move { runner.serve(listener).await });

        // Holds the only slot without ever finishing the handshake
        let pending = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(tokio_tungstenite::connect_async(format!("ws://{addr}")).await.is_err());
        assert_eq!(server.connection_count().await, 0);

        // Closing the pending connection frees the slot
        drop(pending);
        let mut connected = None;
        for _ in 0..50 {
            if let Ok((ws, _)) = tokio_tungstenite::connect_async(format!("ws://{addr}")).await {
                connected = Some(ws);
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(connected.is_some());

        server.shutdown();
        handle.await.unwrap().unwrap();
    }
}
