//! MQTT Broker Core
//!
//! The main broker implementation that handles client connections,
//! message routing, and coordinates all components.

mod connection;
mod router;
mod sys_topics;
mod tls;
mod writer;

pub use connection::Connection;
pub use router::Router;
pub use sys_topics::spawn_sys_topics_task;
pub use tls::{load_tls_config, TlsError};
pub use writer::SharedWriter;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::hooks::{DefaultHooks, Hooks};
use crate::metrics::Metrics;
use crate::protocol::{Properties, ProtocolVersion, Publish, QoS};
use crate::session::SessionStore;
use crate::topic::Subscription;
use crate::transport::{configure_stream, TransportConfig, WsStream};

/// Broker configuration
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// TCP bind address
    pub bind_addr: SocketAddr,
    /// WebSocket bind address (optional)
    pub ws_bind_addr: Option<SocketAddr>,
    /// WebSocket path (default: "/mqtt")
    pub ws_path: String,
    /// Maximum connections
    pub max_connections: usize,
    /// Maximum packet size
    pub max_packet_size: usize,
    /// Default keep alive (if client specifies 0)
    pub default_keep_alive: u16,
    /// Maximum keep alive
    pub max_keep_alive: u16,
    /// Session expiry check interval
    pub session_expiry_check_interval: Duration,
    /// Maximum QoS
    pub max_qos: QoS,
    /// Retain available
    pub retain_available: bool,
    /// Wildcard subscription available
    pub wildcard_subscription_available: bool,
    /// Subscription identifiers available
    pub subscription_identifiers_available: bool,
    /// Maximum in-flight QoS 1/2 messages per client
    pub max_inflight: u16,
    /// Maximum topic levels allowed (0 = unlimited)
    pub max_topic_levels: usize,
    /// Interval between retransmissions of unacked QoS 1/2 messages
    pub retry_interval: Duration,
    /// TLS bind address (optional, enables MQTT over TLS)
    pub tls_bind_addr: Option<SocketAddr>,
    /// TLS configuration (required when tls_bind_addr is set)
    pub tls: Option<TlsConfig>,
    /// $SYS topic publish interval, 0 disables
    pub sys_topics_interval: Duration,
}

/// TLS configuration for the listener
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
    pub ca_cert_path: Option<String>,
    pub require_client_cert: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:1883".parse().unwrap(),
            ws_bind_addr: None,
            ws_path: "/mqtt".to_string(),
            max_connections: 100_000,
            max_packet_size: 1024 * 1024,
            default_keep_alive: 60,
            max_keep_alive: 65535,
            session_expiry_check_interval: Duration::from_secs(60),
            max_qos: QoS::ExactlyOnce,
            retain_available: true,
            wildcard_subscription_available: true,
            subscription_identifiers_available: true,
            max_inflight: 32,
            max_topic_levels: 0,
            retry_interval: Duration::from_secs(30),
            tls_bind_addr: None,
            tls: None,
            sys_topics_interval: Duration::from_secs(10),
        }
    }
}

/// Retained message
#[derive(Debug, Clone)]
pub struct RetainedMessage {
    pub topic: Arc<str>,
    pub payload: Bytes,
    pub qos: QoS,
    pub properties: Properties,
    pub timestamp: Instant,
}

/// Broker events
#[derive(Debug, Clone)]
pub enum BrokerEvent {
    /// Client connected
    ClientConnected {
        client_id: Arc<str>,
        protocol_version: ProtocolVersion,
    },
    /// Client disconnected
    ClientDisconnected { client_id: Arc<str> },
    /// Message published
    MessagePublished {
        topic: String,
        payload: Bytes,
        qos: QoS,
        retain: bool,
    },
    /// A queued message was dropped because a session's pending queue was full
    MessageDropped,
}

/// The MQTT broker: owns the listeners and the shared state every
/// connection task reaches into (sessions, router, retained messages).
pub struct Broker {
    config: BrokerConfig,
    sessions: Arc<SessionStore>,
    router: Arc<Router>,
    retained: Arc<DashMap<String, RetainedMessage>>,
    connections: Arc<DashMap<Arc<str>, Arc<SharedWriter>>>,
    shutdown: broadcast::Sender<()>,
    events: broadcast::Sender<BrokerEvent>,
    hooks: Arc<dyn Hooks>,
    metrics: Option<Arc<Metrics>>,
}

impl Broker {
    /// Create a new broker with default hooks (allows everything)
    pub fn new(config: BrokerConfig) -> Self {
        Self::with_hooks(config, Arc::new(DefaultHooks))
    }

    /// Create a new broker with custom hooks
    pub fn with_hooks(config: BrokerConfig, hooks: Arc<dyn Hooks>) -> Self {
        Self::with_hooks_and_metrics(config, hooks, None)
    }

    /// Create a new broker with custom hooks and a metrics sink
    pub fn with_hooks_and_metrics(
        config: BrokerConfig,
        hooks: Arc<dyn Hooks>,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        let (events, _) = broadcast::channel(1024);
        let sessions = Arc::new(SessionStore::new());

        Self {
            router: Arc::new(Router::new(sessions.clone())),
            config,
            sessions,
            retained: Arc::new(DashMap::new()),
            connections: Arc::new(DashMap::new()),
            shutdown,
            events,
            hooks,
            metrics,
        }
    }

    /// Run the broker
    pub async fn run(&self) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!("MQTT/TCP listening on {}", self.config.bind_addr);

        if let Some(ws_addr) = self.config.ws_bind_addr {
            let ws_listener = TcpListener::bind(ws_addr).await?;
            info!(
                "MQTT/WebSocket listening on {} (path: {})",
                ws_addr, self.config.ws_path
            );

            let sessions = self.sessions.clone();
            let router = self.router.clone();
            let retained = self.retained.clone();
            let connections = self.connections.clone();
            let config = self.config.clone();
            let events = self.events.clone();
            let shutdown = self.shutdown.clone();
            let hooks = self.hooks.clone();
            let metrics = self.metrics.clone();

            tokio::spawn(async move {
                loop {
                    match ws_listener.accept().await {
                        Ok((stream, addr)) => {
                            debug!("New WebSocket connection from {}", addr);
                            if let Err(e) = configure_stream(&stream, &TransportConfig::default()) {
                                debug!("Failed to configure socket for {}: {}", addr, e);
                            }
                            let sessions = sessions.clone();
                            let router = router.clone();
                            let retained = retained.clone();
                            let connections = connections.clone();
                            let config = config.clone();
                            let events = events.clone();
                            let hooks = hooks.clone();
                            let metrics = metrics.clone();
                            let mut shutdown_rx = shutdown.subscribe();

                            tokio::spawn(async move {
                                match WsStream::accept_with_path(stream, &config.ws_path).await {
                                    Ok(ws_stream) => {
                                        debug!("WebSocket handshake complete for {}", addr);
                                        let mut conn = Connection::new(
                                            ws_stream, addr, sessions, router, retained,
                                            connections, config, events, hooks, metrics,
                                        );

                                        let conn_fut = conn.run();
                                        tokio::pin!(conn_fut);

                                        tokio::select! {
                                            biased;
                                            result = &mut conn_fut => {
                                                if let Err(e) = result {
                                                    debug!("WebSocket connection error from {}: {}", addr, e);
                                                }
                                            }
                                            _ = shutdown_rx.recv() => {}
                                        }
                                    }
                                    Err(e) => {
                                        debug!("WebSocket handshake failed for {}: {}", addr, e);
                                    }
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept WebSocket connection: {}", e);
                        }
                    }
                }
            });
        }

        let sessions = self.sessions.clone();
        let interval = self.config.session_expiry_check_interval;
        let mut shutdown_rx = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = ticker.tick() => {
                        sessions.cleanup_expired();
                    }
                    result = shutdown_rx.recv() => {
                        if matches!(result, Ok(()) | Err(broadcast::error::RecvError::Closed)) {
                            break;
                        }
                    }
                }
            }
        });

        // Periodically sweep empty topic entries out of the router.
        let router = self.router.clone();
        let mut shutdown_rx = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(300));
            loop {
                tokio::select! {
                    biased;
                    _ = ticker.tick() => router.sweep(),
                    result = shutdown_rx.recv() => {
                        if matches!(result, Ok(()) | Err(broadcast::error::RecvError::Closed)) {
                            break;
                        }
                    }
                }
            }
        });

        debug!("Starting TCP accept loop");
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("New TCP connection from {}", addr);
                    if let Err(e) = configure_stream(&stream, &TransportConfig::default()) {
                        debug!("Failed to configure socket for {}: {}", addr, e);
                    }
                    self.handle_connection(stream, addr);
                }
                Err(e) => {
                    error!("Failed to accept TCP connection: {}", e);
                }
            }
        }
    }

    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let sessions = self.sessions.clone();
        let router = self.router.clone();
        let retained = self.retained.clone();
        let connections = self.connections.clone();
        let config = self.config.clone();
        let events = self.events.clone();
        let hooks = self.hooks.clone();
        let metrics = self.metrics.clone();
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut conn = Connection::new(
                stream, addr, sessions, router, retained, connections, config, events, hooks,
                metrics,
            );

            let conn_fut = conn.run();
            tokio::pin!(conn_fut);

            tokio::select! {
                biased;
                result = &mut conn_fut => {
                    if let Err(e) = result {
                        debug!("Connection error from {}: {}", addr, e);
                    }
                }
                result = shutdown_rx.recv() => {
                    debug!("Connection {} shutting down ({:?})", addr, result);
                }
            }
        });
    }

    /// Shutdown the broker
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Subscribe to broker events
    pub fn subscribe_events(&self) -> broadcast::Receiver<BrokerEvent> {
        self.events.subscribe()
    }

    /// Subscribe to the shutdown signal, for tasks spawned alongside the broker
    /// (e.g. the `$SYS` topics publisher) that need to stop when it does.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn retained_count(&self) -> usize {
        self.retained.len()
    }

    /// Publish a message from the server itself (used by `$SYS` topics and embedders).
    pub fn publish(&self, topic: String, payload: Bytes, qos: QoS, retain: bool) {
        let topic_arc: Arc<str> = topic.as_str().into();
        let publish = Publish {
            dup: false,
            qos,
            retain,
            topic: topic_arc.clone(),
            packet_id: None,
            payload: payload.clone(),
            properties: Properties::default(),
        };

        if retain {
            if payload.is_empty() {
                if let Some((_, old)) = self.retained.remove(&topic) {
                    if let Some(ref metrics) = self.metrics {
                        metrics.retained_message_removed(old.payload.len());
                    }
                }
            } else {
                let payload_len = payload.len();
                let old = self.retained.insert(
                    topic.clone(),
                    RetainedMessage {
                        topic: topic_arc,
                        payload,
                        qos,
                        properties: Properties::default(),
                        timestamp: Instant::now(),
                    },
                );
                if let Some(ref metrics) = self.metrics {
                    if let Some(old) = old {
                        metrics.retained_message_removed(old.payload.len());
                    }
                    metrics.retained_message_stored(payload_len);
                }
            }
        }

        let subscribers: Vec<Subscription> = self.router.subscribers_for(&topic).subscribers();

        for sub in subscribers {
            let effective_qos = qos.min(sub.qos);

            if let Some(writer) = self.connections.get(&sub.client_id) {
                let mut outgoing = publish.clone();
                let effective_retain = if sub.retain_as_published { retain } else { false };
                let _ = writer.send_publish(&mut outgoing, effective_qos, effective_retain);
            } else if let Some(session) = self.sessions.get(&sub.client_id) {
                let mut s = session.write();
                if !s.clean_start {
                    let mut outgoing = publish.clone();
                    outgoing.qos = effective_qos;
                    s.queue_message(outgoing);
                }
            }
        }

        let hooks = self.hooks.clone();
        tokio::spawn(async move {
            hooks
                .on_message_published(&publish.topic, &publish.payload, publish.qos)
                .await;
        });
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(BrokerConfig::default())
    }
}
