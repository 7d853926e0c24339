//! HearthMQ - MQTT v3.1.1/v5.0 broker core
//!
//! Usage:
//!   hearthmq [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>    Configuration file path
//!   -b, --bind <ADDR>      Bind address (default: 0.0.0.0:1883)
//!   --max-connections <N>  Maximum connections (default: 100000)
//!   --max-packet-size <N>  Maximum packet size (default: 1MB)
//!   -l, --log-level        Log level (error, warn, info, debug, trace)
//!   -h, --help             Print help

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hearthmq::auth::AuthProvider;
use hearthmq::broker::{spawn_sys_topics_task, Broker, BrokerConfig, TlsConfig};
use hearthmq::config::Config;
use hearthmq::hooks::CompositeHooks;
use hearthmq::protocol::QoS;
use hearthmq::Metrics;

/// Log level for CLI
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum LogLevel {
    /// Only errors
    Error,
    /// Warnings and errors
    #[default]
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace messages (very verbose)
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// HearthMQ - MQTT broker core
#[derive(Parser, Debug)]
#[command(name = "hearthmq")]
#[command(version = "0.1.0")]
#[command(about = "MQTT v3.1.1/v5.0 broker core")]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TCP bind address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// WebSocket bind address (optional, enables MQTT over WebSocket)
    #[arg(long)]
    ws_bind: Option<SocketAddr>,

    /// Maximum connections
    #[arg(long)]
    max_connections: Option<usize>,

    /// Maximum packet size in bytes
    #[arg(long)]
    max_packet_size: Option<usize>,

    /// Maximum QoS level (0, 1, or 2)
    #[arg(long)]
    max_qos: Option<u8>,

    /// Default keep alive in seconds
    #[arg(long)]
    keep_alive: Option<u16>,

    /// Enable retained messages
    #[arg(long)]
    retain: Option<bool>,

    /// Enable wildcard subscriptions
    #[arg(long)]
    wildcard_subs: Option<bool>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let file_config = if let Some(config_path) = &args.config {
        match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Error loading config file: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::from_env().unwrap_or_default()
    };

    // Setup logging - CLI overrides config, config overrides default (warn)
    let log_level = args.log_level.unwrap_or_else(|| {
        match file_config.log.level.to_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Warn,
        }
    });

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level.to_tracing_level())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(path) = &args.config {
        info!("Loaded configuration from {:?}", path);
    }

    // CLI args override file config
    let bind_addr = args.bind.unwrap_or(file_config.server.bind);
    let tls_bind_addr = file_config.server.tls_bind;
    let tls = file_config.server.tls.as_ref().map(|tls| TlsConfig {
        cert_path: tls.cert.clone(),
        key_path: tls.key.clone(),
        ca_cert_path: tls.ca_cert.clone(),
        require_client_cert: tls.require_client_cert,
    });
    let ws_bind_addr = args.ws_bind.or(file_config.server.ws_bind);
    let max_connections = args
        .max_connections
        .unwrap_or(file_config.limits.max_connections);
    let max_connections = if max_connections == 0 {
        10_000_000
    } else {
        max_connections
    };
    let max_packet_size = args
        .max_packet_size
        .unwrap_or(file_config.limits.max_packet_size);
    let max_packet_size = if max_packet_size == 0 {
        usize::MAX
    } else {
        max_packet_size
    };
    let default_keep_alive = args
        .keep_alive
        .unwrap_or(file_config.session.default_keep_alive);
    let retain_available = args.retain.unwrap_or(file_config.mqtt.retain_available);
    let wildcard_subscription_available = args
        .wildcard_subs
        .unwrap_or(file_config.mqtt.wildcard_subscriptions);

    let max_qos_value = args.max_qos.unwrap_or(file_config.mqtt.max_qos);
    let max_qos = match max_qos_value {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => {
            eprintln!(
                "Invalid max-qos value: {}. Must be 0, 1, or 2.",
                max_qos_value
            );
            std::process::exit(1);
        }
    };

    let max_inflight = if file_config.limits.max_inflight == 0 {
        u16::MAX
    } else {
        file_config.limits.max_inflight
    };

    let broker_config = BrokerConfig {
        bind_addr,
        ws_bind_addr,
        ws_path: file_config.server.ws_path.clone(),
        max_connections,
        max_packet_size,
        default_keep_alive,
        max_keep_alive: file_config.session.max_keep_alive,
        session_expiry_check_interval: file_config.session.expiry_check_interval_duration(),
        max_qos,
        retain_available,
        wildcard_subscription_available,
        subscription_identifiers_available: file_config.mqtt.subscription_identifiers,
        max_inflight,
        max_topic_levels: 0,
        retry_interval: file_config.limits.retry_interval_duration(),
        tls_bind_addr,
        tls,
        sys_topics_interval: std::time::Duration::from_secs(file_config.mqtt.sys_interval),
    };

    info!("Starting HearthMQ broker");
    info!("  Bind address: {}", broker_config.bind_addr);
    if let Some(tls_addr) = &broker_config.tls_bind_addr {
        info!("  TLS address: {}", tls_addr);
    }
    if let Some(ws_addr) = &broker_config.ws_bind_addr {
        info!("  WebSocket address: {}", ws_addr);
    }
    info!("  Max connections: {}", broker_config.max_connections);
    info!("  Max packet size: {} bytes", broker_config.max_packet_size);
    info!("  Max inflight: {}", broker_config.max_inflight);
    info!("  Max QoS: {:?}", broker_config.max_qos);

    if file_config.auth.enabled {
        info!(
            "  Authentication: enabled ({} users configured)",
            file_config.auth.users.len()
        );
    } else {
        info!("  Authentication: disabled");
    }

    let auth_provider = Arc::new(AuthProvider::new(&file_config.auth));
    let hooks = Arc::new(CompositeHooks::new().with(auth_provider));

    let metrics = Arc::new(Metrics::new());
    let sys_topics_enabled = file_config.mqtt.sys_topics;
    let sys_interval = file_config.mqtt.sys_interval;

    let broker = Arc::new(Broker::with_hooks_and_metrics(
        broker_config,
        hooks,
        Some(metrics.clone()),
    ));

    if sys_topics_enabled {
        info!("  $SYS topics: enabled (every {}s)", sys_interval);
        spawn_sys_topics_task(
            broker.clone(),
            Some(metrics),
            sys_interval,
            Instant::now(),
            broker.subscribe_shutdown(),
        );
    } else {
        info!("  $SYS topics: disabled");
    }

    let broker_run = broker.clone();
    tokio::select! {
        result = broker_run.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            broker.shutdown();
        }
    }

    Ok(())
}
