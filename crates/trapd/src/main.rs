// # trapd - SNMP Trap Daemon
//
// The trapd daemon is a thin integration layer. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Building the listener, decoder and sink for the configured form
// 4. Running the trap engine until SIGTERM/SIGINT or transport loss
//
// All decoding, extraction and persistence rules live in trapd-core and the
// plugin crates.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Listener
// - `TRAPD_LISTENER`: Listener form (socket, capture). Default: socket
// - `TRAPD_COMMUNITY`: Community accepted on structured payloads. Default: public
// - `TRAPD_BIND_ADDR`: Socket bind address. Default: 0.0.0.0:162
// - `TRAPD_CAPTURE_PROGRAM`: Capture program. Default: tcpdump
// - `TRAPD_CAPTURE_INTERFACE`: Capture interface. Default: any
// - `TRAPD_CAPTURE_PORT`: UDP port to capture. Default: 162
// - `TRAPD_CAPTURE_MARKER`: Substring a captured line must contain
//
// ### Sink
// - `TRAPD_SINK`: Sink type (sqlite, memory). Default: sqlite
// - `TRAPD_DB_PATH`: SQLite database path. Default: snmp_monitor.db
//
// ### Logging
// - `TRAPD_LOG_LEVEL`: trace, debug, info, warn, error. Default: info
// - `TRAPD_LOG_FILE`: Append logs to this file instead of stdout
//
// ## Example
//
// ```bash
// export TRAPD_COMMUNITY=netops
// export TRAPD_DB_PATH=/var/lib/netmon/snmp_monitor.db
// export TRAPD_LOG_FILE=/var/log/netmon/snmp_monitor.log
//
// trapd
// ```

use anyhow::{Context, Result};
use std::env;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use trapd_core::config::{DEFAULT_TRAP_PORT, ListenerConfig, SinkConfig, TrapConfig};
use trapd_core::decode::capture::CAPTURE_MARKER;
use trapd_core::traits::{TrapSink, TrapSource};
use trapd_core::{EngineEvent, MemoryTrapSink, TrapEngine};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum TrapdExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (listener lost, unexpected failure)
    RuntimeError = 2,
}

impl From<TrapdExitCode> for ExitCode {
    fn from(code: TrapdExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    listener_type: String,
    community: String,
    bind_addr: String,
    capture_program: String,
    capture_interface: String,
    capture_port: String,
    capture_marker: String,
    sink_type: String,
    db_path: String,
    log_level: String,
    log_file: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let var = |name: &str, default: &str| env::var(name).unwrap_or_else(|_| default.to_string());

        Self {
            listener_type: var("TRAPD_LISTENER", "socket"),
            community: var("TRAPD_COMMUNITY", "public"),
            bind_addr: var("TRAPD_BIND_ADDR", "0.0.0.0:162"),
            capture_program: var("TRAPD_CAPTURE_PROGRAM", "tcpdump"),
            capture_interface: var("TRAPD_CAPTURE_INTERFACE", "any"),
            capture_port: var("TRAPD_CAPTURE_PORT", &DEFAULT_TRAP_PORT.to_string()),
            capture_marker: var("TRAPD_CAPTURE_MARKER", CAPTURE_MARKER),
            sink_type: var("TRAPD_SINK", "sqlite"),
            db_path: var("TRAPD_DB_PATH", "snmp_monitor.db"),
            log_level: var("TRAPD_LOG_LEVEL", "info"),
            log_file: env::var("TRAPD_LOG_FILE").ok().filter(|s| !s.is_empty()),
        }
    }

    /// Validate the configuration and turn it into a pipeline config
    fn validate(&self) -> Result<TrapConfig> {
        let listener = match self.listener_type.as_str() {
            "socket" => {
                let bind_addr: SocketAddr = self.bind_addr.parse().map_err(|_| {
                    anyhow::anyhow!(
                        "TRAPD_BIND_ADDR '{}' is not a valid socket address. \
                        Example: 0.0.0.0:162",
                        self.bind_addr
                    )
                })?;
                ListenerConfig::Socket { bind_addr }
            }
            "capture" => {
                let port: u16 = self.capture_port.parse().map_err(|_| {
                    anyhow::anyhow!(
                        "TRAPD_CAPTURE_PORT must be between 1 and 65535. Got: {}",
                        self.capture_port
                    )
                })?;
                ListenerConfig::Capture {
                    program: self.capture_program.clone(),
                    interface: self.capture_interface.clone(),
                    port,
                    marker: self.capture_marker.clone(),
                }
            }
            _ => anyhow::bail!(
                "TRAPD_LISTENER '{}' is not supported. \
                Supported forms: socket, capture",
                self.listener_type
            ),
        };

        let sink = match self.sink_type.as_str() {
            "sqlite" => SinkConfig::Sqlite {
                path: self.db_path.clone(),
            },
            "memory" => SinkConfig::Memory,
            _ => anyhow::bail!(
                "TRAPD_SINK '{}' is not supported. \
                Supported types: sqlite, memory",
                self.sink_type
            ),
        };

        // Validate log level
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "TRAPD_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        if let Some(ref path) = self.log_file
            && let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "TRAPD_LOG_FILE parent directory does not exist: {}. \
                Create it first: sudo mkdir -p {}",
                parent.display(),
                parent.display()
            );
        }

        let mut trap_config = TrapConfig::new()
            .with_community(self.community.clone())
            .with_listener(listener);
        trap_config.sink = sink;

        trap_config
            .validate()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        Ok(trap_config)
    }
}

/// Install the global tracing subscriber
fn init_tracing(level: &str, log_file: Option<&str>) -> Result<()> {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder().with_max_level(log_level);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            let subscriber = builder.with_ansi(false).with_writer(Mutex::new(file)).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            tracing::subscriber::set_global_default(builder.finish())?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = Config::from_env();

    // Validate configuration
    let trap_config = match config.validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return TrapdExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    if let Err(e) = init_tracing(&config.log_level, config.log_file.as_deref()) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return TrapdExitCode::ConfigError.into();
    }

    info!("Starting trapd daemon");
    info!(
        "Configuration loaded: listener={}",
        trap_config.listener.type_name()
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return TrapdExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(trap_config)).into()
}

/// Build the listener for the configured form
fn build_source(config: &TrapConfig) -> Result<Box<dyn TrapSource>> {
    match &config.listener {
        #[cfg(feature = "udp")]
        ListenerConfig::Socket { .. } => Ok(Box::new(
            trapd_source_udp::UdpTrapSource::from_config(config)?,
        )),
        #[cfg(feature = "capture")]
        ListenerConfig::Capture { .. } => Ok(Box::new(
            trapd_source_capture::CaptureTrapSource::from_config(config)?,
        )),
        #[allow(unreachable_patterns)]
        other => anyhow::bail!(
            "Listener form '{}' is not compiled into this build",
            other.type_name()
        ),
    }
}

/// Build the persistence sink
fn build_sink(config: &TrapConfig) -> Result<Box<dyn TrapSink>> {
    match &config.sink {
        #[cfg(feature = "sqlite")]
        SinkConfig::Sqlite { .. } => Ok(Box::new(
            trapd_sink_sqlite::SqliteTrapSink::from_config(config)?,
        )),
        SinkConfig::Memory => {
            warn!("Using in-memory sink: traps will not survive a restart");
            Ok(Box::new(MemoryTrapSink::new()))
        }
        #[allow(unreachable_patterns)]
        _ => anyhow::bail!("SQLite sink is not compiled into this build"),
    }
}

/// Wire listener, decoder and sink into an engine
fn build_engine(
    config: &TrapConfig,
) -> Result<(TrapEngine, tokio::sync::mpsc::Receiver<EngineEvent>)> {
    let source = build_source(config)?;
    let decoder = trapd_core::decode::for_config(config);
    let sink = build_sink(config)?;

    Ok(TrapEngine::new(source, decoder, sink, config)?)
}

/// Run the daemon
async fn run_daemon(config: TrapConfig) -> TrapdExitCode {
    let (engine, mut events) = match build_engine(&config) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return TrapdExitCode::ConfigError;
        }
    };

    // Observe engine events; started tells startup failures from runtime ones
    let (started_tx, mut started_rx) = tokio::sync::watch::channel(false);
    let observer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::Started { .. } => {
                    let _ = started_tx.send(true);
                }
                EngineEvent::Stopped { reason } => info!("Engine stopped: {}", reason),
                _ => {}
            }
        }
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Shutdown handler error: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    let result = engine.run_with_shutdown(shutdown_rx).await;
    drop(engine);
    let _ = observer.await;

    match result {
        Ok(()) => {
            info!("Shutting down daemon");
            TrapdExitCode::CleanShutdown
        }
        Err(e) if !*started_rx.borrow_and_update() => {
            error!("Failed to start listener: {}", e);
            TrapdExitCode::ConfigError
        }
        Err(e) => {
            error!("Daemon error: {}", e);
            TrapdExitCode::RuntimeError
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    // Set up signal handlers for SIGTERM and SIGINT
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
