//! Configuration types for the trap pipeline
//!
//! This module defines all configuration structures used throughout the crate.
//! Loading them (from the environment, a file, ...) is left to the caller.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Standard SNMP notification port
pub const DEFAULT_TRAP_PORT: u16 = 162;

/// Main trap pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapConfig {
    /// Shared community string accepted on structured payloads
    #[serde(default = "default_community")]
    pub community: String,

    /// Which listener form feeds the engine
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Persistence sink configuration
    #[serde(default)]
    pub sink: SinkConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl TrapConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            community: default_community(),
            listener: ListenerConfig::default(),
            sink: SinkConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Set the community string
    pub fn with_community(mut self, community: impl Into<String>) -> Self {
        self.community = community.into();
        self
    }

    /// Set the listener form
    pub fn with_listener(mut self, listener: ListenerConfig) -> Self {
        self.listener = listener;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.community.is_empty() {
            return Err(crate::Error::config("Community string cannot be empty"));
        }

        if self.engine.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        self.listener.validate()?;
        self.sink.validate()?;

        Ok(())
    }
}

impl Default for TrapConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener form configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListenerConfig {
    /// UDP socket bound on the notification port
    Socket {
        /// Local address to bind (e.g., "0.0.0.0:162")
        bind_addr: SocketAddr,
    },

    /// External packet-capture process filtered to the notification port
    Capture {
        /// Capture program to launch (e.g., "tcpdump")
        program: String,
        /// Interface to capture on ("any" for all)
        interface: String,
        /// UDP port to filter on
        port: u16,
        /// Lines without this substring are never decoded
        marker: String,
    },
}

impl ListenerConfig {
    /// Validate the listener configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ListenerConfig::Socket { .. } => Ok(()),
            ListenerConfig::Capture {
                program,
                interface,
                port,
                marker,
            } => {
                if program.is_empty() {
                    return Err(crate::Error::config("Capture program cannot be empty"));
                }
                if interface.is_empty() {
                    return Err(crate::Error::config("Capture interface cannot be empty"));
                }
                if *port == 0 {
                    return Err(crate::Error::config("Capture port must be > 0"));
                }
                if marker.is_empty() {
                    return Err(crate::Error::config("Capture marker cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the listener type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ListenerConfig::Socket { .. } => "socket",
            ListenerConfig::Capture { .. } => "capture",
        }
    }

    /// Capture listener with the usual tcpdump settings
    pub fn tcpdump() -> Self {
        ListenerConfig::Capture {
            program: "tcpdump".to_string(),
            interface: "any".to_string(),
            port: DEFAULT_TRAP_PORT,
            marker: crate::decode::capture::CAPTURE_MARKER.to_string(),
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        ListenerConfig::Socket {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_TRAP_PORT)),
        }
    }
}

/// Persistence sink configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// SQLite database shared with the polling subsystem
    Sqlite {
        /// Path to the database file
        path: String,
    },

    /// In-memory sink (not persistent)
    Memory,
}

impl SinkConfig {
    /// Validate the sink configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SinkConfig::Sqlite { path } if path.is_empty() => {
                Err(crate::Error::config("SQLite database path cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Sqlite {
            path: "snmp_monitor.db".to_string(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the engine's observation channel
    ///
    /// When full, engine events are dropped (with a warning log). Ingestion
    /// itself is never slowed down by an unread channel.
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_community() -> String {
    "public".to_string()
}

fn default_event_channel_capacity() -> usize {
    1000
}
