// # SQLite Trap Sink
//
// This crate provides the durable persistence sink for the trap pipeline.
//
// ## Storage
//
// One row per resolved notification in the `snmp_traps` table. The database
// file is shared with the polling subsystem, so the table is created only if
// missing and every write takes the connection lock for exactly one insert.
//
// ```text
// snmp_traps
// ├── id                INTEGER PRIMARY KEY AUTOINCREMENT
// ├── timestamp         TEXT NOT NULL
// ├── host              TEXT NOT NULL
// ├── interface         TEXT
// └── interface_status  TEXT      ("UP" | "DOWN")
// ```
//
// There is no unique constraint: a retransmitted notification is a second row.
//
// ## Blocking
//
// rusqlite is synchronous. Inserts run on tokio's blocking pool so the
// listener task is never parked on disk I/O.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use trapd_core::config::{SinkConfig, TrapConfig};
use trapd_core::traits::TrapSink;
use trapd_core::{AdminStatus, Error, Result, TrapEvent};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS snmp_traps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    host TEXT NOT NULL,
    interface TEXT,
    interface_status TEXT
)";

const INSERT_TRAP: &str =
    "INSERT INTO snmp_traps (timestamp, host, interface, interface_status) VALUES (?1, ?2, ?3, ?4)";

fn sink_error(e: rusqlite::Error) -> Error {
    Error::sink(e.to_string())
}

fn parse_status(value: Option<String>) -> AdminStatus {
    match value.as_deref() {
        Some("UP") => AdminStatus::Up,
        Some("DOWN") => AdminStatus::Down,
        _ => AdminStatus::Unknown,
    }
}

/// SQLite-backed trap sink
#[derive(Clone)]
pub struct SqliteTrapSink {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTrapSink {
    /// Open (or create) the database file and ensure the table exists
    ///
    /// The parent directory is created if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(sink_error)?;
        conn.execute(CREATE_TABLE, []).map_err(sink_error)?;

        info!("Trap database ready at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(sink_error)?;
        conn.execute(CREATE_TABLE, []).map_err(sink_error)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create a sink from the sink section of a config
    pub fn from_config(config: &TrapConfig) -> Result<Self> {
        match &config.sink {
            SinkConfig::Sqlite { path } => Self::open(path),
            SinkConfig::Memory => Err(Error::config("Invalid sink config for SQLite sink: memory")),
        }
    }

    /// Number of stored trap rows
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM snmp_traps", [], |row| row.get(0))
            .map_err(sink_error)?;
        Ok(count as usize)
    }

    /// Most recent rows, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<TrapEvent>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT timestamp, host, interface, interface_status FROM snmp_traps
                 ORDER BY id DESC LIMIT ?1",
            )
            .map_err(sink_error)?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(TrapEvent {
                    timestamp: row.get(0)?,
                    host: row.get(1)?,
                    interface: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    status: parse_status(row.get(3)?),
                })
            })
            .map_err(sink_error)?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sink_error)
    }
}

#[async_trait]
impl TrapSink for SqliteTrapSink {
    async fn insert_trap(&self, event: &TrapEvent) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        let event = event.clone();

        tokio::task::spawn_blocking(move || {
            conn.lock()
                .execute(
                    INSERT_TRAP,
                    params![
                        event.timestamp,
                        event.host,
                        event.interface,
                        event.status.as_str()
                    ],
                )
                .map(|_| debug!("Inserted trap row for {} {}", event.host, event.interface))
                .map_err(sink_error)
        })
        .await
        .map_err(|e| Error::sink(format!("Insert task failed: {}", e)))?
    }

    async fn flush(&self) -> Result<()> {
        // Autocommit: every insert is already durable
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "sqlite"
    }
}
