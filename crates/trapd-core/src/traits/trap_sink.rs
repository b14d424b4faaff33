// # Trap Sink Trait
//
// Defines the interface for durable trap storage.
//
// ## Purpose
//
// The sink receives fully resolved `TrapEvent`s, one at a time, in the order
// their notifications arrived. It is append-only: repeated notifications
// produce repeated rows (at-least-once capture, no deduplication).
//
// ## Implementations
//
// - SQLite: `trapd-sink-sqlite` crate (`snmp_traps` table)
// - In-memory: `MemoryTrapSink` (tests, dry runs)
//
// ## Usage
//
// ```rust,ignore
// use trapd_core::{TrapSink, TrapEvent, AdminStatus};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let sink = /* TrapSink implementation */;
//
//     let mut event = TrapEvent::new("2025-01-09 12:00:00", "10.0.0.1");
//     event.interface = "Gi0/1".to_string();
//     event.status = AdminStatus::Up;
//
//     sink.insert_trap(&event).await?;
//     sink.flush().await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::event::TrapEvent;

/// Trait for persistence sink implementations
///
/// # Thread Safety
///
/// The underlying store may be shared with other writers (the polling
/// subsystem writes to the same database). Implementations must not assume
/// exclusive access and must not hold a lock across more than one insert.
///
/// # Forbidden Capabilities
/// - ❌ Deduplicating events (repeated notifications are repeated rows)
/// - ❌ Retrying failed inserts (the engine logs and moves on)
/// - ❌ Spawning background tasks without a clear lifecycle
#[async_trait]
pub trait TrapSink: Send + Sync {
    /// Append one resolved trap event
    ///
    /// Callers only pass events for which [`TrapEvent::is_complete`] holds.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The event is durable
    /// - `Err(Error::Sink)`: The write failed; the event is lost for this attempt
    async fn insert_trap(&self, event: &TrapEvent) -> Result<(), crate::Error>;

    /// Persist any pending writes
    async fn flush(&self) -> Result<(), crate::Error>;

    /// Get the sink name (for logging/debugging)
    fn sink_name(&self) -> &'static str;
}
