// # Memory Trap Sink
//
// In-memory implementation of TrapSink.
//
// ## Purpose
//
// Keeps every persisted event in an append-only Vec. Nothing survives a
// restart.
//
// ## When to Use
//
// - Testing environments
// - Dry runs of a listener without touching the shared database

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::event::TrapEvent;
use crate::traits::TrapSink;

/// In-memory trap sink implementation
///
/// # Example
///
/// ```rust,no_run
/// use trapd_core::sink::MemoryTrapSink;
/// use trapd_core::traits::TrapSink;
/// use trapd_core::{AdminStatus, TrapEvent};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let sink = MemoryTrapSink::new();
///
///     let mut event = TrapEvent::new("2025-01-09 12:00:00", "10.0.0.1");
///     event.interface = "Gi0/1".to_string();
///     event.status = AdminStatus::Up;
///     sink.insert_trap(&event).await?;
///
///     assert_eq!(sink.len().await, 1);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryTrapSink {
    inner: Arc<RwLock<Vec<TrapEvent>>>,
}

impl MemoryTrapSink {
    /// Create a new empty memory sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored events
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the sink is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Snapshot of all stored events in insertion order
    pub async fn events(&self) -> Vec<TrapEvent> {
        self.inner.read().await.clone()
    }

    /// Remove all stored events
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

#[async_trait]
impl TrapSink for MemoryTrapSink {
    async fn insert_trap(&self, event: &TrapEvent) -> Result<(), Error> {
        self.inner.write().await.push(event.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "memory"
    }
}
