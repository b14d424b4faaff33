//! Trap ingestion engine
//!
//! The TrapEngine is responsible for:
//! - Opening the configured listener (socket or capture stream)
//! - Handing each inbound unit to the decoder
//! - Folding decoded bindings into a TrapEvent
//! - Writing resolved events to the sink
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ TrapSource  │─── InboundUnit ───┐
//! └─────────────┘                   │
//!                                   ▼
//!                          ┌──────────────┐
//!                          │  TrapEngine  │
//!                          └──────────────┘
//!                                   │
//!         ┌─────────────────────────┼─────────────────────────┐
//!         │                         │                         │
//!         ▼                         ▼                         ▼
//! ┌─────────────┐          ┌──────────────┐          ┌─────────────┐
//! │ TrapDecoder │          │  TrapSink    │          │   Events    │
//! │ + extractor │          │  (insert)    │          │  (notify)   │
//! └─────────────┘          └──────────────┘          └─────────────┘
//! ```
//!
//! ## Unit Flow
//!
//! 1. Wait for the next unit (or shutdown)
//! 2. Decode; drop the unit if it is ignored or malformed
//! 3. Extract; drop the event if interface or status is unresolved
//! 4. Insert into the sink; log a failure and move on
//! 5. Emit an event for monitoring/logging
//!
//! Each unit runs to completion before the next one is read, so events reach
//! the sink in arrival order and never half-built.

use crate::config::TrapConfig;
use crate::error::{Error, Result};
use crate::event::TrapEvent;
use crate::extract;
use crate::traits::{InboundUnit, TrapDecoder, TrapSink, TrapSource};
use std::future::Future;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

/// Events emitted by the TrapEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Listener opened, engine waiting for units
    Started {
        source: &'static str,
        decoder: &'static str,
        sink: &'static str,
    },

    /// Unit deliberately ignored (community mismatch, irrelevant line)
    TrapDiscarded {
        kind: &'static str,
    },

    /// Unit was malformed
    DecodeFailed {
        error: String,
    },

    /// Notification decoded but interface or status unresolved
    TrapIncomplete {
        host: String,
    },

    /// Event written to the sink
    TrapPersisted {
        event: TrapEvent,
    },

    /// Sink rejected the event; it is lost for this attempt
    PersistFailed {
        host: String,
        error: String,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Core trap ingestion engine
///
/// ## Lifecycle
///
/// 1. Create with [`TrapEngine::new()`]
/// 2. Start with [`TrapEngine::run()`] or [`TrapEngine::run_with_shutdown()`]
/// 3. Engine runs until shutdown or until the listener closes
/// 4. Sink is flushed, listener handle released on return
///
/// ## Threading
///
/// One logical worker: decode, extract and persist run inline on the task
/// that reads the stream. There is no fan-out and no lock held around the
/// extractor.
pub struct TrapEngine {
    /// Listener producing inbound units
    source: Box<dyn TrapSource>,

    /// Decoder matching the listener form
    decoder: Box<dyn TrapDecoder>,

    /// Durable storage for resolved events
    sink: Box<dyn TrapSink>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl TrapEngine {
    /// Create a new trap engine
    ///
    /// # Parameters
    ///
    /// - `source`: Listener implementation
    /// - `decoder`: Decoder for the listener's units
    /// - `sink`: Persistence sink
    /// - `config`: Pipeline configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        source: Box<dyn TrapSource>,
        decoder: Box<dyn TrapDecoder>,
        sink: Box<dyn TrapSink>,
        config: &TrapConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            source,
            decoder,
            sink,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run the engine until Ctrl-C
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error::Transport)`: Listener could not be opened or closed underneath us
    pub async fn run(&self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run the engine until the shutdown receiver fires
    ///
    /// Dropping the sender also counts as a shutdown request. Use this when
    /// the caller owns signal handling (the daemon waits for SIGTERM as well
    /// as SIGINT) or needs deterministic shutdown in tests.
    pub async fn run_with_shutdown(&self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        self.run_until(async {
            let _ = shutdown_rx.await;
        })
        .await
    }

    async fn run_until(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let mut units = self.source.open().await?;

        info!(
            "Trap listener started: source={} decoder={} sink={}",
            self.source.source_name(),
            self.decoder.decoder_name(),
            self.sink.sink_name()
        );
        self.emit_event(EngineEvent::Started {
            source: self.source.source_name(),
            decoder: self.decoder.decoder_name(),
            sink: self.sink.sink_name(),
        });

        tokio::pin!(shutdown);

        // Main event loop
        let outcome = loop {
            tokio::select! {
                unit = units.next() => match unit {
                    Some(unit) => {
                        if let Err(e) = self.handle_unit(unit).await {
                            if e.is_recoverable() {
                                debug!("Dropping unit: {}", e);
                            } else {
                                error!("Failed to handle unit: {}", e);
                            }
                        }
                    }
                    None => {
                        break Err(Error::transport(format!(
                            "{} listener closed",
                            self.source.source_name()
                        )));
                    }
                },

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break Ok(());
                }
            }
        };

        // Release the transport before flushing
        drop(units);

        let reason = match &outcome {
            Ok(()) => "Shutdown signal".to_string(),
            Err(e) => e.to_string(),
        };
        self.emit_event(EngineEvent::Stopped { reason });

        match (outcome, self.sink.flush().await) {
            (outcome, Ok(())) => {
                info!("Sink flushed, trap listener stopped");
                outcome
            }
            (Ok(()), Err(e)) => Err(e),
            // The loop's own failure is what the caller must see
            (Err(outcome), Err(e)) => {
                error!("Failed to flush sink after listener loss: {}", e);
                Err(outcome)
            }
        }
    }

    /// Decode, extract and persist one inbound unit
    async fn handle_unit(&self, unit: InboundUnit) -> Result<()> {
        let decoded = match self.decoder.decode(&unit) {
            Ok(Some(decoded)) => decoded,
            Ok(None) => {
                debug!("Ignoring {}", unit.kind());
                self.emit_event(EngineEvent::TrapDiscarded { kind: unit.kind() });
                return Ok(());
            }
            Err(e) => {
                self.emit_event(EngineEvent::DecodeFailed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        info!("Trap received from {} at {}", decoded.host, decoded.timestamp);

        let Some(event) = extract::extract_event(&decoded) else {
            debug!(
                "[{}] Notification without interface/status ({} bindings), not stored",
                decoded.host,
                decoded.bindings.len()
            );
            self.emit_event(EngineEvent::TrapIncomplete { host: decoded.host });
            return Ok(());
        };

        match self.sink.insert_trap(&event).await {
            Ok(()) => {
                info!(
                    "Stored trap from {} for interface {}: {}",
                    event.host, event.interface, event.status
                );
                self.emit_event(EngineEvent::TrapPersisted { event });
                Ok(())
            }
            Err(e) => {
                error!("Failed to store trap from {}: {}", event.host, e);
                self.emit_event(EngineEvent::PersistFailed {
                    host: event.host,
                    error: e.to_string(),
                });
                Ok(())
            }
        }
    }

    /// Emit an engine event
    ///
    /// # Parameters
    ///
    /// - `event`: The event to emit
    fn emit_event(&self, event: EngineEvent) {
        // Nobody listening is fine; a full channel means the observer is too slow
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_event_clone() {
        let event = EngineEvent::TrapIncomplete {
            host: "10.0.0.1".to_string(),
        };

        assert_eq!(event.clone(), event);
    }
}
