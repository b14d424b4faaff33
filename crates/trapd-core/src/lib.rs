// # trapd-core
//
// Core library for the SNMP trap ingestion pipeline.
//
// ## Architecture Overview
//
// This library turns unsolicited device notifications into stored interface
// state changes:
// - **TrapSource**: Listener yielding inbound units (datagrams or capture lines)
// - **TrapDecoder**: Structured BER decoder or capture-text decoder
// - **extract**: Maps ifDescr/ifAdminStatus bindings onto a TrapEvent
// - **TrapSink**: Append-only durable storage
// - **TrapEngine**: Single-worker loop wiring the above together
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decoding and extraction are pure; I/O lives in plugin crates
// 2. **One Extractor**: Both decode paths feed the same OID-to-field mapping
// 3. **Never Crash on Input**: Malformed or irrelevant units are logged and dropped
// 4. **At-Least-Once**: Every resolved notification is written; duplicates are kept
// 5. **Library-First**: All core functionality can be used as a library

pub mod traits;
pub mod engine;
pub mod config;
pub mod decode;
pub mod error;
pub mod event;
pub mod extract;
pub mod sink;

// Re-export core types for convenience
pub use traits::{TrapSource, TrapDecoder, TrapSink, InboundUnit, DecodedTrap, VarBind};
pub use engine::{TrapEngine, EngineEvent};
pub use config::{TrapConfig, ListenerConfig, SinkConfig, EngineConfig};
pub use decode::{ProtocolDecoder, CaptureDecoder};
pub use error::{Error, Result};
pub use event::{AdminStatus, TrapEvent};
pub use sink::MemoryTrapSink;
