//! Core traits for the trap pipeline
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`TrapSource`]: Receive inbound units (datagrams or capture lines)
//! - [`TrapDecoder`]: Turn one inbound unit into variable bindings
//! - [`TrapSink`]: Durable storage for normalized trap events

pub mod trap_source;
pub mod trap_decoder;
pub mod trap_sink;

pub use trap_source::{TrapSource, InboundUnit, InboundStream};
pub use trap_decoder::{TrapDecoder, DecodedTrap, VarBind};
pub use trap_sink::TrapSink;
