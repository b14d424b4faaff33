// # Sink Implementations
//
// In-core implementations of the TrapSink trait. The durable SQLite sink
// lives in the `trapd-sink-sqlite` crate.

pub mod memory;

pub use memory::MemoryTrapSink;
