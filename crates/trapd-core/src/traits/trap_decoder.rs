// # Trap Decoder Trait
//
// Defines the single decode seam shared by both listener forms.
//
// ## Implementations
//
// - `ProtocolDecoder`: BER-encoded SNMPv1/v2c datagrams
// - `CaptureDecoder`: pattern matching over tcpdump text output
//
// Both produce a `DecodedTrap`, which the event extractor folds into a
// `TrapEvent`. Decoders never perform I/O.

use crate::traits::InboundUnit;

/// A variable binding rendered to text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBind {
    /// Object identifier, numeric (`1.3.6.1...`) or symbolic
    pub oid: String,
    /// Rendered value
    pub value: String,
}

impl VarBind {
    /// Create a new variable binding
    pub fn new(oid: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            value: value.into(),
        }
    }
}

/// Output of a decoder for one inbound unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTrap {
    /// When the notification was observed
    pub timestamp: String,
    /// Originating device address
    pub host: String,
    /// Variable bindings in the order they were received
    pub bindings: Vec<VarBind>,
}

/// Trait for decoder implementations
///
/// # Contract
///
/// - `Ok(Some(_))`: the unit carried a notification
/// - `Ok(None)`: the unit was deliberately ignored (community mismatch,
///   capture line without both markers); not an error
/// - `Err(Error::Decode)`: the unit was malformed
///
/// Decoding must be a pure function of the unit: decoding the same unit twice
/// yields identical output.
pub trait TrapDecoder: Send + Sync {
    /// Decode one inbound unit
    fn decode(&self, unit: &InboundUnit) -> Result<Option<DecodedTrap>, crate::Error>;

    /// Get the decoder name (for logging/debugging)
    fn decoder_name(&self) -> &'static str;
}
