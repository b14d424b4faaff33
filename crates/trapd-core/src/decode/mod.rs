// # Decoders
//
// The two decode strategies behind the `TrapDecoder` seam. Which one runs is
// decided by the listener form in the configuration.

pub mod ber;
pub mod capture;
pub mod protocol;

pub use capture::{CaptureDecoder, parse_capture_host};
pub use protocol::ProtocolDecoder;

use crate::config::{ListenerConfig, TrapConfig};
use crate::traits::TrapDecoder;

/// Build the decoder matching the configured listener form
pub fn for_config(config: &TrapConfig) -> Box<dyn TrapDecoder> {
    match &config.listener {
        ListenerConfig::Socket { .. } => Box::new(ProtocolDecoder::new(config.community.clone())),
        ListenerConfig::Capture { .. } => Box::new(CaptureDecoder::new()),
    }
}
