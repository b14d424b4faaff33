//! Packet-capture text decoder
//!
//! Recovers ifDescr and ifAdminStatus from `tcpdump -vv` output such as:
//!
//! ```text
//! 12:00:00.1 IP 10.0.0.1.161 > 10.0.0.9.162: ... interfaces.ifTable.ifEntry.ifDescr.12="Gi0/1" interfaces.ifTable.ifEntry.ifAdminStatus.12=1
//! ```
//!
//! The host is read positionally from the capture tool's layout. That layout
//! is tool- and version-specific, so [`parse_capture_host`] is the only place
//! that knows it, and a mismatch is a decode error rather than a crash.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::extract::{IF_ADMIN_STATUS, IF_DESCR};
use crate::traits::{DecodedTrap, InboundUnit, TrapDecoder, VarBind};

/// Substring a capture line must contain to be worth decoding
pub const CAPTURE_MARKER: &str = "interfaces.ifTable.ifEntry";

static IF_DESCR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"interfaces\.ifTable\.ifEntry\.ifDescr\.(\d+)="([^"]*)""#)
        .expect("ifDescr pattern is valid")
});

static IF_ADMIN_STATUS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"interfaces\.ifTable\.ifEntry\.ifAdminStatus\.(\d+)=(\d+)")
        .expect("ifAdminStatus pattern is valid")
});

/// Index of the `<addr>.<port>` source token in a capture line
const HOST_TOKEN_INDEX: usize = 2;

/// Decoder for capture-tool text lines
#[derive(Debug, Clone, Default)]
pub struct CaptureDecoder;

impl CaptureDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Extract the two bindings this decoder understands.
    ///
    /// Returns `None` unless both patterns match.
    pub fn match_bindings(line: &str) -> Option<Vec<VarBind>> {
        let descr = IF_DESCR_PATTERN.captures(line)?;
        let status = IF_ADMIN_STATUS_PATTERN.captures(line)?;

        Some(vec![
            VarBind::new(format!("{}.{}", IF_DESCR.symbolic, &descr[1]), &descr[2]),
            VarBind::new(
                format!("{}.{}", IF_ADMIN_STATUS.symbolic, &status[1]),
                &status[2],
            ),
        ])
    }
}

/// Rebuild the sending host from a capture line.
///
/// Takes the third whitespace-delimited token (`10.0.0.1.161`) and keeps its
/// first four dot-delimited segments.
pub fn parse_capture_host(line: &str) -> Result<String> {
    let token = line.split_whitespace().nth(HOST_TOKEN_INDEX).ok_or_else(|| {
        Error::decode(format!(
            "capture line has no token at position {}",
            HOST_TOKEN_INDEX
        ))
    })?;

    let octets: Vec<&str> = token.split('.').take(4).collect();
    if octets.len() != 4 || octets.iter().any(|o| o.parse::<u8>().is_err()) {
        return Err(Error::decode(format!(
            "capture token '{}' does not start with an IPv4 address",
            token
        )));
    }

    Ok(octets.join("."))
}

impl TrapDecoder for CaptureDecoder {
    fn decode(&self, unit: &InboundUnit) -> Result<Option<DecodedTrap>> {
        let InboundUnit::CaptureLine { line } = unit else {
            return Err(Error::decode(format!(
                "capture decoder cannot handle a {}",
                unit.kind()
            )));
        };

        let Some(bindings) = Self::match_bindings(line) else {
            debug!("Capture line lacks ifDescr/ifAdminStatus, skipping");
            return Ok(None);
        };

        let host = parse_capture_host(line)?;
        let timestamp = line
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();

        Ok(Some(DecodedTrap {
            timestamp,
            host,
            bindings,
        }))
    }

    fn decoder_name(&self) -> &'static str {
        "capture"
    }
}
