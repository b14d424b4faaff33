//! Structured SNMP notification decoder
//!
//! Accepts SNMPv1 Trap-PDUs and SNMPv2c SNMPv2-Trap/InformRequest PDUs,
//! checks the community string and renders every variable binding to text.
//!
//! ```text
//! Message ::= SEQUENCE {
//!     version    INTEGER,       -- 0 = v1, 1 = v2c
//!     community  OCTET STRING,
//!     pdu        Trap-PDU (0xA4) | SNMPv2-Trap-PDU (0xA7) | InformRequest (0xA6)
//! }
//! ```

use tracing::debug;

use super::ber::{self, BerReader, TAG_SEQUENCE};
use crate::error::{Error, Result};
use crate::traits::{DecodedTrap, InboundUnit, TrapDecoder, VarBind};

/// Timestamp format stored for socket-received traps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SNMP_V1: i64 = 0;
const SNMP_V2C: i64 = 1;

const PDU_TRAP_V1: u8 = 0xa4;
const PDU_INFORM: u8 = 0xa6;
const PDU_TRAP_V2: u8 = 0xa7;

/// Decoder for BER-encoded notification datagrams
#[derive(Debug, Clone)]
pub struct ProtocolDecoder {
    community: String,
}

impl ProtocolDecoder {
    /// Create a decoder accepting a single community string
    pub fn new(community: impl Into<String>) -> Self {
        Self {
            community: community.into(),
        }
    }

    /// Parse a payload into its variable bindings.
    ///
    /// Returns `Ok(None)` when the community does not match.
    pub fn parse_payload(&self, payload: &[u8]) -> Result<Option<Vec<VarBind>>> {
        let mut outer = BerReader::new(payload);
        let message = outer.expect(TAG_SEQUENCE, "message SEQUENCE")?;

        let mut message = BerReader::new(message);
        let version = message.read_integer("version")?;
        if version != SNMP_V1 && version != SNMP_V2C {
            return Err(Error::decode(format!("unsupported SNMP version {}", version)));
        }

        let community = message.read_octets("community")?;
        if community != self.community.as_bytes() {
            debug!(
                "Discarding notification with unexpected community ({} bytes)",
                community.len()
            );
            return Ok(None);
        }

        let (pdu_tag, pdu) = message.read_tlv()?;
        let mut pdu = BerReader::new(pdu);

        match (version, pdu_tag) {
            (SNMP_V1, PDU_TRAP_V1) => {
                let enterprise = pdu.read_oid("enterprise")?;
                let _agent_addr = pdu.read_tlv()?;
                let generic = pdu.read_integer("generic-trap")?;
                let specific = pdu.read_integer("specific-trap")?;
                let _time_stamp = pdu.read_tlv()?;
                debug!(
                    "SNMPv1 trap enterprise={} generic={} specific={}",
                    enterprise, generic, specific
                );
            }
            (SNMP_V2C, PDU_TRAP_V2) | (SNMP_V2C, PDU_INFORM) => {
                let _request_id = pdu.read_integer("request-id")?;
                let _error_status = pdu.read_integer("error-status")?;
                let _error_index = pdu.read_integer("error-index")?;
            }
            (version, tag) => {
                return Err(Error::decode(format!(
                    "unsupported PDU tag 0x{:02x} for version {}",
                    tag, version
                )));
            }
        }

        let varbind_list = pdu.expect(TAG_SEQUENCE, "variable-bindings")?;
        parse_varbinds(varbind_list).map(Some)
    }
}

fn parse_varbinds(list: &[u8]) -> Result<Vec<VarBind>> {
    let mut list = BerReader::new(list);
    let mut bindings = Vec::new();

    while !list.is_empty() {
        let varbind = list.expect(TAG_SEQUENCE, "VarBind")?;
        let mut varbind = BerReader::new(varbind);
        let oid = varbind.read_oid("VarBind name")?;
        let (tag, contents) = varbind.read_tlv()?;
        let value = ber::render_value(tag, contents)?;
        bindings.push(VarBind { oid, value });
    }

    Ok(bindings)
}

impl TrapDecoder for ProtocolDecoder {
    fn decode(&self, unit: &InboundUnit) -> Result<Option<DecodedTrap>> {
        let InboundUnit::Datagram {
            payload,
            source,
            received_at,
        } = unit
        else {
            return Err(Error::decode(format!(
                "protocol decoder cannot handle a {}",
                unit.kind()
            )));
        };

        let Some(bindings) = self.parse_payload(payload)? else {
            return Ok(None);
        };

        Ok(Some(DecodedTrap {
            timestamp: received_at.format(TIMESTAMP_FORMAT).to_string(),
            host: source.ip().to_canonical().to_string(),
            bindings,
        }))
    }

    fn decoder_name(&self) -> &'static str {
        "protocol"
    }
}
