//! Minimal ASN.1 BER reader
//!
//! Covers only what SNMP notifications need: definite-length TLVs, INTEGER,
//! OCTET STRING, OBJECT IDENTIFIER and the SNMP application types. Every
//! read is bounds-checked; running off the end of the buffer is a decode
//! error, never a panic.

use crate::error::{Error, Result};

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;
pub const TAG_IP_ADDRESS: u8 = 0x40;
pub const TAG_COUNTER32: u8 = 0x41;
pub const TAG_GAUGE32: u8 = 0x42;
pub const TAG_TIMETICKS: u8 = 0x43;
pub const TAG_COUNTER64: u8 = 0x46;
pub const TAG_NO_SUCH_OBJECT: u8 = 0x80;
pub const TAG_NO_SUCH_INSTANCE: u8 = 0x81;
pub const TAG_END_OF_MIB_VIEW: u8 = 0x82;

/// Cursor over a BER-encoded buffer
#[derive(Debug, Clone)]
pub struct BerReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BerReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Read one TLV and return its tag and contents
    pub fn read_tlv(&mut self) -> Result<(u8, &'a [u8])> {
        let tag = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::decode(format!("truncated tag at offset {}", self.pos)))?;
        let len_offset = self.pos + 1;
        let first = *self
            .data
            .get(len_offset)
            .ok_or_else(|| Error::decode(format!("truncated length at offset {}", len_offset)))?;

        let (len, header) = if first < 0x80 {
            (first as usize, 2)
        } else {
            let n = (first & 0x7f) as usize;
            if n == 0 {
                return Err(Error::decode("indefinite length is not supported"));
            }
            if n > 4 {
                return Err(Error::decode(format!("length of {} octets is too long", n)));
            }
            let bytes = self
                .data
                .get(len_offset + 1..len_offset + 1 + n)
                .ok_or_else(|| Error::decode(format!("truncated length at offset {}", len_offset)))?;
            let len = bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
            (len, 2 + n)
        };

        let start = self.pos + header;
        let contents = start
            .checked_add(len)
            .and_then(|end| self.data.get(start..end))
            .ok_or_else(|| {
                Error::decode(format!(
                    "value of {} bytes at offset {} exceeds buffer",
                    len, start
                ))
            })?;

        self.pos = start + len;
        Ok((tag, contents))
    }

    /// Read a TLV and require a specific tag
    pub fn expect(&mut self, expected: u8, what: &str) -> Result<&'a [u8]> {
        let (tag, contents) = self.read_tlv()?;
        if tag != expected {
            return Err(Error::decode(format!(
                "expected {} (tag 0x{:02x}), found tag 0x{:02x}",
                what, expected, tag
            )));
        }
        Ok(contents)
    }

    pub fn read_integer(&mut self, what: &str) -> Result<i64> {
        let contents = self.expect(TAG_INTEGER, what)?;
        decode_integer(contents)
    }

    pub fn read_octets(&mut self, what: &str) -> Result<&'a [u8]> {
        self.expect(TAG_OCTET_STRING, what)
    }

    pub fn read_oid(&mut self, what: &str) -> Result<String> {
        let contents = self.expect(TAG_OID, what)?;
        decode_oid(contents)
    }
}

/// Two's-complement INTEGER contents
pub fn decode_integer(bytes: &[u8]) -> Result<i64> {
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(Error::decode(format!("invalid INTEGER length {}", bytes.len())));
    }
    let seed: i64 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
    Ok(bytes.iter().fold(seed, |acc, b| (acc << 8) | *b as i64))
}

/// Unsigned contents of Counter32, Gauge32, TimeTicks and Counter64
pub fn decode_unsigned(bytes: &[u8]) -> Result<u64> {
    // A leading zero octet is allowed so that 0xFFFFFFFF fits in 5 bytes
    let trimmed = match bytes {
        [0, rest @ ..] if !rest.is_empty() => rest,
        other => other,
    };
    if trimmed.is_empty() || trimmed.len() > 8 {
        return Err(Error::decode(format!("invalid unsigned length {}", bytes.len())));
    }
    Ok(trimmed.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
}

/// OBJECT IDENTIFIER contents to dotted notation
pub fn decode_oid(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Err(Error::decode("empty OBJECT IDENTIFIER"));
    }

    let mut arcs: Vec<u64> = Vec::new();
    let mut value: u64 = 0;
    let mut in_progress = false;

    for &b in bytes {
        if value > (u64::MAX >> 7) {
            return Err(Error::decode("OBJECT IDENTIFIER arc overflows"));
        }
        value = (value << 7) | (b & 0x7f) as u64;
        in_progress = true;

        if b & 0x80 == 0 {
            if arcs.is_empty() {
                // First subidentifier packs the first two arcs
                let (first, second) = match value {
                    v if v < 40 => (0, v),
                    v if v < 80 => (1, v - 40),
                    v => (2, v - 80),
                };
                arcs.push(first);
                arcs.push(second);
            } else {
                arcs.push(value);
            }
            value = 0;
            in_progress = false;
        }
    }

    if in_progress {
        return Err(Error::decode("truncated OBJECT IDENTIFIER arc"));
    }

    Ok(arcs
        .iter()
        .map(|arc| arc.to_string())
        .collect::<Vec<_>>()
        .join("."))
}

/// Render a variable-binding value to text
pub fn render_value(tag: u8, contents: &[u8]) -> Result<String> {
    let rendered = match tag {
        TAG_INTEGER => decode_integer(contents)?.to_string(),
        TAG_OCTET_STRING => render_octets(contents),
        TAG_NULL => String::new(),
        TAG_OID => decode_oid(contents)?,
        TAG_IP_ADDRESS => match contents {
            [a, b, c, d] => format!("{}.{}.{}.{}", a, b, c, d),
            _ => {
                return Err(Error::decode(format!(
                    "IpAddress must be 4 bytes, got {}",
                    contents.len()
                )));
            }
        },
        TAG_COUNTER32 | TAG_GAUGE32 | TAG_TIMETICKS | TAG_COUNTER64 => {
            decode_unsigned(contents)?.to_string()
        }
        TAG_NO_SUCH_OBJECT => "noSuchObject".to_string(),
        TAG_NO_SUCH_INSTANCE => "noSuchInstance".to_string(),
        TAG_END_OF_MIB_VIEW => "endOfMibView".to_string(),
        _ => hex_string(contents),
    };
    Ok(rendered)
}

/// Printable text as-is, anything else as hex
fn render_octets(contents: &[u8]) -> String {
    match std::str::from_utf8(contents) {
        Ok(text) if !text.chars().any(|c| c.is_control() && !c.is_whitespace()) => {
            text.to_string()
        }
        _ => hex_string(contents),
    }
}

fn hex_string(contents: &[u8]) -> String {
    let mut out = String::with_capacity(2 + contents.len() * 2);
    out.push_str("0x");
    for b in contents {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_and_long_lengths() {
        let short = [0x04, 0x02, b'h', b'i'];
        let mut reader = BerReader::new(&short);
        assert_eq!(reader.read_tlv().unwrap(), (0x04, &b"hi"[..]));
        assert!(reader.is_empty());

        let mut long = vec![0x04, 0x81, 0x80];
        long.extend(std::iter::repeat_n(b'a', 0x80));
        let mut reader = BerReader::new(&long);
        let (_, contents) = reader.read_tlv().unwrap();
        assert_eq!(contents.len(), 0x80);
    }

    #[test]
    fn test_truncation_is_an_error() {
        let mut reader = BerReader::new(&[0x30, 0x10, 0x02, 0x01]);
        assert!(matches!(reader.read_tlv(), Err(Error::Decode(_))));

        let mut reader = BerReader::new(&[0x30]);
        assert!(reader.read_tlv().is_err());

        let mut reader = BerReader::new(&[0x30, 0x80, 0x00, 0x00]);
        assert!(reader.read_tlv().is_err());
    }

    #[test]
    fn test_integers() {
        assert_eq!(decode_integer(&[0x01]).unwrap(), 1);
        assert_eq!(decode_integer(&[0x00, 0x80]).unwrap(), 128);
        assert_eq!(decode_integer(&[0xff]).unwrap(), -1);
        assert!(decode_integer(&[]).is_err());
        assert_eq!(decode_unsigned(&[0x00, 0xff, 0xff, 0xff, 0xff]).unwrap(), 0xffff_ffff);
    }

    #[test]
    fn test_oids() {
        // 1.3.6.1.2.1.2.2.1.7.12
        let bytes = [0x2b, 0x06, 0x01, 0x02, 0x01, 0x02, 0x02, 0x01, 0x07, 0x0c];
        assert_eq!(decode_oid(&bytes).unwrap(), "1.3.6.1.2.1.2.2.1.7.12");

        // 1.3.6.1.4.1.9 followed by a multi-byte arc (2011 = 0x8f 0x5b)
        let bytes = [0x2b, 0x06, 0x01, 0x04, 0x01, 0x8f, 0x5b];
        assert_eq!(decode_oid(&bytes).unwrap(), "1.3.6.1.4.1.2011");

        assert!(decode_oid(&[0x2b, 0x86]).is_err());
    }

    #[test]
    fn test_render_values() {
        assert_eq!(render_value(TAG_INTEGER, &[0x02]).unwrap(), "2");
        assert_eq!(render_value(TAG_OCTET_STRING, b"Gi0/1").unwrap(), "Gi0/1");
        assert_eq!(render_value(TAG_OCTET_STRING, &[0x00, 0x1b]).unwrap(), "0x001b");
        assert_eq!(render_value(TAG_IP_ADDRESS, &[10, 0, 0, 1]).unwrap(), "10.0.0.1");
        assert_eq!(render_value(TAG_TIMETICKS, &[0x01, 0x00]).unwrap(), "256");
        assert_eq!(render_value(TAG_NO_SUCH_INSTANCE, &[]).unwrap(), "noSuchInstance");
        assert!(render_value(TAG_IP_ADDRESS, &[10, 0]).is_err());
    }
}
