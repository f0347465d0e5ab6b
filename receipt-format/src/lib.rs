/*!
    Binary receipt format: the attribute stream grammar and the decoded
    receipt data model.

    This crate is pure decoding — no cryptography, no trust decisions.
    Envelope unwrapping, chain validation and the installation binding
    check live in the `iap-receipt` crate, which feeds this one the
    verified payload bytes.
*/

mod attr;
mod error;
mod receipt;
mod scalar;
mod tlv;

pub use self::attr::{Attribute, AttributeReader};
pub use self::error::{FormatError, FormatResult};
pub use self::receipt::{AppReceipt, InAppPurchase};
pub use self::scalar::{decode_int, decode_string, decode_timestamp};
pub use self::tlv::{Tlv, read_tlv};

/// DER byte builders shared by the test modules.
#[cfg(test)]
pub(crate) mod testenc {
    pub fn tlv(tag: u8, value: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        let len = value.len();
        if len < 0x80 {
            out.push(len as u8);
        } else {
            let bytes = len.to_be_bytes();
            let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
            out.push(0x80 | (bytes.len() - first) as u8);
            out.extend_from_slice(&bytes[first..]);
        }
        out.extend_from_slice(value);
        out
    }

    /// Minimal two's-complement DER INTEGER.
    pub fn integer(v: i64) -> Vec<u8> {
        let bytes = v.to_be_bytes();
        let mut start = 0;
        while start < bytes.len() - 1 {
            let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
                || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
            if !redundant {
                break;
            }
            start += 1;
        }
        tlv(0x02, &bytes[start..])
    }

    pub fn utf8(s: &str) -> Vec<u8> {
        tlv(0x0C, s.as_bytes())
    }

    pub fn ia5(s: &str) -> Vec<u8> {
        tlv(0x16, s.as_bytes())
    }

    /// One attribute record: SEQUENCE { type, version, OCTET STRING value }.
    pub fn attribute(attr_type: i64, version: i64, value: &[u8]) -> Vec<u8> {
        let mut body = integer(attr_type);
        body.extend_from_slice(&integer(version));
        body.extend_from_slice(&tlv(0x04, value));
        tlv(0x30, &body)
    }

    /// A whole attribute stream: SET wrapping the concatenated records.
    pub fn payload(attrs: &[Vec<u8>]) -> Vec<u8> {
        tlv(0x31, &attrs.concat())
    }
}
