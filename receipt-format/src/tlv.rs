/*!
    Minimal DER tag/length/value reader.

    The receipt payload is attacker-controlled input, so every offset is
    bounds-checked before slicing. Only the subset of DER the receipt
    grammar uses is accepted: single-byte tags and definite lengths of at
    most four length bytes. Anything else is a `MalformedStream` error,
    never a partial read.
*/

use crate::error::{FormatError, FormatResult};

pub(crate) const TAG_INTEGER: u8 = 0x02;
pub(crate) const TAG_OCTET_STRING: u8 = 0x04;
pub(crate) const TAG_UTF8_STRING: u8 = 0x0C;
pub(crate) const TAG_PRINTABLE_STRING: u8 = 0x13;
pub(crate) const TAG_IA5_STRING: u8 = 0x16;
pub(crate) const TAG_SEQUENCE: u8 = 0x30;

/**
    One decoded tag/length/value element. `value` borrows from the input.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tag: u8,
    pub value: &'a [u8],
}

impl Tlv<'_> {
    /**
        Whether the constructed bit is set (SEQUENCE, SET, ...).
    */
    pub fn constructed(&self) -> bool {
        self.tag & 0x20 != 0
    }
}

/**
    Read one DER element starting at `pos`. Returns the element and the
    offset of the first byte after it.
*/
pub fn read_tlv(data: &[u8], pos: usize) -> FormatResult<(Tlv<'_>, usize)> {
    let tag = *data.get(pos).ok_or_else(|| truncated("tag"))?;
    if tag & 0x1F == 0x1F {
        return Err(FormatError::MalformedStream(
            "multi-byte tags are not part of the receipt grammar".into(),
        ));
    }

    let len_byte = *data.get(pos + 1).ok_or_else(|| truncated("length"))?;
    let (len, header_len) = if len_byte < 0x80 {
        (len_byte as usize, 2)
    } else if len_byte == 0x80 {
        return Err(FormatError::MalformedStream(
            "indefinite length is not valid DER".into(),
        ));
    } else {
        let n = (len_byte & 0x7F) as usize;
        if n > 4 {
            return Err(FormatError::MalformedStream(format!(
                "length of length too large ({n} bytes)"
            )));
        }
        let len_bytes = data
            .get(pos + 2..pos + 2 + n)
            .ok_or_else(|| truncated("long-form length"))?;
        let mut len = 0usize;
        for &b in len_bytes {
            len = (len << 8) | b as usize;
        }
        (len, 2 + n)
    };

    let start = pos + header_len;
    let end = start.checked_add(len).ok_or_else(|| truncated("value"))?;
    let value = data.get(start..end).ok_or_else(|| {
        FormatError::MalformedStream(format!(
            "length prefix {len} exceeds {} remaining bytes",
            data.len().saturating_sub(start)
        ))
    })?;

    Ok((Tlv { tag, value }, end))
}

/// Interpret DER INTEGER content bytes as a two's-complement i64.
/// Returns `None` for empty content or more than eight bytes.
pub(crate) fn integer_value(bytes: &[u8]) -> Option<i64> {
    if bytes.is_empty() || bytes.len() > 8 {
        return None;
    }
    let mut v: i64 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
    for &b in bytes {
        v = (v << 8) | b as i64;
    }
    Some(v)
}

fn truncated(what: &str) -> FormatError {
    FormatError::MalformedStream(format!("truncated {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn short_form() {
        let data = hex!("0c03616263");
        let (tlv, next) = read_tlv(&data, 0).unwrap();
        assert_eq!(tlv.tag, TAG_UTF8_STRING);
        assert_eq!(tlv.value, b"abc");
        assert_eq!(next, 5);
    }

    #[test]
    fn long_form_two_length_bytes() {
        let mut data = vec![0x04, 0x82, 0x01, 0x00];
        data.extend(std::iter::repeat_n(0xAA, 256));
        let (tlv, next) = read_tlv(&data, 0).unwrap();
        assert_eq!(tlv.tag, TAG_OCTET_STRING);
        assert_eq!(tlv.value.len(), 256);
        assert_eq!(next, data.len());
    }

    #[test]
    fn nonzero_start_offset() {
        let data = hex!("ffff 020101");
        let (tlv, next) = read_tlv(&data, 2).unwrap();
        assert_eq!(tlv.tag, TAG_INTEGER);
        assert_eq!(tlv.value, &[0x01]);
        assert_eq!(next, 5);
    }

    #[test]
    fn length_overruns_buffer() {
        let data = hex!("0410aabb");
        let err = read_tlv(&data, 0).unwrap_err();
        assert!(matches!(err, FormatError::MalformedStream(_)));
    }

    #[test]
    fn indefinite_length_rejected() {
        let data = hex!("3080020100 0000");
        let err = read_tlv(&data, 0).unwrap_err();
        assert!(matches!(err, FormatError::MalformedStream(_)));
    }

    #[test]
    fn oversized_length_of_length_rejected() {
        let data = hex!("04850000000001");
        let err = read_tlv(&data, 0).unwrap_err();
        assert!(matches!(err, FormatError::MalformedStream(_)));
    }

    #[test]
    fn multi_byte_tag_rejected() {
        let data = hex!("1f8801 01 00");
        let err = read_tlv(&data, 0).unwrap_err();
        assert!(matches!(err, FormatError::MalformedStream(_)));
    }

    #[test]
    fn truncated_length_byte() {
        let err = read_tlv(&[0x02], 0).unwrap_err();
        assert!(matches!(err, FormatError::MalformedStream(_)));
    }

    #[test]
    fn empty_input() {
        let err = read_tlv(&[], 0).unwrap_err();
        assert!(matches!(err, FormatError::MalformedStream(_)));
    }

    #[test]
    fn integer_values() {
        assert_eq!(integer_value(&[0x00]), Some(0));
        assert_eq!(integer_value(&[0x01]), Some(1));
        assert_eq!(integer_value(&[0x06, 0xA5]), Some(1701));
        assert_eq!(integer_value(&[0xFF]), Some(-1));
        assert_eq!(integer_value(&[0x00, 0xFF]), Some(255));
        assert_eq!(
            integer_value(&[0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]),
            Some(i64::MAX)
        );
    }

    #[test]
    fn integer_out_of_range() {
        assert_eq!(integer_value(&[]), None);
        assert_eq!(integer_value(&[0x01; 9]), None);
    }
}
