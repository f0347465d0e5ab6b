/*!
    Scalar codec for attribute values.

    Each attribute's opaque value is itself a single DER element: an
    INTEGER for counts and identifiers, a string type for text, and a
    string holding an RFC 3339 date for timestamps. An empty timestamp
    string means "absent" and decodes to `None` — it is not an error and
    not an epoch instant.
*/

use chrono::{DateTime, Utc};

use crate::error::{FormatError, FormatResult};
use crate::tlv::{self, read_tlv};

/**
    Decode a DER INTEGER out of an attribute value.
*/
pub fn decode_int(bytes: &[u8]) -> FormatResult<i64> {
    let (elem, _) = read_tlv(bytes, 0).map_err(as_scalar_error)?;
    if elem.tag != tlv::TAG_INTEGER {
        return Err(FormatError::InvalidScalar(format!(
            "expected INTEGER, found tag {:#04x}",
            elem.tag
        )));
    }
    tlv::integer_value(elem.value).ok_or_else(|| {
        FormatError::InvalidScalar(format!(
            "INTEGER content of {} bytes out of range",
            elem.value.len()
        ))
    })
}

/**
    Decode a DER string (UTF8String, IA5String or PrintableString) out of
    an attribute value.
*/
pub fn decode_string(bytes: &[u8]) -> FormatResult<String> {
    let (elem, _) = read_tlv(bytes, 0).map_err(as_scalar_error)?;
    match elem.tag {
        tlv::TAG_UTF8_STRING => std::str::from_utf8(elem.value)
            .map(str::to_owned)
            .map_err(|e| FormatError::InvalidScalar(format!("invalid UTF8String: {e}"))),
        tlv::TAG_IA5_STRING | tlv::TAG_PRINTABLE_STRING => {
            if !elem.value.is_ascii() {
                return Err(FormatError::InvalidScalar(
                    "non-ASCII byte in IA5String/PrintableString".into(),
                ));
            }
            std::str::from_utf8(elem.value)
                .map(str::to_owned)
                .map_err(|e| FormatError::InvalidScalar(e.to_string()))
        }
        other => Err(FormatError::InvalidScalar(format!(
            "tag {other:#04x} is not a string type"
        ))),
    }
}

/**
    Decode a timestamp attribute value.

    The value is a string; an empty string yields `Ok(None)` ("absent"),
    anything else must parse as strict RFC 3339 with timezone.
*/
pub fn decode_timestamp(bytes: &[u8]) -> FormatResult<Option<DateTime<Utc>>> {
    let text = decode_string(bytes)?;
    if text.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(&text)
        .map(|instant| Some(instant.with_timezone(&Utc)))
        .map_err(|e| FormatError::InvalidTimestamp(format!("{text:?}: {e}")))
}

// Framing errors inside a scalar value are scalar errors to the caller:
// the stream-level record was well-formed, its payload was not.
fn as_scalar_error(e: FormatError) -> FormatError {
    match e {
        FormatError::MalformedStream(m) => FormatError::InvalidScalar(m),
        other => other,
    }
}
