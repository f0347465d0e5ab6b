/*!
    Attribute stream decoder.

    A receipt payload is one constructed DER element (a SET) wrapping a
    run of attribute records, each:

    ```text
    SEQUENCE {
        INTEGER       type,
        INTEGER       version,
        OCTET STRING  value
    }
    ```

    The same shape appears one level deeper for in-app purchase records,
    whose OCTET STRING value wraps another attribute stream. This module
    knows nothing about what the type codes mean; field mapping lives in
    `receipt`.
*/

use crate::error::{FormatError, FormatResult};
use crate::tlv::{self, read_tlv};

/**
    One `(type, version, value)` record from the stream.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub attr_type: i64,
    pub version: i64,
    /// Opaque value bytes; themselves DER for scalar attributes.
    pub value: &'a [u8],
}

/**
    Iterator over the attributes of one stream, in stream order.

    Yields `Err` once on the first malformed record and then fuses; a
    broken stream never produces further records.
*/
#[derive(Debug, Clone)]
pub struct AttributeReader<'a> {
    data: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> AttributeReader<'a> {
    /**
        Unwrap the outer constructed element of a receipt payload (or of a
        nested in-app value) and iterate the attribute records inside it.
    */
    pub fn from_payload(payload: &'a [u8]) -> FormatResult<Self> {
        let (outer, _) = read_tlv(payload, 0)?;
        if !outer.constructed() {
            return Err(FormatError::MalformedStream(format!(
                "expected constructed outer element, found tag {:#04x}",
                outer.tag
            )));
        }
        Ok(Self {
            data: outer.value,
            pos: 0,
            failed: false,
        })
    }

    fn read_attribute(&mut self) -> FormatResult<Attribute<'a>> {
        let (record, next) = read_tlv(self.data, self.pos)?;
        if record.tag != tlv::TAG_SEQUENCE {
            return Err(FormatError::MalformedStream(format!(
                "attribute record must be a SEQUENCE, found tag {:#04x}",
                record.tag
            )));
        }

        let (ty, after_ty) = read_tlv(record.value, 0)?;
        let attr_type = require_integer(ty, "attribute type")?;
        let (ver, after_ver) = read_tlv(record.value, after_ty)?;
        let version = require_integer(ver, "attribute version")?;

        let (val, end) = read_tlv(record.value, after_ver)?;
        if val.tag != tlv::TAG_OCTET_STRING {
            return Err(FormatError::MalformedStream(format!(
                "attribute value must be an OCTET STRING, found tag {:#04x}",
                val.tag
            )));
        }
        if end != record.value.len() {
            return Err(FormatError::MalformedStream(
                "trailing bytes inside attribute record".into(),
            ));
        }

        self.pos = next;
        Ok(Attribute {
            attr_type,
            version,
            value: val.value,
        })
    }
}

impl<'a> Iterator for AttributeReader<'a> {
    type Item = FormatResult<Attribute<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.data.len() {
            return None;
        }
        let result = self.read_attribute();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

fn require_integer(elem: tlv::Tlv<'_>, what: &str) -> FormatResult<i64> {
    if elem.tag != tlv::TAG_INTEGER {
        return Err(FormatError::MalformedStream(format!(
            "{what} must be an INTEGER, found tag {:#04x}",
            elem.tag
        )));
    }
    tlv::integer_value(elem.value)
        .ok_or_else(|| FormatError::MalformedStream(format!("{what} out of range")))
}
