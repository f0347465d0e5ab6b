use thiserror::Error;

/**
    Errors from decoding the receipt's binary attribute grammar.

    All of these are fatal: a payload that does not conform never yields a
    partial receipt.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    // ── Attribute stream framing ──────────────────────────────────────
    #[error("malformed attribute stream: {0}")]
    MalformedStream(String),

    // ── Scalar values ─────────────────────────────────────────────────
    #[error("invalid scalar encoding: {0}")]
    InvalidScalar(String),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

impl FormatError {
    /// Prefix the failing attribute type code into the message. Diagnostics
    /// only; the classification is unchanged.
    pub(crate) fn at_attribute(self, code: i64) -> Self {
        match self {
            Self::MalformedStream(m) => Self::MalformedStream(format!("attribute {code}: {m}")),
            Self::InvalidScalar(m) => Self::InvalidScalar(format!("attribute {code}: {m}")),
            Self::InvalidTimestamp(m) => Self::InvalidTimestamp(format!("attribute {code}: {m}")),
        }
    }
}

/**
    Type alias for results that may return a [`FormatError`].
*/
pub type FormatResult<T> = std::result::Result<T, FormatError>;
