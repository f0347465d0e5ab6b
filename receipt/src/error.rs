use thiserror::Error;

use iap_receipt_format::FormatError;

/**
    Classified failures of receipt verification and decoding.

    Every variant is fatal: nothing here is transient, and no partial
    receipt is ever returned. The installation binding check is the one
    negative outcome reported as a plain `bool` instead (see
    [`crate::DeviceBinding`]).
*/
#[derive(Debug, Clone, Error)]
pub enum ReceiptError {
    // ── Envelope ──────────────────────────────────────────────────────
    #[error("malformed signed-data envelope: {0}")]
    Envelope(String),

    // ── Trust ─────────────────────────────────────────────────────────
    #[error("invalid certificate in receipt: {0}")]
    InvalidCertificate(String),
    #[error("invalid signature of receipt: {0}")]
    InvalidSignature(String),

    // ── Payload decoding (delegated to iap-receipt-format) ────────────
    #[error(transparent)]
    Format(#[from] FormatError),
}

/**
    Type alias for results that may return a [`ReceiptError`].
*/
pub type ReceiptResult<T> = std::result::Result<T, ReceiptError>;
