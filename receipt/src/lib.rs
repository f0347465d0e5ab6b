/*!
    Local App Store receipt validation.

    Validates the signed-data envelope of an app-store receipt against a
    caller-supplied trust anchor and decodes the purchase facts it
    asserts, entirely offline. The flow is trust-first: the certificate
    chain and envelope signature are checked before a single payload
    field is decoded, so decoded fields are only ever produced from
    verified bytes.

    ```no_run
    use iap_receipt::{Certificate, DeviceBinding, parse};
    # fn load_anchor() -> Certificate { unimplemented!() }
    # fn main() -> Result<(), iap_receipt::ReceiptError> {
    let anchor = load_anchor();
    let der = std::fs::read("receipt").unwrap();

    let receipt = parse(&der, Some(&anchor))?;
    assert_eq!(receipt.bundle_id, "com.example.app");
    let owned_here = receipt.verify_binding(b"\x0f\x7c\x2d\x4a\x91\xb3\x48\x5e");
    # let _ = owned_here; Ok(())
    # }
    ```
*/

mod binding;
mod envelope;
mod error;
mod trust;

pub use self::binding::DeviceBinding;
pub use self::error::{ReceiptError, ReceiptResult};

// Re-export the decoded model and the trust-anchor type callers hand in.
pub use iap_receipt_format::{AppReceipt, FormatError, InAppPurchase};
pub use x509_cert::Certificate;

/**
    Validate and decode a DER-encoded receipt.

    `anchor` is the trust root the embedded certificate chains must
    terminate at. Passing `None` accepts whatever self-signed roots the
    envelope itself embeds — callers wanting strict validation must
    always supply one.

    The payload is decoded only after the certificate chains and the
    envelope signature have both been verified; any failure aborts with
    the classified [`ReceiptError`] of the first failing stage.
*/
pub fn parse(data: &[u8], anchor: Option<&Certificate>) -> ReceiptResult<AppReceipt> {
    let envelope = envelope::unwrap(data)?;
    trust::verify_certificates(anchor, &envelope.certificates)?;
    trust::verify_signature(&envelope)?;
    Ok(AppReceipt::from_payload(&envelope.content)?)
}

/**
    Validate and decode a base64-encoded receipt, the form the platform
    stores on disk. Bad base64 is reported as an envelope error.
*/
pub fn parse_base64(data: &str, anchor: Option<&Certificate>) -> ReceiptResult<AppReceipt> {
    let bytes = data_encoding::BASE64
        .decode(data.trim().as_bytes())
        .map_err(|e| ReceiptError::Envelope(format!("invalid base64: {e}")))?;
    parse(&bytes, anchor)
}
