/*!
    Receipt data model and attribute-to-field mapping.

    Two flat dispatch tables, one per nesting level, map attribute type
    codes onto field decoders. A code missing from its table is skipped —
    the vendor adds codes over time and unknown ones must never fail the
    decode. A code appearing twice overwrites its field (last wins),
    except the in-app record code which appends one purchase per
    occurrence.

    Top-level codes: 2 bundle-id, 3 application-version, 4 opaque-value,
    5 stored SHA-1 digest, 17 in-app purchase, 19 original-application-
    version, 21 receipt-expiration-date.

    In-app codes: 1701 quantity, 1702 product-id, 1703 transaction-id,
    1704 purchase-date, 1705 original-transaction-id, 1706 original-
    purchase-date, 1708 expires-date, 1711 web-order-line-item-id,
    1712 cancellation-date.
*/

use chrono::{DateTime, Utc};

use crate::attr::AttributeReader;
use crate::error::FormatResult;
use crate::scalar;

/**
    One in-app purchase transaction from the receipt.

    Timestamps are `None` when the receipt does not carry them; only
    subscription purchases have an expiration date, and only refunded
    purchases a cancellation date.
*/
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InAppPurchase {
    /// Number of items purchased (code 1701).
    pub quantity: i64,
    /// Product identifier of the purchased item (code 1702).
    pub product_id: String,
    /// Transaction identifier (code 1703).
    pub transaction_id: String,
    /// Purchase date (code 1704).
    pub purchase_date: Option<DateTime<Utc>>,
    /// Transaction identifier of the original purchase (code 1705).
    pub original_transaction_id: String,
    /// Date of the original purchase (code 1706).
    pub original_purchase_date: Option<DateTime<Utc>>,
    /// Subscription expiration date (code 1708), subscriptions only.
    pub expires_date: Option<DateTime<Utc>>,
    /// Web order line item identifier (code 1711), 0 when absent.
    pub web_order_line_item_id: i64,
    /// Refund date (code 1712), refunded purchases only.
    pub cancellation_date: Option<DateTime<Utc>>,
}

/**
    The decoded app receipt.

    `raw_bundle_id` keeps the exact DER value bytes of the bundle-id
    attribute: the installation binding digest is computed over those
    bytes, and re-encoding the decoded string is not guaranteed to be
    byte-identical.
*/
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppReceipt {
    /// Decoded bundle identifier (code 2).
    pub bundle_id: String,
    /// Undecoded value bytes of the bundle-id attribute.
    pub raw_bundle_id: Vec<u8>,
    /// Application version the receipt was issued for (code 3).
    pub application_version: String,
    /// Vendor-defined opaque bytes, input to the binding check (code 4).
    pub opaque_value: Vec<u8>,
    /// Stored binding digest (code 5), 20 bytes in the SHA-1 scheme.
    pub sha1_hash: Vec<u8>,
    /// In-app purchases, in order of appearance (code 17, additive).
    pub in_app: Vec<InAppPurchase>,
    /// Version of the first installed build (code 19); empty when unknown.
    pub original_application_version: String,
    /// Receipt expiration date (code 21), subscription receipts only.
    pub expiration_date: Option<DateTime<Utc>>,
}

type AppField = (i64, fn(&mut AppReceipt, &[u8]) -> FormatResult<()>);
type InAppField = (i64, fn(&mut InAppPurchase, &[u8]) -> FormatResult<()>);

const APP_FIELDS: &[AppField] = &[
    (2, |r, v| {
        r.bundle_id = scalar::decode_string(v)?;
        r.raw_bundle_id = v.to_vec();
        Ok(())
    }),
    (3, |r, v| {
        r.application_version = scalar::decode_string(v)?;
        Ok(())
    }),
    (4, |r, v| {
        r.opaque_value = v.to_vec();
        Ok(())
    }),
    (5, |r, v| {
        r.sha1_hash = v.to_vec();
        Ok(())
    }),
    (17, |r, v| {
        r.in_app.push(InAppPurchase::from_attributes(v)?);
        Ok(())
    }),
    (19, |r, v| {
        r.original_application_version = scalar::decode_string(v)?;
        Ok(())
    }),
    (21, |r, v| {
        r.expiration_date = scalar::decode_timestamp(v)?;
        Ok(())
    }),
];

const IN_APP_FIELDS: &[InAppField] = &[
    (1701, |p, v| {
        p.quantity = scalar::decode_int(v)?;
        Ok(())
    }),
    (1702, |p, v| {
        p.product_id = scalar::decode_string(v)?;
        Ok(())
    }),
    (1703, |p, v| {
        p.transaction_id = scalar::decode_string(v)?;
        Ok(())
    }),
    (1704, |p, v| {
        p.purchase_date = scalar::decode_timestamp(v)?;
        Ok(())
    }),
    (1705, |p, v| {
        p.original_transaction_id = scalar::decode_string(v)?;
        Ok(())
    }),
    (1706, |p, v| {
        p.original_purchase_date = scalar::decode_timestamp(v)?;
        Ok(())
    }),
    (1708, |p, v| {
        p.expires_date = scalar::decode_timestamp(v)?;
        Ok(())
    }),
    (1711, |p, v| {
        p.web_order_line_item_id = scalar::decode_int(v)?;
        Ok(())
    }),
    (1712, |p, v| {
        p.cancellation_date = scalar::decode_timestamp(v)?;
        Ok(())
    }),
];

impl AppReceipt {
    /**
        Decode the signed payload's attribute stream into a receipt.

        Unknown attribute codes are skipped. Any malformed record or
        scalar aborts the whole decode — there are no partial receipts.
    */
    pub fn from_payload(payload: &[u8]) -> FormatResult<Self> {
        let mut receipt = Self::default();
        for attr in AttributeReader::from_payload(payload)? {
            let attr = attr?;
            if let Some((_, decode)) = APP_FIELDS.iter().find(|(code, _)| *code == attr.attr_type)
            {
                decode(&mut receipt, attr.value).map_err(|e| e.at_attribute(attr.attr_type))?;
            }
        }
        Ok(receipt)
    }
}

impl InAppPurchase {
    /// Decode one in-app record from the value bytes of a type-17
    /// attribute. The value wraps its own attribute stream one level down.
    fn from_attributes(value: &[u8]) -> FormatResult<Self> {
        let mut purchase = Self::default();
        for attr in AttributeReader::from_payload(value)? {
            let attr = attr?;
            if let Some((_, decode)) =
                IN_APP_FIELDS.iter().find(|(code, _)| *code == attr.attr_type)
            {
                decode(&mut purchase, attr.value).map_err(|e| e.at_attribute(attr.attr_type))?;
            }
        }
        Ok(purchase)
    }
}
