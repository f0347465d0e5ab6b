/*!
    Installation binding check.

    The vendor computes `SHA-1(device_id || opaque_value || raw bundle-id
    value bytes)` when issuing a receipt and stores the digest inside it.
    Recomputing the digest with the caller's device identifier proves the
    receipt was issued for this installation. A mismatch is a routine
    negative outcome — a receipt copied from another device — so the
    check is a predicate, never an error.
*/

use sha1::{Digest, Sha1};

use iap_receipt_format::AppReceipt;

/**
    Binding verification against a device/installation identifier.
*/
pub trait DeviceBinding {
    /**
        Returns true only when the receipt's stored digest matches
        `SHA-1(device_id || opaque_value || raw_bundle_id)` exactly.

        `device_id` is the raw identifier bytes, e.g. the 16 binary bytes
        of the platform-assigned installation UUID.
    */
    fn verify_binding(&self, device_id: &[u8]) -> bool;
}

impl DeviceBinding for AppReceipt {
    fn verify_binding(&self, device_id: &[u8]) -> bool {
        let mut hash = Sha1::new();
        hash.update(device_id);
        hash.update(&self.opaque_value);
        hash.update(&self.raw_bundle_id);
        let digest = hash.finalize();

        // Compare against the length the receipt itself carries, so a
        // truncated stored digest fails instead of reading out of bounds.
        if digest.len() != self.sha1_hash.len() {
            return false;
        }
        digest.as_slice() == self.sha1_hash.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const DEVICE_ID: [u8; 16] = hex!("0f7c2d4a91b3485e8f6a1c0d5b9e3721");

    /// A receipt whose stored digest was computed for DEVICE_ID.
    fn bound_receipt() -> AppReceipt {
        let raw_bundle_id = {
            let mut v = vec![0x0C, 0x0F];
            v.extend_from_slice(b"com.example.app");
            v
        };
        let opaque_value = hex!("f6f0f58b39af26e2512b52ada1edcd4a").to_vec();

        let mut hash = Sha1::new();
        hash.update(DEVICE_ID);
        hash.update(&opaque_value);
        hash.update(&raw_bundle_id);

        AppReceipt {
            bundle_id: "com.example.app".into(),
            raw_bundle_id,
            opaque_value,
            sha1_hash: hash.finalize().to_vec(),
            ..AppReceipt::default()
        }
    }

    #[test]
    fn exact_match_verifies() {
        assert!(bound_receipt().verify_binding(&DEVICE_ID));
    }

    #[test]
    fn different_device_id_fails() {
        let mut other = DEVICE_ID;
        other[0] ^= 0x01;
        assert!(!bound_receipt().verify_binding(&other));
    }

    #[test]
    fn any_flipped_digest_byte_fails() {
        let receipt = bound_receipt();
        for i in 0..receipt.sha1_hash.len() {
            let mut tampered = receipt.clone();
            tampered.sha1_hash[i] ^= 0x80;
            assert!(!tampered.verify_binding(&DEVICE_ID), "byte {i}");
        }
    }

    #[test]
    fn truncated_stored_digest_fails_safely() {
        let mut receipt = bound_receipt();
        receipt.sha1_hash.truncate(8);
        assert!(!receipt.verify_binding(&DEVICE_ID));
    }

    #[test]
    fn oversized_stored_digest_fails() {
        let mut receipt = bound_receipt();
        receipt.sha1_hash.push(0x00);
        assert!(!receipt.verify_binding(&DEVICE_ID));
    }

    #[test]
    fn empty_stored_digest_fails() {
        let mut receipt = bound_receipt();
        receipt.sha1_hash.clear();
        assert!(!receipt.verify_binding(&DEVICE_ID));
    }

    #[test]
    fn binding_covers_raw_bundle_id_not_decoded_string() {
        // Same decoded string, different raw bytes (IA5 vs UTF8 tag):
        // the digest must change because it covers the raw bytes.
        let receipt = bound_receipt();
        let mut altered = receipt.clone();
        altered.raw_bundle_id[0] = 0x16;
        assert_eq!(altered.bundle_id, receipt.bundle_id);
        assert!(!altered.verify_binding(&DEVICE_ID));
    }
}
