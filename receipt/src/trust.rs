/*!
    Trust verification for the receipt envelope.

    Two gates, both of which must pass before the payload is decoded:

    1. Certificate chains: every embedded certificate must chain to a
       trust root — the caller's anchor when one is supplied, otherwise
       whatever self-signed roots the envelope itself embeds. A chain
       link that is bit-identical to the certificate it vouches for is
       rejected outright: a self-signed certificate masquerading as both
       root and leaf would otherwise pass name matching and its own
       signature check.
    2. The envelope signature: each signer info must resolve to an
       embedded certificate and its RSA signature must verify, over the
       signed attributes when present (with the message-digest attribute
       checked against the content), over the content bytes otherwise.
*/

use cms::cert::IssuerAndSerialNumber;
use cms::signed_data::{SignedAttributes, SignerIdentifier, SignerInfo};
use der::Encode;
use der::asn1::{ObjectIdentifier, OctetString};
use rsa::RsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use sha1::{Digest, Sha1};
use sha2::Sha256;
use signature::Verifier;
use x509_cert::Certificate;

use crate::envelope::SignedEnvelope;
use crate::error::{ReceiptError, ReceiptResult};

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const SHA_1_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
const SHA_256_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const ID_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
const ID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
const ID_MESSAGE_DIGEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");

/// Issuer chains longer than this are rejected outright.
const MAX_CHAIN_DEPTH: usize = 6;

/**
    Validate every embedded certificate against the trust anchor.

    `None` means "accept whatever self-signed roots are embedded" —
    callers wanting strict validation must always supply an anchor.
*/
pub(crate) fn verify_certificates(
    anchor: Option<&Certificate>,
    certs: &[Certificate],
) -> ReceiptResult<()> {
    if certs.is_empty() {
        return Err(ReceiptError::InvalidCertificate(
            "envelope embeds no certificates".into(),
        ));
    }

    // Candidate parents for chain building: the anchor plus the embedded set.
    let mut store: Vec<(&Certificate, Vec<u8>)> = Vec::with_capacity(certs.len() + 1);
    if let Some(root) = anchor {
        store.push((root, cert_der(root)?));
    }
    for cert in certs {
        store.push((cert, cert_der(cert)?));
    }

    let roots: Vec<Vec<u8>> = match anchor {
        Some(root) => vec![cert_der(root)?],
        None => store
            .iter()
            .filter(|(cert, _)| {
                cert.tbs_certificate.subject == cert.tbs_certificate.issuer
                    && verify_cert_signature(cert, cert).is_ok()
            })
            .map(|(_, der)| der.clone())
            .collect(),
    };
    if roots.is_empty() {
        return Err(ReceiptError::InvalidCertificate(
            "no trust anchor supplied and none embedded".into(),
        ));
    }

    for cert in certs {
        build_chain(cert, &store, &roots)?;
    }
    Ok(())
}

/// Walk issuer links from `leaf` up to a trust root.
fn build_chain(
    leaf: &Certificate,
    store: &[(&Certificate, Vec<u8>)],
    roots: &[Vec<u8>],
) -> ReceiptResult<()> {
    let mut current = leaf;
    let mut current_der = cert_der(leaf)?;

    for _ in 0..=MAX_CHAIN_DEPTH {
        // A certificate that is itself a trust root needs no further links.
        if roots.iter().any(|root| *root == current_der) {
            return Ok(());
        }

        let issuer = &current.tbs_certificate.issuer;
        let (parent, parent_der) = store
            .iter()
            .find(|(candidate, _)| {
                candidate.tbs_certificate.subject == *issuer
                    && verify_cert_signature(current, candidate).is_ok()
            })
            .ok_or_else(|| {
                ReceiptError::InvalidCertificate(format!(
                    "no issuer found for {}",
                    current.tbs_certificate.subject
                ))
            })?;

        // A certificate vouching for itself is not a chain link.
        if *parent_der == current_der {
            return Err(ReceiptError::InvalidCertificate(format!(
                "self-signed certificate {} presented as a chain link",
                current.tbs_certificate.subject
            )));
        }

        current = parent;
        current_der = parent_der.clone();
    }

    Err(ReceiptError::InvalidCertificate(format!(
        "issuer chain exceeds depth {MAX_CHAIN_DEPTH}"
    )))
}

/**
    Verify the envelope signature against the already-validated embedded
    certificates. Every signer info must verify; an envelope with none is
    rejected.
*/
pub(crate) fn verify_signature(envelope: &SignedEnvelope) -> ReceiptResult<()> {
    let signers: Vec<&SignerInfo> = envelope.signed_data.signer_infos.0.iter().collect();
    if signers.is_empty() {
        return Err(ReceiptError::InvalidSignature(
            "envelope has no signer".into(),
        ));
    }
    for signer in signers {
        verify_signer(envelope, signer)?;
    }
    Ok(())
}

fn verify_signer(envelope: &SignedEnvelope, signer: &SignerInfo) -> ReceiptResult<()> {
    let cert = find_signer_certificate(envelope, signer)?;
    let key = public_key(cert).map_err(|_| {
        ReceiptError::InvalidSignature("signer certificate has an unsupported public key".into())
    })?;

    // The signature algorithm either restates the digest
    // (sha*WithRSAEncryption) or is plain rsaEncryption, in which case
    // the digest algorithm field decides.
    let sig_alg = signer.signature_algorithm.oid;
    let digest_oid = if sig_alg == RSA_ENCRYPTION {
        signer.digest_alg.oid
    } else if sig_alg == SHA_1_WITH_RSA {
        ID_SHA1
    } else if sig_alg == SHA_256_WITH_RSA {
        ID_SHA256
    } else {
        return Err(ReceiptError::InvalidSignature(format!(
            "unsupported signature algorithm {sig_alg}"
        )));
    };

    let sig = signer.signature.as_bytes();
    match &signer.signed_attrs {
        Some(attrs) => {
            let digest = hash(digest_oid, &envelope.content).ok_or_else(|| {
                ReceiptError::InvalidSignature(format!(
                    "unsupported digest algorithm {digest_oid}"
                ))
            })?;
            let carried = message_digest_attr(attrs).ok_or_else(|| {
                ReceiptError::InvalidSignature(
                    "signed attributes carry no message-digest".into(),
                )
            })?;
            if carried != digest {
                return Err(ReceiptError::InvalidSignature(
                    "message-digest attribute does not match content".into(),
                ));
            }
            // The signature covers the attributes re-encoded under their
            // canonical SET OF tag, not the [0] tag they travel under.
            let message = attrs
                .to_der()
                .map_err(|e| ReceiptError::InvalidSignature(e.to_string()))?;
            rsa_verify(digest_oid, &key, &message, sig).map_err(|_| {
                ReceiptError::InvalidSignature(
                    "signature over signed attributes does not verify".into(),
                )
            })
        }
        None => rsa_verify(digest_oid, &key, &envelope.content, sig).map_err(|_| {
            ReceiptError::InvalidSignature("signature over content does not verify".into())
        }),
    }
}

fn find_signer_certificate<'a>(
    envelope: &'a SignedEnvelope,
    signer: &SignerInfo,
) -> ReceiptResult<&'a Certificate> {
    match &signer.sid {
        SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
            issuer,
            serial_number,
        }) => envelope
            .certificates
            .iter()
            .find(|cert| {
                cert.tbs_certificate.issuer == *issuer
                    && cert.tbs_certificate.serial_number == *serial_number
            })
            .ok_or_else(|| {
                ReceiptError::InvalidSignature("no embedded certificate matches the signer".into())
            }),
        SignerIdentifier::SubjectKeyIdentifier(_) => Err(ReceiptError::InvalidSignature(
            "subject-key-identifier signer references are not supported".into(),
        )),
    }
}

/// Check `cert`'s signature against `issuer`'s public key.
fn verify_cert_signature(cert: &Certificate, issuer: &Certificate) -> ReceiptResult<()> {
    let message = cert.tbs_certificate.to_der().map_err(invalid_cert)?;
    let sig = cert.signature.as_bytes().ok_or_else(|| {
        ReceiptError::InvalidCertificate("certificate signature is not octet-aligned".into())
    })?;
    let alg = cert.signature_algorithm.oid;
    let digest_oid = if alg == SHA_1_WITH_RSA {
        ID_SHA1
    } else if alg == SHA_256_WITH_RSA {
        ID_SHA256
    } else {
        return Err(ReceiptError::InvalidCertificate(format!(
            "unsupported signature algorithm {alg}"
        )));
    };
    let key = public_key(issuer)?;
    rsa_verify(digest_oid, &key, &message, sig).map_err(|_| {
        ReceiptError::InvalidCertificate("certificate signature verification failed".into())
    })
}

fn public_key(cert: &Certificate) -> ReceiptResult<RsaPublicKey> {
    let spki = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(invalid_cert)?;
    RsaPublicKey::from_public_key_der(&spki)
        .map_err(|e| ReceiptError::InvalidCertificate(format!("unsupported public key: {e}")))
}

/// RSA PKCS#1 v1.5 verification with the hash selected by OID.
fn rsa_verify(
    digest_oid: ObjectIdentifier,
    key: &RsaPublicKey,
    message: &[u8],
    sig: &[u8],
) -> Result<(), signature::Error> {
    let signature = Signature::try_from(sig)?;
    if digest_oid == ID_SHA1 {
        VerifyingKey::<Sha1>::new(key.clone()).verify(message, &signature)
    } else if digest_oid == ID_SHA256 {
        VerifyingKey::<Sha256>::new(key.clone()).verify(message, &signature)
    } else {
        Err(signature::Error::new())
    }
}

fn hash(digest_oid: ObjectIdentifier, data: &[u8]) -> Option<Vec<u8>> {
    if digest_oid == ID_SHA1 {
        Some(Sha1::digest(data).to_vec())
    } else if digest_oid == ID_SHA256 {
        Some(Sha256::digest(data).to_vec())
    } else {
        None
    }
}

fn message_digest_attr(attrs: &SignedAttributes) -> Option<Vec<u8>> {
    attrs
        .iter()
        .find(|attr| attr.oid == ID_MESSAGE_DIGEST)
        .and_then(|attr| attr.values.iter().next())
        .and_then(|value| value.decode_as::<OctetString>().ok())
        .map(|octets| octets.as_bytes().to_vec())
}

fn cert_der(cert: &Certificate) -> ReceiptResult<Vec<u8>> {
    cert.to_der().map_err(invalid_cert)
}

fn invalid_cert(e: der::Error) -> ReceiptError {
    ReceiptError::InvalidCertificate(e.to_string())
}
