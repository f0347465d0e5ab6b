/*!
    CMS signed-data envelope unwrapping.

    Extracts the embedded certificate set and the enclosed content bytes.
    No trust decisions happen here: anything that prevents extraction is
    `ReceiptError::Envelope`, which is a malformed-input failure, not a
    trust failure.
*/

use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::SignedData;
use der::Decode;
use der::asn1::{ObjectIdentifier, OctetString};
use x509_cert::Certificate;

use crate::error::{ReceiptError, ReceiptResult};

const ID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");

/**
    A parsed envelope: the embedded certificates, the signer infos (still
    inside `signed_data`) and the enclosed payload bytes.
*/
pub(crate) struct SignedEnvelope {
    pub signed_data: SignedData,
    pub certificates: Vec<Certificate>,
    pub content: Vec<u8>,
}

pub(crate) fn unwrap(data: &[u8]) -> ReceiptResult<SignedEnvelope> {
    let info = ContentInfo::from_der(data).map_err(envelope_err)?;
    if info.content_type != ID_SIGNED_DATA {
        return Err(ReceiptError::Envelope(format!(
            "content type {} is not id-signedData",
            info.content_type
        )));
    }
    let signed_data: SignedData = info.content.decode_as().map_err(envelope_err)?;

    let certificates = match &signed_data.certificates {
        Some(set) => set
            .0
            .iter()
            .filter_map(|choice| match choice {
                CertificateChoices::Certificate(cert) => Some(cert.clone()),
                _ => None,
            })
            .collect(),
        None => Vec::new(),
    };

    let econtent = signed_data
        .encap_content_info
        .econtent
        .as_ref()
        .ok_or_else(|| ReceiptError::Envelope("envelope carries no content".into()))?;
    let content = econtent
        .decode_as::<OctetString>()
        .map_err(envelope_err)?
        .as_bytes()
        .to_vec();

    Ok(SignedEnvelope {
        signed_data,
        certificates,
        content,
    })
}

fn envelope_err(e: der::Error) -> ReceiptError {
    ReceiptError::Envelope(e.to_string())
}
