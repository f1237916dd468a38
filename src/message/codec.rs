//! `rasn`-backed implementation of [`crate::traits::MessageCodec`].

use rasn::AsnType;

use crate::error::{CmpError, CodecError, Result};
use super::{PkiBody, PkiHeader, PkiMessage};

/// Internal pair used only to compute the protected portion of a message —
/// `header || body`, DER-encoded as the two-field SEQUENCE PBMAC1/signature
/// protection is defined over.
#[derive(AsnType, rasn::Decode, rasn::Encode)]
struct ProtectedPortion {
    header: PkiHeader,
    body: PkiBody,
}

pub(crate) fn encode_protected_portion(header: &PkiHeader, body: &PkiBody) -> Result<Vec<u8>> {
    let portion = ProtectedPortion {
        header: header.clone(),
        body: body.clone(),
    };
    rasn::der::encode(&portion)
        .map_err(|e| CmpError::Codec(CodecError::Encode(e.to_string())))
}

/// Default codec: DER encode/decode via `rasn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasnCodec;

impl crate::traits::MessageCodec for RasnCodec {
    fn encode(&self, message: &PkiMessage) -> Result<Vec<u8>> {
        rasn::der::encode(message).map_err(|e| CmpError::Codec(CodecError::Encode(e.to_string())))
    }

    fn decode(&self, bytes: &[u8]) -> Result<PkiMessage> {
        rasn::der::decode(bytes)
            .map_err(|e| CmpError::Codec(CodecError::MalformedMessage(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::body::{CertReqMessage, CertRequest, CertTemplate};
    use crate::types::{Nonce, TransactionId};
    use rasn::types::Integer;

    fn sample_header() -> PkiHeader {
        let txn = TransactionId::new();
        let nonce = Nonce::new();
        PkiHeader {
            pvno: Integer::from(2),
            sender: rasn::types::OctetString::from_static(b"sender"),
            recipient: rasn::types::OctetString::from_static(b"recipient"),
            message_time: None,
            protection_alg: None,
            sender_kid: None,
            recip_kid: None,
            transaction_id: Some(rasn::types::OctetString::copy_from_slice(txn.as_bytes())),
            sender_nonce: Some(rasn::types::OctetString::copy_from_slice(nonce.as_bytes())),
            recip_nonce: None,
            free_text: None,
            general_info: None,
        }
    }

    fn sample_body() -> PkiBody {
        PkiBody::Ir(vec![CertReqMessage {
            cert_req: CertRequest {
                cert_req_id: Integer::from(0),
                cert_template: CertTemplate {
                    subject: None,
                    issuer: None,
                    public_key: None,
                    extensions: None,
                    validity: None,
                },
            },
            popo: None,
        }])
    }

    #[test]
    fn encode_decode_round_trips() {
        let codec = RasnCodec;
        let message = PkiMessage {
            header: sample_header(),
            body: sample_body(),
            protection: None,
            extra_certs: None,
        };
        let bytes = codec.encode(&message).expect("encode");
        let decoded = codec.decode(&bytes).expect("decode");
        assert_eq!(decoded.header.transaction_id, message.header.transaction_id);
        assert_eq!(decoded.body.variant_name(), "ir");
    }

    #[test]
    fn decode_garbage_is_malformed_message() {
        let codec = RasnCodec;
        let err = codec.decode(&[0xff, 0x00, 0x01]).unwrap_err();
        assert!(matches!(err, CmpError::Codec(CodecError::MalformedMessage(_))));
    }
}
