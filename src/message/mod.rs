//! PKIMessage construction and the ASN.1 codec boundary (component A).
//!
//! This module is a thin structural layer: it knows the shape of a
//! PKIMessage and how to get header fields in and out, but performs no
//! semantic checks (nonce freshness, protection validity, status
//! interpretation all live in their own components).

pub mod body;
pub mod codec;

use rasn::types::{Integer, ObjectIdentifier, OctetString};
use rasn::{AsnType, Decode, Encode};

use crate::types::{Nonce, TransactionId};

pub use body::{
    CertRepMessage, CertReqMessage, CertRequest, CertResponse, CertStatus, CertTemplate,
    CertifiedKeyPair, ErrorMsgContent, InfoTypeAndValue, PkiBody, PkiStatusInfo, PollRepEntry,
    ProofOfPossession, RevDetails, RevRepContent, RevRepContentEntry,
};

/// `AlgorithmIdentifier`, RFC 5280 §4.1.1.2, reduced to what protection
/// needs: the algorithm OID plus its DER-encoded parameters.
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct AlgorithmIdentifier {
    /// Algorithm OID (e.g. PBMAC1, or an RSA/ECDSA signature algorithm)
    pub algorithm: ObjectIdentifier,
    /// DER-encoded ASN.1 parameters, algorithm-specific
    pub parameters: Option<OctetString>,
}

/// `PKIHeader`, RFC 4210 §5.1.1.
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct PkiHeader {
    /// Protocol version; always 2 for CMPv2
    pub pvno: Integer,
    /// DER-encoded GeneralName of the sender
    pub sender: OctetString,
    /// DER-encoded GeneralName of the recipient
    pub recipient: OctetString,
    /// Present when signature protection is used
    #[rasn(tag(explicit(0)))]
    pub message_time: Option<Integer>,
    /// Protection algorithm, set by the protection engine
    #[rasn(tag(explicit(1)))]
    pub protection_alg: Option<AlgorithmIdentifier>,
    /// Sender key identifier (reference value or subjectKeyIdentifier)
    #[rasn(tag(explicit(2)))]
    pub sender_kid: Option<OctetString>,
    /// Recipient key identifier, rarely used by clients
    #[rasn(tag(explicit(3)))]
    pub recip_kid: Option<OctetString>,
    /// Transaction identifier, constant for the life of the transaction
    #[rasn(tag(explicit(4)))]
    pub transaction_id: Option<OctetString>,
    /// Fresh nonce for this outbound message
    #[rasn(tag(explicit(5)))]
    pub sender_nonce: Option<OctetString>,
    /// Echo of the peer's last sender nonce
    #[rasn(tag(explicit(6)))]
    pub recip_nonce: Option<OctetString>,
    /// Free-text diagnostic strings
    #[rasn(tag(explicit(7)))]
    pub free_text: Option<Vec<String>>,
    /// Caller-supplied general info ITAVs (e.g. implicitConfirm request)
    #[rasn(tag(explicit(8)))]
    pub general_info: Option<Vec<InfoTypeAndValue>>,
}

impl PkiHeader {
    /// Read the transaction id out of the header, if present
    pub fn transaction_id(&self) -> Option<TransactionId> {
        let bytes = self.transaction_id.as_ref()?;
        let arr: [u8; 16] = bytes.as_ref().try_into().ok()?;
        Some(TransactionId(arr))
    }

    /// Read the sender nonce out of the header, if present
    pub fn sender_nonce(&self) -> Option<Nonce> {
        let bytes = self.sender_nonce.as_ref()?;
        let arr: [u8; 16] = bytes.as_ref().try_into().ok()?;
        Some(Nonce(arr))
    }

    /// Read the recipient nonce out of the header, if present
    pub fn recip_nonce(&self) -> Option<Nonce> {
        let bytes = self.recip_nonce.as_ref()?;
        let arr: [u8; 16] = bytes.as_ref().try_into().ok()?;
        Some(Nonce(arr))
    }
}

/// `PKIMessage`, RFC 4210 §5.1.
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct PkiMessage {
    /// Message header
    pub header: PkiHeader,
    /// Message body (exactly one of the CMP operations)
    pub body: PkiBody,
    /// MAC or signature over the DER encoding of `header || body`
    #[rasn(tag(0))]
    pub protection: Option<rasn::types::BitString>,
    /// Additional certificates the sender attaches (chain material)
    #[rasn(tag(1))]
    pub extra_certs: Option<Vec<OctetString>>,
}

impl PkiMessage {
    /// The DER encoding of `header || body` — the "protected portion" that
    /// PBMAC1 and signature protection are computed over.
    pub fn protected_portion(&self) -> crate::error::Result<Vec<u8>> {
        codec::encode_protected_portion(&self.header, &self.body)
    }
}
