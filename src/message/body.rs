//! PKIBody variants and their content types (RFC 4210 §5.1.2, RFC 4211).
//!
//! Field names follow the ASN.1 module exactly (`camelCase` as specified)
//! rather than being renamed to Rust convention, since they round-trip
//! through the wire codec; `#[rasn(identifier = "...")]` is not needed
//! because these types are never re-serialized under a different name.

use rasn::types::{Integer, ObjectIdentifier, OctetString, Oid};
use rasn::{AsnType, Decode, Encode};

use crate::types::Certificate;

/// `CertTemplate`, populated by the request builder (component E) from
/// caller-supplied subject/issuer/public key/extensions.
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct CertTemplate {
    /// DER-encoded Name, when the caller supplies a subject
    #[rasn(tag(explicit(5)))]
    pub subject: Option<OctetString>,
    /// DER-encoded Name of the issuer, when known
    #[rasn(tag(explicit(3)))]
    pub issuer: Option<OctetString>,
    /// DER-encoded SubjectPublicKeyInfo
    #[rasn(tag(explicit(6)))]
    pub public_key: Option<OctetString>,
    /// DER-encoded Extensions SEQUENCE
    #[rasn(tag(explicit(9)))]
    pub extensions: Option<OctetString>,
    /// Requested validity window, when `validity_days` was set
    #[rasn(tag(explicit(4)))]
    pub validity: Option<OptionalValidity>,
}

/// `OptionalValidity`, RFC 4211 §5: `notBefore`/`notAfter` carry distinct
/// tags so a template carrying both bounds round-trips unambiguously.
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct OptionalValidity {
    /// notBefore as Unix seconds
    #[rasn(tag(explicit(0)))]
    pub not_before: Option<Integer>,
    /// notAfter as Unix seconds
    #[rasn(tag(explicit(1)))]
    pub not_after: Option<Integer>,
}

/// Proof-of-possession, RFC 4211 §4.1 `ProofOfPossession` CHOICE, reduced to
/// the method tag plus an optional signature value (only `SIGNATURE` carries
/// a payload in this engine; `NONE`/`RAVERIFIED`/`ENCRCERT` are tag-only).
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
#[rasn(choice)]
pub enum ProofOfPossession {
    /// raVerified — POP already checked out of band
    #[rasn(tag(0))]
    RaVerified,
    /// signature — signature over the CertRequest using the new private key
    #[rasn(tag(1))]
    Signature(OctetString),
    /// keyEncipherment / keyAgreement proof via returned encrypted cert
    #[rasn(tag(2))]
    EncrCert,
}

/// `CertRequest`, RFC 4211 §5
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct CertRequest {
    /// Caller- or context-chosen request id, unique within the transaction
    pub cert_req_id: Integer,
    /// Populated certificate template
    pub cert_template: CertTemplate,
}

/// `CertReqMessage`, RFC 4211 §5
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct CertReqMessage {
    /// The request itself
    pub cert_req: CertRequest,
    /// Proof the requester holds the private key matching the public key
    pub popo: Option<ProofOfPossession>,
}

/// `RevDetails`, RFC 4210 §5.3.9
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct RevDetails {
    /// Template identifying the certificate to revoke (subject + serial only)
    pub cert_details: CertTemplate,
    /// CRLReason extension value; `None` omits the extension entirely
    pub revocation_reason: Option<Integer>,
}

/// `InfoTypeAndValue`, RFC 4210 §5.3.19 — used by `genm`/`genp` and in
/// `PKIHeader.generalInfo`.
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct InfoTypeAndValue {
    /// OID identifying the information type
    pub info_type: ObjectIdentifier,
    /// DER-encoded value associated with that type, if any
    pub info_value: Option<OctetString>,
}

/// `PKIStatusInfo`, RFC 4210 §5.2.3
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct PkiStatusInfo {
    /// PKIStatus wire value
    pub status: Integer,
    /// Free-text diagnostic strings
    pub status_string: Option<Vec<String>>,
    /// PKIFailureInfo BIT STRING, carried as its integer value
    pub fail_info: Option<Integer>,
}

/// `CertOrEncCert`, RFC 4210 §5.3.4 — this engine never requests encrypted
/// certificate return, so only the plain-certificate arm is modeled.
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct CertifiedKeyPair {
    /// DER-encoded issued certificate
    pub certificate: OctetString,
}

/// One `CertResponse`, RFC 4210 §5.3.4
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct CertResponse {
    /// Echoes the `certReqId` from the corresponding `CertReqMessage`
    pub cert_req_id: Integer,
    /// Disposition of the request
    pub status: PkiStatusInfo,
    /// Present when `status` grants the request
    pub certified_key_pair: Option<CertifiedKeyPair>,
}

/// `CertRepMessage`, RFC 4210 §5.3.4 — body of `ip`/`cp`/`kup`
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct CertRepMessage {
    /// CA certificates asserted as trust anchors (`ip` only, in practice)
    pub ca_pubs: Option<Vec<OctetString>>,
    /// One response per request in the corresponding `CertReqMessages`
    pub response: Vec<CertResponse>,
}

/// Status of a single revocation request, RFC 4210 §5.3.10
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct RevRepContentEntry {
    /// Disposition of the revocation request
    pub status: PkiStatusInfo,
}

/// `RevRepContent`, RFC 4210 §5.3.10 — body of `rp`
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct RevRepContent {
    /// One entry per revocation request
    pub status: Vec<RevRepContentEntry>,
}

/// `ErrorMsgContent`, RFC 4210 §5.3.21 — body of `error`
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct ErrorMsgContent {
    /// Status info describing the error
    pub pki_status_info: PkiStatusInfo,
    /// Optional vendor error code
    pub error_code: Option<Integer>,
}

/// `PollRepContent` entry, RFC 4210 §5.3.22
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct PollRepEntry {
    /// Echoes the polled `certReqId`
    pub cert_req_id: Integer,
    /// Seconds the client should wait before polling again
    pub check_after: Integer,
}

/// `CertConfirmContent` entry, RFC 4210 §5.3.18
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub struct CertStatus {
    /// Hash of the certificate being confirmed (or rejected)
    pub cert_hash: OctetString,
    /// Echoes the `certReqId`
    pub cert_req_id: Integer,
    /// Present when the client is rejecting the certificate
    pub status_info: Option<PkiStatusInfo>,
}

/// Every PKIBody variant this engine constructs or interprets. Variants the
/// engine never originates (`popdecc`, `krr`/`krp`, `ccr`/`ccp`, announcements)
/// are intentionally absent.
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
#[rasn(choice)]
pub enum PkiBody {
    /// Initialization request
    #[rasn(tag(0))]
    Ir(Vec<CertReqMessage>),
    /// Initialization response
    #[rasn(tag(1))]
    Ip(CertRepMessage),
    /// Certification request
    #[rasn(tag(2))]
    Cr(Vec<CertReqMessage>),
    /// Certification response
    #[rasn(tag(3))]
    Cp(CertRepMessage),
    /// PKCS#10-wrapped request
    #[rasn(tag(4))]
    P10cr(OctetString),
    /// Key update request
    #[rasn(tag(7))]
    Kur(Vec<CertReqMessage>),
    /// Key update response
    #[rasn(tag(8))]
    Kup(CertRepMessage),
    /// Revocation request
    #[rasn(tag(11))]
    Rr(Vec<RevDetails>),
    /// Revocation response
    #[rasn(tag(12))]
    Rp(RevRepContent),
    /// Confirmation of the PKI conf handshake (server → client, no payload)
    #[rasn(tag(19))]
    PkiConf,
    /// General message
    #[rasn(tag(21))]
    Genm(Vec<InfoTypeAndValue>),
    /// General response
    #[rasn(tag(22))]
    Genp(Vec<InfoTypeAndValue>),
    /// Error report
    #[rasn(tag(23))]
    Error(ErrorMsgContent),
    /// Certificate confirmation (client → server)
    #[rasn(tag(24))]
    CertConf(Vec<CertStatus>),
    /// Poll request
    #[rasn(tag(25))]
    PollReq(Vec<Integer>),
    /// Poll response
    #[rasn(tag(26))]
    PollRep(Vec<PollRepEntry>),
}

impl PkiBody {
    /// A short name for this variant, for diagnostics and logging
    pub fn variant_name(&self) -> &'static str {
        match self {
            PkiBody::Ir(_) => "ir",
            PkiBody::Ip(_) => "ip",
            PkiBody::Cr(_) => "cr",
            PkiBody::Cp(_) => "cp",
            PkiBody::P10cr(_) => "p10cr",
            PkiBody::Kur(_) => "kur",
            PkiBody::Kup(_) => "kup",
            PkiBody::Rr(_) => "rr",
            PkiBody::Rp(_) => "rp",
            PkiBody::PkiConf => "pkiconf",
            PkiBody::Genm(_) => "genm",
            PkiBody::Genp(_) => "genp",
            PkiBody::Error(_) => "error",
            PkiBody::CertConf(_) => "certConf",
            PkiBody::PollReq(_) => "pollReq",
            PkiBody::PollRep(_) => "pollRep",
        }
    }

    /// True for bodies the verification policy treats as acceptable to
    /// receive unprotected only when the caller opted in (error/ip/cp/rp/kup)
    pub fn is_accept_unprotected_eligible(&self) -> bool {
        matches!(
            self,
            PkiBody::Error(_) | PkiBody::Ip(_) | PkiBody::Cp(_) | PkiBody::Kup(_) | PkiBody::Rp(_)
        )
    }
}

/// Placeholder OID arc for CMP informational types not otherwise named
/// (kept narrow: only the values the request builder and genm path use).
pub mod oids {
    use super::Oid;

    /// id-it-caProtEncCert, used in `genm` round-trips for CA key exchange
    pub const CA_PROT_ENC_CERT: &Oid = Oid::const_new(&[1, 3, 6, 1, 5, 5, 7, 4, 1]);
    /// id-it-signKeyPairTypes
    pub const SIGN_KEY_PAIR_TYPES: &Oid = Oid::const_new(&[1, 3, 6, 1, 5, 5, 7, 4, 2]);
}

/// Convenience accessor kept alongside the body so callers never need to
/// reach for `rasn-pkix`'s `Certificate` type directly at this layer.
pub type WireCertificate = Certificate;
