//! Core value types shared across the CMP client engine

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A CMP transaction identifier: 128 random bits, constant for the life of
/// one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub [u8; 16]);

impl TransactionId {
    /// Allocate a fresh transaction id from 128 random bits
    pub fn new() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// View the raw bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A sender or recipient nonce: fresh 128 random bits per outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nonce(pub [u8; 16]);

impl Nonce {
    /// Allocate a fresh nonce from 128 random bits
    pub fn new() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// View the raw bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl Default for Nonce {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A distinguished name, carried as its DER encoding plus a display-friendly
/// string form derived from it. Equality compares the DER bytes.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Dn {
    /// DER encoding of the Name as it appeared on the wire or was built
    pub der: Vec<u8>,
    /// Human-readable rendering (RFC 4514-ish), for diagnostics only
    pub display: String,
}

impl Dn {
    /// Build a `Dn` from raw DER bytes and a precomputed display string
    pub fn new(der: Vec<u8>, display: String) -> Self {
        Self { der, display }
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display)
    }
}

/// Which CMP command a request builder is assembling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpCommand {
    /// Initialization request (`ir`)
    Ir,
    /// Certification request (`cr`)
    Cr,
    /// Key update request (`kur`)
    Kur,
    /// PKCS#10 wrapped request (`p10cr`)
    P10cr,
    /// Revocation request (`rr`)
    Rr,
    /// General message (`genm`)
    Genm,
}

/// Proof-of-possession method for an enrollment request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PopoMethod {
    /// `raVerified` — POP already checked out of band; value 3 on the wire
    RaVerified,
    /// No proof supplied; value 0 on the wire
    None,
    /// Sign the CertRequest with the new private key; value 1 on the wire
    Signature,
    /// Proof via encrypted certificate return; value 2 on the wire
    EncrCert,
}

impl PopoMethod {
    /// CMP wire value for this method (RFC 4211 `ProofOfPossession` CHOICE tag)
    pub fn wire_value(self) -> i32 {
        match self {
            PopoMethod::None => 0,
            PopoMethod::Signature => 1,
            PopoMethod::EncrCert => 2,
            PopoMethod::RaVerified => 3,
        }
    }
}

impl Default for PopoMethod {
    /// Default POPO method is `SIGNATURE`, per the historical CLI default.
    fn default() -> Self {
        PopoMethod::Signature
    }
}

/// PKIStatus values from PKIStatusInfo (RFC 4210 §5.2.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PkiStatus {
    /// Request granted exactly as submitted
    Accepted,
    /// Request granted, but with modifications the client should check
    GrantedWithMods,
    /// Request rejected
    Rejection,
    /// Revocation request acknowledged with a warning
    RevocationWarning,
    /// Revocation performed
    RevocationNotification,
    /// Key update granted but with a warning
    KeyUpdateWarning,
    /// CA/RA needs more time; poll again
    Waiting,
    /// Confirmation received by the server
    Revocation,
}

impl PkiStatus {
    /// Decode from the integer PKIStatus value on the wire
    pub fn from_wire(v: i32) -> Option<Self> {
        Some(match v {
            0 => PkiStatus::Accepted,
            1 => PkiStatus::GrantedWithMods,
            2 => PkiStatus::Rejection,
            3 => PkiStatus::Waiting,
            4 => PkiStatus::RevocationWarning,
            5 => PkiStatus::RevocationNotification,
            6 => PkiStatus::KeyUpdateWarning,
            _ => return None,
        })
    }

    /// True for statuses the response interpreter treats as success
    pub fn is_success(self) -> bool {
        matches!(self, PkiStatus::Accepted | PkiStatus::GrantedWithMods)
    }

    /// True for statuses that cause the transaction to fail
    pub fn is_rejection(self) -> bool {
        matches!(self, PkiStatus::Rejection)
    }
}

/// PKIFailureInfo bitmask (RFC 4210 §5.2.3), represented as a BIT STRING
/// converted to a plain `u32` mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo(pub u32);

impl FailureInfo {
    /// badAlg
    pub const BAD_ALG: u32 = 1 << 0;
    /// badMessageCheck
    pub const BAD_MESSAGE_CHECK: u32 = 1 << 1;
    /// badRequest
    pub const BAD_REQUEST: u32 = 1 << 2;
    /// badTime
    pub const BAD_TIME: u32 = 1 << 3;
    /// badCertId
    pub const BAD_CERT_ID: u32 = 1 << 4;
    /// badDataFormat
    pub const BAD_DATA_FORMAT: u32 = 1 << 5;
    /// wrongAuthority
    pub const WRONG_AUTHORITY: u32 = 1 << 6;
    /// incorrectData
    pub const INCORRECT_DATA: u32 = 1 << 7;
    /// missingTimeStamp
    pub const MISSING_TIME_STAMP: u32 = 1 << 8;
    /// badPOP
    pub const BAD_POP: u32 = 1 << 9;
    /// timeNotAvailable
    pub const TIME_NOT_AVAILABLE: u32 = 1 << 16;
    /// unacceptedPolicy
    pub const UNACCEPTED_POLICY: u32 = 1 << 17;
    /// unacceptedExtension
    pub const UNACCEPTED_EXTENSION: u32 = 1 << 18;
    /// addInfoNotAvailable
    pub const ADD_INFO_NOT_AVAILABLE: u32 = 1 << 19;
    /// badSenderNonce
    pub const BAD_SENDER_NONCE: u32 = 1 << 20;
    /// badRecipientNonce
    pub const BAD_RECIPIENT_NONCE: u32 = 1 << 21;
    /// wrongIntegrity
    pub const WRONG_INTEGRITY: u32 = 1 << 22;
    /// certRevoked
    pub const CERT_REVOKED: u32 = 1 << 23;
    /// certConfirmed
    pub const CERT_CONFIRMED: u32 = 1 << 24;
    /// wrongPKIMessage
    pub const WRONG_PKI_MESSAGE: u32 = 1 << 25;
    /// certRevocationNotified
    pub const CERT_REVOCATION_NOTIFIED: u32 = 1 << 26;
    /// unsupportedVersion
    pub const UNSUPPORTED_VERSION: u32 = 1 << 27;
    /// notAuthorized
    pub const NOT_AUTHORIZED: u32 = 1 << 28;
    /// systemUnavail
    pub const SYSTEM_UNAVAIL: u32 = 1 << 29;
    /// systemFailure
    pub const SYSTEM_FAILURE: u32 = 1 << 30;
    /// duplicateCertReq
    pub const DUPLICATE_CERT_REQ: u32 = 1 << 31;

    /// True if any bit in `mask` is set
    pub fn contains(self, mask: u32) -> bool {
        self.0 & mask != 0
    }
}

/// Revocation reason codes, RFC 5280 §5.3.1. `None` on the Rust side means
/// the `rr` request omits the reason extension entirely (the historical
/// CLI's `-1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevocationReason {
    /// unspecified (0)
    Unspecified,
    /// keyCompromise (1)
    KeyCompromise,
    /// cACompromise (2)
    CaCompromise,
    /// affiliationChanged (3)
    AffiliationChanged,
    /// superseded (4)
    Superseded,
    /// cessationOfOperation (5)
    CessationOfOperation,
    /// certificateHold (6)
    CertificateHold,
    /// removeFromCRL (8)
    RemoveFromCrl,
    /// privilegeWithdrawn (9)
    PrivilegeWithdrawn,
    /// aACompromise (10)
    AaCompromise,
}

impl RevocationReason {
    /// CRLReason wire value (note: 7 is intentionally unused per RFC 5280)
    pub fn wire_value(self) -> i32 {
        match self {
            RevocationReason::Unspecified => 0,
            RevocationReason::KeyCompromise => 1,
            RevocationReason::CaCompromise => 2,
            RevocationReason::AffiliationChanged => 3,
            RevocationReason::Superseded => 4,
            RevocationReason::CessationOfOperation => 5,
            RevocationReason::CertificateHold => 6,
            RevocationReason::RemoveFromCrl => 8,
            RevocationReason::PrivilegeWithdrawn => 9,
            RevocationReason::AaCompromise => 10,
        }
    }

    /// Decode a CRLReason wire value
    pub fn from_wire(v: i32) -> Option<Self> {
        Some(match v {
            0 => RevocationReason::Unspecified,
            1 => RevocationReason::KeyCompromise,
            2 => RevocationReason::CaCompromise,
            3 => RevocationReason::AffiliationChanged,
            4 => RevocationReason::Superseded,
            5 => RevocationReason::CessationOfOperation,
            6 => RevocationReason::CertificateHold,
            8 => RevocationReason::RemoveFromCrl,
            9 => RevocationReason::PrivilegeWithdrawn,
            10 => RevocationReason::AaCompromise,
            _ => return None,
        })
    }
}

/// Revocation status of a single certificate on a chain, as reported by a
/// revocation source (stapled OCSP, live OCSP, or CRL)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationStatus {
    /// Source affirmatively vouches the certificate is not revoked
    Good,
    /// Source reports the certificate revoked, with reason
    Revoked(RevocationReason),
    /// Source could not determine status (unreachable, no data, expired CRL)
    Inconclusive,
}

/// Input certificate/key file format, detected from extension with PEM/DER
/// fallback (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateFormat {
    /// PEM encoded (`.pem`, `.crt`)
    Pem,
    /// DER encoded (`.cer`, `.der`, `.crl`)
    Der,
    /// PKCS#12/PFX (`.p12`)
    Pkcs12,
}

impl CertificateFormat {
    /// Guess a format from a file extension, per §6's detection rules
    pub fn from_extension(path: &str) -> Option<Self> {
        let ext = path.rsplit('.').next()?.to_ascii_lowercase();
        Some(match ext.as_str() {
            "pem" | "crt" => CertificateFormat::Pem,
            "cer" | "der" | "crl" => CertificateFormat::Der,
            "p12" | "pfx" => CertificateFormat::Pkcs12,
            _ => return None,
        })
    }

    /// The other PEM/DER format, tried as a fallback when the first parse fails
    pub fn fallback(self) -> Option<Self> {
        match self {
            CertificateFormat::Pem => Some(CertificateFormat::Der),
            CertificateFormat::Der => Some(CertificateFormat::Pem),
            CertificateFormat::Pkcs12 => None,
        }
    }
}

/// Digest algorithm selectable for signature protection and POPO signing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256 (default)
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl Default for DigestAlgorithm {
    fn default() -> Self {
        DigestAlgorithm::Sha256
    }
}

/// A raw X.509 certificate, carried as its DER encoding. Parsing into
/// structured fields is done on demand via `x509-parser` at the trust
/// boundary (component C) rather than held as a live borrow here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate(pub Vec<u8>);

impl Certificate {
    /// Wrap raw DER bytes
    pub fn from_der(der: Vec<u8>) -> Self {
        Self(der)
    }

    /// Access the DER encoding
    pub fn der(&self) -> &[u8] {
        &self.0
    }
}

/// The artifact the caller owns after a successful enrollment transaction
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    /// The newly issued certificate
    pub certificate: Certificate,
    /// Extra certificates the server attached (chain material)
    pub extra_certs: Vec<Certificate>,
    /// CA certificates the server asserts as trust anchors (`ir` responses only)
    pub ca_pubs: Vec<Certificate>,
}
