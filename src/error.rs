//! Error types for the CMP client engine

use thiserror::Error;

/// Result type alias for CMP operations
pub type Result<T> = std::result::Result<T, CmpError>;

/// Main error type for the CMP client
#[derive(Error, Debug)]
pub enum CmpError {
    /// Missing or invalid option combination, unknown digest, malformed address, etc.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unreadable key/cert/secret, or a key/cert mismatch
    #[error("credential error: {0}")]
    Credential(String),

    /// Neither a shared secret nor (certificate, key) is present and unprotected
    /// send was not requested
    #[error("no protection credentials available")]
    NoProtectionCredentials,

    /// Transport-layer failure: connect/timeout/HTTP-status/truncation
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Malformed DER or unknown PKIBody variant
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Response transactionID does not match the request's
    #[error("unrelated response: transaction id mismatch")]
    Unrelated,

    /// Response recipientNonce does not match our last senderNonce
    #[error("nonce mismatch")]
    NonceMismatch,

    /// Response sender DN does not match the expected sender
    #[error("sender mismatch: expected {expected}, got {got}")]
    SenderMismatch {
        /// Expected sender distinguished name
        expected: String,
        /// Sender distinguished name observed on the response
        got: String,
    },

    /// Message claimed protected but protection does not verify, or is
    /// missing when required
    #[error("bad protection")]
    BadProtection,

    /// Message arrived unprotected and the context did not opt into accepting
    /// unprotected messages of that kind
    #[error("unexpected unprotected message")]
    UnexpectedUnprotected,

    /// Protection algorithm on the message does not match what the context expects
    #[error("protection algorithm mismatch")]
    AlgMismatch,

    /// Signature protection could not be verified because no candidate sender
    /// certificate could be located
    #[error("no sender certificate available for signature verification")]
    NoSenderCert,

    /// Signer certificate's KeyUsage does not permit digitalSignature
    #[error("signer certificate key usage forbids digital signature")]
    KeyUsageForbidden,

    /// Adding a SAN extension conflicts with an existing SAN already present
    /// in caller-supplied extensions
    #[error("subjectAltName supplied both via extensions and explicit SAN options")]
    SanConflict,

    /// Certificate chain could not be built to a trust anchor
    #[error("no trust anchor for certificate chain")]
    NoTrustAnchor,

    /// Certificate chain built but a certificate in it is outside its validity period
    #[error("certificate expired or not yet valid")]
    Expired,

    /// A certificate in the chain was found to be revoked
    #[error("certificate revoked: {0:?}")]
    Revoked(crate::types::RevocationReason),

    /// No enabled revocation source could establish status for a certificate
    /// on the chain
    #[error("revocation status could not be determined")]
    RevocationUnknown,

    /// The CA/RA rejected the request
    #[error("request rejected: status={status:?} failure_info={failure_info:?} {status_string:?}")]
    Rejected {
        /// PKIStatus reported by the server
        status: crate::types::PkiStatus,
        /// PKIFailureInfo bits reported by the server, if any
        failure_info: Option<crate::types::FailureInfo>,
        /// Free-text status strings reported by the server
        status_string: Vec<String>,
    },

    /// Response carried a status/body combination the state machine does not
    /// recognize as success, rejection, or waiting
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Overall transaction deadline (`totaltimeout`) elapsed
    #[error("transaction timed out")]
    Timeout,

    /// Caller-signalled cancellation was observed at a suspension point
    #[error("transaction cancelled")]
    Cancelled,

    /// `certConf` was requested a second time within one transaction
    #[error("certConf already sent for this transaction")]
    DuplicateCertConf,

    /// I/O error reading/writing a certificate, key, or config file
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// PEM parsing error
    #[error("PEM error: {0}")]
    Pem(#[from] pem::PemError),

    /// TLS error
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// RSA error
    #[error("RSA error: {0}")]
    Rsa(#[from] rsa::Error),

    /// Ed25519 error
    #[error("Ed25519 error: {0}")]
    Ed25519(#[from] ed25519_dalek::SignatureError),

    /// Configuration (de)serialization error
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors local to the protection engine (component B), converted into
/// [`CmpError`] at the point protection results cross into the transaction
/// state machine.
#[derive(Error, Debug)]
pub enum ProtectionError {
    /// See [`CmpError::NoProtectionCredentials`]
    #[error("no protection credentials available")]
    NoCredentials,
    /// See [`CmpError::BadProtection`]
    #[error("bad protection")]
    BadProtection,
    /// See [`CmpError::UnexpectedUnprotected`]
    #[error("unexpected unprotected message")]
    UnexpectedUnprotected,
    /// See [`CmpError::AlgMismatch`]
    #[error("protection algorithm mismatch")]
    AlgMismatch,
    /// See [`CmpError::NoSenderCert`]
    #[error("no sender certificate available")]
    NoSenderCert,
    /// See [`CmpError::KeyUsageForbidden`]
    #[error("key usage forbids digital signature")]
    KeyUsageForbidden,
}

impl From<ProtectionError> for CmpError {
    fn from(e: ProtectionError) -> Self {
        match e {
            ProtectionError::NoCredentials => CmpError::NoProtectionCredentials,
            ProtectionError::BadProtection => CmpError::BadProtection,
            ProtectionError::UnexpectedUnprotected => CmpError::UnexpectedUnprotected,
            ProtectionError::AlgMismatch => CmpError::AlgMismatch,
            ProtectionError::NoSenderCert => CmpError::NoSenderCert,
            ProtectionError::KeyUsageForbidden => CmpError::KeyUsageForbidden,
        }
    }
}

/// Errors local to the trust & chain validator (component C)
#[derive(Error, Debug)]
pub enum TrustError {
    /// See [`CmpError::NoTrustAnchor`]
    #[error("no trust anchor")]
    NoTrustAnchor,
    /// See [`CmpError::Expired`]
    #[error("expired")]
    Expired,
    /// See [`CmpError::Revoked`]
    #[error("revoked: {0:?}")]
    Revoked(crate::types::RevocationReason),
    /// See [`CmpError::RevocationUnknown`]
    #[error("revocation unknown")]
    RevocationUnknown,
    /// Underlying x509-parser validation failure
    #[error("x509 validation error: {0}")]
    X509(String),
}

impl From<TrustError> for CmpError {
    fn from(e: TrustError) -> Self {
        match e {
            TrustError::NoTrustAnchor => CmpError::NoTrustAnchor,
            TrustError::Expired => CmpError::Expired,
            TrustError::Revoked(r) => CmpError::Revoked(r),
            TrustError::RevocationUnknown => CmpError::RevocationUnknown,
            TrustError::X509(s) => CmpError::Credential(s),
        }
    }
}

/// Transport-layer errors (component G)
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection could not be established
    #[error("connect failed: {0}")]
    Connect(String),
    /// Per-message timeout elapsed
    #[error("timed out waiting for response")]
    Timeout,
    /// Server replied with a non-success HTTP status
    #[error("unexpected HTTP status: {0}")]
    HttpStatus(u16),
    /// Response body was truncated or otherwise malformed in transit
    #[error("truncated response")]
    Truncated,
    /// TLS-through-proxy was requested, which is not supported
    #[error("TLS through proxy is not supported")]
    TlsViaProxyUnsupported,
    /// File-replay transport could not read/write its backing files
    #[error("file replay io error: {0}")]
    FileReplay(String),
}

/// Errors from the ASN.1/DER codec boundary (component A)
#[derive(Error, Debug)]
pub enum CodecError {
    /// Message could not be decoded into a PKIMessage
    #[error("malformed message: {0}")]
    MalformedMessage(String),
    /// PKIBody tag did not match any known variant
    #[error("unknown body type: {0}")]
    UnknownBodyType(u32),
    /// Encoding a constructed message failed
    #[error("encode error: {0}")]
    Encode(String),
}

/// Configuration load/save/validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure reading or writing the config file
    #[error("IO error: {0}")]
    IoError(String),
    /// TOML parse failure
    #[error("parse error: {0}")]
    ParseError(String),
    /// TOML serialize failure
    #[error("serialize error: {0}")]
    SerializeError(String),
    /// Semantically invalid configuration (failed `validate`)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
