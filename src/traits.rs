//! Trait definitions for the pluggable interfaces the core consumes.
//!
//! Each trait corresponds to one of the external collaborators named in
//! the component design: an ASN.1 codec, a revocation source, a transport,
//! and the confirmation callback. Concrete implementations live in the
//! matching module (`message`, `trust`, `transport`, `context`).

use async_trait::async_trait;

use crate::error::Result;
use crate::message::PkiMessage;
use crate::types::{Certificate, FailureInfo, RevocationStatus};

/// Boundary over an external ASN.1 codec (component A). No semantic checks
/// happen here — only encode/decode of the wire structure.
pub trait MessageCodec: Send + Sync {
    /// Encode a `PkiMessage` to its DER form
    fn encode(&self, message: &PkiMessage) -> Result<Vec<u8>>;

    /// Decode a DER-encoded `PkiMessage`
    fn decode(&self, bytes: &[u8]) -> Result<PkiMessage>;
}

/// Pluggable request/response carrier (component G). `timeout_secs == 0`
/// means no timeout.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `req_bytes` and block for the response, bounded by `timeout_secs`
    /// (`None` disables the per-call timeout).
    async fn send_receive(
        &self,
        req_bytes: &[u8],
        timeout_secs: Option<u64>,
    ) -> Result<Vec<u8>>;
}

/// One revocation status source, consulted by the trust validator in the
/// precedence order described in component C: stapled OCSP, then live OCSP,
/// then CRLs.
#[async_trait]
pub trait RevocationSource: Send + Sync {
    /// Look up the revocation status of `cert`, issued by `issuer`
    async fn check(&self, cert: &Certificate, issuer: &Certificate) -> RevocationStatus;
}

/// Invoked by the transaction state machine before sending `certConf`.
/// The default implementation validates the new certificate against a
/// caller-supplied trust store and accepts unconditionally if that
/// validation succeeds.
#[async_trait]
pub trait CertConfCallback: Send + Sync {
    /// Decide whether to accept the newly issued certificate. Returning
    /// `Ok(None)` sends a positive confirmation; `Ok(Some(failure_info))`
    /// sends a negative confirmation carrying that failure info.
    async fn decide(&self, new_cert: &Certificate) -> Result<Option<FailureInfo>>;
}
