//! Trust & chain validator (component C): builds and verifies X.509 chains
//! against a trust store, consulting revocation sources in the precedence
//! order described in the component design.

pub mod revocation;

use std::time::SystemTime;

use tracing::{debug, warn};
use x509_parser::prelude::*;

use crate::error::{CmpError, Result, TrustError};
use crate::protection::signature::VerifyingKey;
use crate::types::{Certificate, RevocationStatus};

pub use revocation::{RevocationDispatcher, RevocationPolicy};

/// Dotted-string OID for RSA encryption (rsaEncryption)
const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
/// Dotted-string OID for id-ecPublicKey
const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
/// Dotted-string OID for id-Ed25519
const OID_ED25519: &str = "1.3.101.112";

/// A certificate chain validator: trust store plus untrusted intermediates,
/// with an attached revocation dispatcher.
pub struct ChainValidator {
    /// Self-signed roots trusted as anchors
    trust_store: Vec<Certificate>,
    /// Intermediates supplied out of band (not necessarily trusted)
    untrusted: Vec<Certificate>,
    /// Revocation checking policy and sources
    revocation: RevocationDispatcher,
    /// Disables hostname matching and revocation checking; set only on the
    /// nested trust store used to verify an OCSP responder's own chain, to
    /// avoid infinite recursion.
    in_ocsp_validation: bool,
}

impl ChainValidator {
    /// Build a validator from a trust store and a pool of untrusted
    /// intermediates, with revocation checking configured per `revocation`.
    pub fn new(
        trust_store: Vec<Certificate>,
        untrusted: Vec<Certificate>,
        revocation: RevocationDispatcher,
    ) -> Self {
        Self {
            trust_store,
            untrusted,
            revocation,
            in_ocsp_validation: false,
        }
    }

    /// A copy of this validator suitable for verifying an OCSP responder's
    /// own certificate chain: revocation checking and hostname matching are
    /// disabled to avoid recursing into another OCSP lookup.
    pub fn for_ocsp_responder_chain(&self) -> Self {
        Self {
            trust_store: self.trust_store.clone(),
            untrusted: self.untrusted.clone(),
            revocation: RevocationDispatcher::disabled(),
            in_ocsp_validation: true,
        }
    }

    /// Validate `leaf` at `verification_time`, building a chain through
    /// `self.untrusted` to an anchor in `self.trust_store`.
    pub async fn validate(
        &self,
        leaf: &Certificate,
        verification_time: SystemTime,
    ) -> Result<()> {
        let chain = self.build_chain(leaf)?;

        for (cert, issuer) in chain.iter().zip(chain.iter().skip(1).chain(chain.last())) {
            check_validity_period(cert, verification_time)?;

            if !self.in_ocsp_validation && !is_self_signed(cert) {
                match self.revocation.check(cert, issuer).await {
                    RevocationStatus::Good => {}
                    RevocationStatus::Revoked(reason) => {
                        warn!(?reason, "certificate revoked");
                        return Err(TrustError::Revoked(reason).into());
                    }
                    RevocationStatus::Inconclusive => {
                        if self.revocation.any_source_enabled() {
                            return Err(TrustError::RevocationUnknown.into());
                        }
                    }
                }
            }
        }

        debug!(chain_len = chain.len(), "chain validated");
        Ok(())
    }

    /// Build an ordered chain leaf→root, pulling intermediates from
    /// `untrusted` and terminating at a certificate present in `trust_store`.
    fn build_chain(&self, leaf: &Certificate) -> Result<Vec<Certificate>> {
        let mut chain = vec![leaf.clone()];
        let mut current = leaf.clone();

        loop {
            if self.trust_store.iter().any(|a| a.der() == current.der()) {
                return Ok(chain);
            }

            let (_, parsed) = parse_der(&current)?;
            let issuer_dn = parsed.issuer().as_raw();

            let next = self
                .untrusted
                .iter()
                .chain(self.trust_store.iter())
                .find(|candidate| {
                    candidate.der() != current.der()
                        && parse_der(candidate)
                            .map(|(_, c)| c.subject().as_raw() == issuer_dn)
                            .unwrap_or(false)
                });

            match next {
                Some(issuer) if self.trust_store.iter().any(|a| a.der() == issuer.der()) => {
                    chain.push(issuer.clone());
                    return Ok(chain);
                }
                Some(issuer) => {
                    chain.push(issuer.clone());
                    current = issuer.clone();
                }
                None => return Err(TrustError::NoTrustAnchor.into()),
            }
        }
    }
}

fn parse_der(cert: &Certificate) -> Result<(&[u8], X509Certificate<'_>)> {
    parse_x509_certificate(cert.der())
        .map_err(|e| CmpError::from(TrustError::X509(e.to_string())))
}

fn check_validity_period(cert: &Certificate, at: SystemTime) -> Result<()> {
    let (_, parsed) = parse_der(cert)?;
    let at = ASN1Time::from(::time::OffsetDateTime::from(at));
    if !parsed.validity().is_valid_at(at) {
        return Err(TrustError::Expired.into());
    }
    Ok(())
}

fn is_self_signed(cert: &Certificate) -> bool {
    match parse_der(cert) {
        Ok((_, parsed)) => parsed.subject().as_raw() == parsed.issuer().as_raw(),
        Err(_) => false,
    }
}

/// True if `cert`'s KeyUsage extension (when present) includes
/// `digitalSignature`. A certificate with no KeyUsage extension is treated
/// as permitting it (no restriction stated).
pub fn has_digital_signature_usage(cert: &Certificate) -> bool {
    let Ok((_, parsed)) = parse_der(cert) else {
        return false;
    };
    match parsed.key_usage() {
        Ok(Some(ku)) => ku.value.digital_signature(),
        _ => true,
    }
}

/// The subject distinguished name of a certificate: raw DER bytes for
/// equality and an RFC 4514-ish display string for diagnostics.
pub fn subject_dn(cert: &Certificate) -> Option<crate::types::Dn> {
    let (_, parsed) = parse_der(cert).ok()?;
    let subject = parsed.subject();
    Some(crate::types::Dn::new(subject.as_raw().to_vec(), subject.to_string()))
}

/// Extract the subjectKeyIdentifier extension value, if present.
pub fn subject_key_identifier(cert: &Certificate) -> Option<Vec<u8>> {
    let (_, parsed) = parse_der(cert).ok()?;
    parsed
        .get_extension_unique(&x509_parser::oid_registry::OID_X509_EXT_SUBJECT_KEY_IDENTIFIER)
        .ok()
        .flatten()
        .map(|ext| ext.value.to_vec())
}

/// Extract a [`VerifyingKey`] from a certificate's SubjectPublicKeyInfo.
pub fn extract_verifying_key(cert: &Certificate) -> Option<VerifyingKey> {
    let (_, parsed) = parse_der(cert).ok()?;
    let spki = parsed.public_key();
    let alg = spki.algorithm.algorithm.to_id_string();
    let raw = spki.subject_public_key.data.as_ref();

    if alg == OID_RSA_ENCRYPTION {
        use rsa::pkcs8::DecodePublicKey;
        let key = rsa::RsaPublicKey::from_public_key_der(spki.raw).ok()?;
        Some(VerifyingKey::Rsa(Box::new(key)))
    } else if alg == OID_EC_PUBLIC_KEY {
        let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(raw).ok()?;
        Some(VerifyingKey::P256(Box::new(key)))
    } else if alg == OID_ED25519 {
        let bytes: [u8; 32] = raw.try_into().ok()?;
        let key = ed25519_dalek::VerifyingKey::from_bytes(&bytes).ok()?;
        Some(VerifyingKey::Ed25519(Box::new(key)))
    } else {
        None
    }
}
