//! Protection engine (component B): apply and verify PBMAC1 or signature
//! protection on a PKIMessage.

pub mod credentials;
pub mod pbmac;
pub mod signature;

use tracing::{debug, warn};

use crate::context::CmpContext;
use crate::error::{CmpError, ProtectionError, Result};
use crate::message::{AlgorithmIdentifier, PkiMessage};
use crate::types::Certificate;

use credentials::Credentials;

/// OID for id-PBMAC1 (RFC 9044)
const OID_PBMAC1: &[u32] = &[1, 2, 840, 113549, 1, 5, 14];
/// OID for sha256WithRSAEncryption
const OID_SHA256_WITH_RSA: &[u32] = &[1, 2, 840, 113549, 1, 1, 11];
/// OID for ecdsa-with-SHA256
const OID_ECDSA_WITH_SHA256: &[u32] = &[1, 2, 840, 10045, 4, 3, 2];
/// OID for id-Ed25519
const OID_ED25519: &[u32] = &[1, 3, 101, 112];

/// Applies and verifies message protection against a [`CmpContext`]'s
/// credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtectionEngine;

impl ProtectionEngine {
    /// Set `protectionAlg`, `senderKID`, and `protection` on `message`.
    ///
    /// Fails with [`CmpError::NoProtectionCredentials`] when the context has
    /// neither a shared secret nor a (certificate, key) pair and the caller
    /// did not opt into unprotected send.
    pub fn apply(&self, message: &mut PkiMessage, ctx: &CmpContext) -> Result<()> {
        match ctx.credentials() {
            Some(Credentials::Pbmac(cred)) => {
                let params = pbmac::Pbmac1Params::generate();
                message.header.sender_kid =
                    Some(rasn::types::OctetString::copy_from_slice(&cred.reference_value));
                message.header.protection_alg = Some(AlgorithmIdentifier {
                    algorithm: rasn::types::ObjectIdentifier::new(OID_PBMAC1.to_vec())
                        .expect("valid OID"),
                    parameters: Some(encode_pbmac1_params(&params)),
                });
                let protected_portion = message.protected_portion()?;
                let tag = pbmac::compute_mac(cred, &params, &protected_portion)?;
                message.protection = Some(rasn::types::BitString::from_vec(tag));
                debug!(transaction_id = %ctx.transaction_id(), "applied PBMAC1 protection");
                Ok(())
            }
            Some(Credentials::Signature(cred)) => {
                let digest = ctx.digest_algorithm();
                message.header.sender_kid = subject_key_identifier(&cred.certificate);
                message.header.protection_alg = Some(AlgorithmIdentifier {
                    algorithm: rasn::types::ObjectIdentifier::new(
                        signature_oid(&cred.private_key).to_vec(),
                    )
                    .expect("valid OID"),
                    parameters: None,
                });
                let protected_portion = message.protected_portion()?;
                let sig = signature::sign(&cred.private_key, digest, &protected_portion)?;
                message.protection = Some(rasn::types::BitString::from_vec(sig));
                debug!(transaction_id = %ctx.transaction_id(), "applied signature protection");
                Ok(())
            }
            None => {
                if ctx.unprotected_send() {
                    warn!(transaction_id = %ctx.transaction_id(), "sending unprotected message");
                    Ok(())
                } else {
                    Err(CmpError::from(ProtectionError::NoCredentials))
                }
            }
        }
    }

    /// Verify `message`'s protection.
    ///
    /// `validated_sender_cert`, when present, is a certificate the caller has
    /// already chain-validated (e.g. a pinned `srvCert`); otherwise the
    /// engine selects a candidate from `extraCerts ∪ untrustedCerts` and
    /// validates it itself.
    pub fn verify(
        &self,
        message: &PkiMessage,
        ctx: &CmpContext,
        validated_sender_cert: Option<&Certificate>,
    ) -> Result<()> {
        let Some(protection) = &message.protection else {
            return self.verify_unprotected(message, ctx);
        };
        let tag = protection.clone().into_vec();
        let protected_portion = message.protected_portion()?;

        match ctx.credentials() {
            Some(Credentials::Pbmac(cred)) => {
                let Some(alg) = &message.header.protection_alg else {
                    return Err(CmpError::from(ProtectionError::AlgMismatch));
                };
                let params = decode_pbmac1_params(alg)?;
                pbmac::verify_mac(cred, &params, &protected_portion, &tag)
            }
            Some(Credentials::Signature(_)) | None => {
                let sender_cert = match validated_sender_cert {
                    Some(cert) => cert,
                    None => ctx
                        .locate_sender_candidate(message)
                        .ok_or_else(|| CmpError::from(ProtectionError::NoSenderCert))?,
                };

                if !ctx.ignore_keyusage() && !crate::trust::has_digital_signature_usage(sender_cert)
                {
                    return Err(CmpError::from(ProtectionError::KeyUsageForbidden));
                }

                if let Some(expected) = ctx.expected_sender() {
                    let got = crate::trust::subject_dn(sender_cert);
                    if got.as_ref() != Some(expected) {
                        return Err(CmpError::SenderMismatch {
                            expected: expected.display.clone(),
                            got: got.map(|dn| dn.display).unwrap_or_else(|| "<unparseable>".to_string()),
                        });
                    }
                }

                let verifying_key = crate::trust::extract_verifying_key(sender_cert)
                    .ok_or_else(|| CmpError::from(ProtectionError::NoSenderCert))?;
                signature::verify(
                    &verifying_key,
                    ctx.digest_algorithm(),
                    &protected_portion,
                    &tag,
                )
            }
        }
    }

    fn verify_unprotected(&self, message: &PkiMessage, ctx: &CmpContext) -> Result<()> {
        if message.body.is_accept_unprotected_eligible() && ctx.accept_unprotected_errors() {
            warn!(
                transaction_id = %ctx.transaction_id(),
                body = message.body.variant_name(),
                "accepting unprotected response per configuration"
            );
            Ok(())
        } else {
            Err(CmpError::from(ProtectionError::UnexpectedUnprotected))
        }
    }
}

fn subject_key_identifier(cert: &Certificate) -> Option<rasn::types::OctetString> {
    crate::trust::subject_key_identifier(cert).map(|v| rasn::types::OctetString::copy_from_slice(&v))
}

fn signature_oid(key: &credentials::SigningKey) -> &'static [u32] {
    match key {
        credentials::SigningKey::Rsa(_) => OID_SHA256_WITH_RSA,
        credentials::SigningKey::P256(_) => OID_ECDSA_WITH_SHA256,
        credentials::SigningKey::Ed25519(_) => OID_ED25519,
    }
}

fn encode_pbmac1_params(params: &pbmac::Pbmac1Params) -> rasn::types::OctetString {
    let mut buf = Vec::with_capacity(4 + params.salt.len());
    buf.extend_from_slice(&params.iteration_count.to_be_bytes());
    buf.extend_from_slice(&params.salt);
    rasn::types::OctetString::copy_from_slice(&buf)
}

fn decode_pbmac1_params(alg: &AlgorithmIdentifier) -> Result<pbmac::Pbmac1Params> {
    let bytes = alg
        .parameters
        .as_ref()
        .ok_or_else(|| CmpError::from(ProtectionError::AlgMismatch))?;
    if bytes.len() < 4 {
        return Err(CmpError::from(ProtectionError::AlgMismatch));
    }
    let iteration_count = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
    let salt = bytes[4..].to_vec();
    Ok(pbmac::Pbmac1Params {
        salt,
        iteration_count,
    })
}
