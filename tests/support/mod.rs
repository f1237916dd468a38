//! Shared fixtures for integration tests: certificate generation with
//! `rcgen` and minimal stand-ins for the transport/confirmation callback
//! traits that the scenarios below never actually invoke.

#![allow(dead_code)]

use async_trait::async_trait;
use p256::pkcs8::DecodePrivateKey;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair, KeyUsagePurpose,
};
use time::OffsetDateTime;

use cmp_client::error::Result;
use cmp_client::traits::{CertConfCallback, Transport};
use cmp_client::types::{Certificate, Dn, FailureInfo};

/// Install a `tracing` subscriber that writes to the test harness's
/// captured output. Safe to call from every test; only the first call
/// takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A generated certificate plus the pieces needed to sign a child certificate
/// or to build a [`cmp_client::protection::credentials::SignatureCredential`].
pub struct GeneratedCert {
    pub certificate: Certificate,
    pub subject: Dn,
    pub rcgen_cert: rcgen::Certificate,
    pub key_pair: KeyPair,
}

fn base_params(common_name: &str, not_before: OffsetDateTime, not_after: OffsetDateTime) -> CertificateParams {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    let mut params = CertificateParams::default();
    params.distinguished_name = dn;
    params.not_before = not_before;
    params.not_after = not_after;
    params
}

fn finish(rcgen_cert: rcgen::Certificate, key_pair: KeyPair) -> GeneratedCert {
    let der = rcgen_cert.der().to_vec();
    let certificate = Certificate::from_der(der);
    let subject = cmp_client::trust::subject_dn(&certificate).expect("generated cert has a parseable subject");
    GeneratedCert {
        certificate,
        subject,
        rcgen_cert,
        key_pair,
    }
}

/// A self-signed CA certificate, valid over `[not_before, not_after)`.
pub fn self_signed_ca(common_name: &str, not_before: OffsetDateTime, not_after: OffsetDateTime) -> GeneratedCert {
    let key_pair = KeyPair::generate().expect("key pair generation");
    let mut params = base_params(common_name, not_before, not_after);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    let rcgen_cert = params.self_signed(&key_pair).expect("self-signed root");
    finish(rcgen_cert, key_pair)
}

/// An intermediate CA certificate signed by `issuer`.
pub fn signed_ca(
    common_name: &str,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
    issuer: &GeneratedCert,
) -> GeneratedCert {
    let key_pair = KeyPair::generate().expect("key pair generation");
    let mut params = base_params(common_name, not_before, not_after);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    let issuer_handle = rcgen::Issuer::from_ca_cert_der(issuer.rcgen_cert.der(), &issuer.key_pair)
        .expect("issuer cert is a valid CA");
    let rcgen_cert = params
        .signed_by(&key_pair, &issuer_handle)
        .expect("intermediate signed by issuer");
    finish(rcgen_cert, key_pair)
}

/// An end-entity certificate signed by `issuer`.
pub fn signed_leaf(
    common_name: &str,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
    issuer: &GeneratedCert,
) -> GeneratedCert {
    let key_pair = KeyPair::generate().expect("key pair generation");
    let mut params = base_params(common_name, not_before, not_after);
    params.is_ca = IsCa::NoCa;
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    let issuer_handle = rcgen::Issuer::from_ca_cert_der(issuer.rcgen_cert.der(), &issuer.key_pair)
        .expect("issuer cert is a valid CA");
    let rcgen_cert = params
        .signed_by(&key_pair, &issuer_handle)
        .expect("leaf signed by issuer");
    finish(rcgen_cert, key_pair)
}

/// The P-256 signing key backing a [`GeneratedCert`], for use in a
/// signature [`cmp_client::protection::credentials::Credentials`].
pub fn p256_signing_key(generated: &GeneratedCert) -> p256::ecdsa::SigningKey {
    let pkcs8 = generated.key_pair.serialize_der();
    p256::ecdsa::SigningKey::from_pkcs8_der(&pkcs8).expect("rcgen key pair is valid PKCS#8")
}

/// A [`Transport`] that is never actually called in the tests that use it —
/// only present because [`cmp_client::context::CmpContext::new`] requires one.
pub struct UnusedTransport;

#[async_trait]
impl Transport for UnusedTransport {
    async fn send_receive(&self, _req_bytes: &[u8], _timeout_secs: Option<u64>) -> Result<Vec<u8>> {
        unimplemented!("protection/trust fixtures never send over the wire")
    }
}

/// A [`CertConfCallback`] that accepts unconditionally, for tests that don't
/// exercise the confirmation step.
pub struct AcceptAll;

#[async_trait]
impl CertConfCallback for AcceptAll {
    async fn decide(&self, _new_cert: &Certificate) -> Result<Option<FailureInfo>> {
        Ok(None)
    }
}
