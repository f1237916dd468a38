//! SAN-in-extensions conflict: a caller-supplied `reqexts` that already
//! carries a subjectAltName extension must not be silently overridden by
//! `san_dns`/`san_ip`.

use cmp_client::context::{CmpContext, ContextOptions};
use cmp_client::error::CmpError;
use cmp_client::request::RequestBuilder;
use cmp_client::trust::revocation::RevocationDispatcher;
use cmp_client::trust::ChainValidator;
use cmp_client::types::{CmpCommand, Dn, Nonce};

mod support;

// A minimal DER `Extensions` SEQUENCE containing one subjectAltName
// extension (OID 2.5.29.17) with an empty GeneralNames value. The content
// is never parsed for semantics, only detected by OID, so an empty value
// is sufficient to trigger the conflict path.
const REQEXTS_WITH_SAN: &[u8] = &[
    0x30, 0x0d, // SEQUENCE, len 13
    0x30, 0x0b, // SEQUENCE (Extension), len 11
    0x06, 0x03, 0x55, 0x1d, 0x11, // OID 2.5.29.17
    0x04, 0x04, 0x30, 0x02, 0x30, 0x00, // OCTET STRING wrapping empty SEQUENCE
];

fn ctx() -> CmpContext {
    let chain_validator = ChainValidator::new(Vec::new(), Vec::new(), RevocationDispatcher::disabled());
    CmpContext::new(
        b"client".to_vec(),
        None,
        chain_validator,
        Box::new(support::UnusedTransport),
        Box::new(support::AcceptAll),
        ContextOptions::default(),
    )
}

#[test]
fn explicit_san_dns_conflicts_with_existing_san_in_reqexts() {
    let builder = RequestBuilder {
        subject: Some(Dn::new(vec![], "cn=client".into())),
        reqexts: Some(REQEXTS_WITH_SAN.to_vec()),
        san_dns: vec!["new.example".into()],
        ..Default::default()
    };

    let ctx = ctx();
    let err = builder
        .build(CmpCommand::Ir, &ctx, Nonce::new(), None)
        .unwrap_err();
    assert!(matches!(err, CmpError::SanConflict));
}

#[test]
fn explicit_san_ip_conflicts_with_existing_san_in_reqexts() {
    let builder = RequestBuilder {
        subject: Some(Dn::new(vec![], "cn=client".into())),
        reqexts: Some(REQEXTS_WITH_SAN.to_vec()),
        san_ip: vec!["10.0.0.1".into()],
        ..Default::default()
    };

    let ctx = ctx();
    let err = builder
        .build(CmpCommand::Ir, &ctx, Nonce::new(), None)
        .unwrap_err();
    assert!(matches!(err, CmpError::SanConflict));
}

#[test]
fn no_explicit_san_does_not_conflict() {
    let builder = RequestBuilder {
        subject: Some(Dn::new(vec![], "cn=client".into())),
        reqexts: Some(REQEXTS_WITH_SAN.to_vec()),
        ..Default::default()
    };

    let ctx = ctx();
    assert!(builder.build(CmpCommand::Ir, &ctx, Nonce::new(), None).is_ok());
}
