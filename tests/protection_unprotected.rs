//! Unprotected messages are rejected unless the response body is one of the
//! kinds `accept_unprotected_errors` covers, and enrollment requests/
//! responses (`ir`/`ip`) are never covered.

mod support;

use cmp_client::context::{CmpContext, ContextOptions};
use cmp_client::error::CmpError;
use cmp_client::message::body::{CertRepMessage, CertResponse, PkiStatusInfo};
use cmp_client::message::{PkiBody, PkiHeader, PkiMessage};
use cmp_client::protection::ProtectionEngine;
use cmp_client::trust::revocation::RevocationDispatcher;
use cmp_client::trust::ChainValidator;

fn bare_header() -> PkiHeader {
    PkiHeader {
        pvno: rasn::types::Integer::from(2),
        sender: rasn::types::OctetString::copy_from_slice(b"ca"),
        recipient: rasn::types::OctetString::copy_from_slice(b"client"),
        message_time: None,
        protection_alg: None,
        sender_kid: None,
        recip_kid: None,
        transaction_id: Some(rasn::types::OctetString::copy_from_slice(&[5u8; 16])),
        sender_nonce: Some(rasn::types::OctetString::copy_from_slice(&[6u8; 16])),
        recip_nonce: None,
        free_text: None,
        general_info: None,
    }
}

fn ctx_with(accept_unprotected_errors: bool) -> CmpContext {
    let chain_validator = ChainValidator::new(Vec::new(), Vec::new(), RevocationDispatcher::disabled());
    CmpContext::new(
        b"client".to_vec(),
        None,
        chain_validator,
        Box::new(support::UnusedTransport),
        Box::new(support::AcceptAll),
        ContextOptions {
            accept_unprotected_errors,
            ..ContextOptions::default()
        },
    )
}

fn unprotected_ip() -> PkiMessage {
    PkiMessage {
        header: bare_header(),
        body: PkiBody::Ip(CertRepMessage {
            ca_pubs: None,
            response: vec![CertResponse {
                cert_req_id: rasn::types::Integer::from(0),
                status: PkiStatusInfo {
                    status: rasn::types::Integer::from(0),
                    status_string: None,
                    fail_info: None,
                },
                certified_key_pair: None,
            }],
        }),
        protection: None,
        extra_certs: None,
    }
}

#[test]
fn unprotected_ip_rejected_by_default() {
    let ctx = ctx_with(false);
    let err = ProtectionEngine.verify(&unprotected_ip(), &ctx, None).unwrap_err();
    assert!(matches!(err, CmpError::UnexpectedUnprotected));
}

#[test]
fn unprotected_ip_accepted_when_option_set() {
    // `ip` is one of the response kinds `accept_unprotected_errors` covers.
    let ctx = ctx_with(true);
    assert!(ProtectionEngine.verify(&unprotected_ip(), &ctx, None).is_ok());
}

#[test]
fn unprotected_ir_never_accepted_regardless_of_option() {
    // `ir` is a request, never a response, and is never in the eligible set —
    // `accept_unprotected_errors` cannot waive protection for it.
    let ir = PkiMessage {
        header: bare_header(),
        body: PkiBody::Ir(vec![]),
        protection: None,
        extra_certs: None,
    };
    let ctx = ctx_with(true);
    let err = ProtectionEngine.verify(&ir, &ctx, None).unwrap_err();
    assert!(matches!(err, CmpError::UnexpectedUnprotected));
}
