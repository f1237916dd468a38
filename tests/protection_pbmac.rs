//! PBMAC1-protected message validation against a shared secret.

mod support;

use cmp_client::context::{CmpContext, ContextOptions};
use cmp_client::error::CmpError;
use cmp_client::message::body::PkiBody;
use cmp_client::message::{PkiHeader, PkiMessage};
use cmp_client::protection::credentials::{Credentials, PbmacCredential};
use cmp_client::protection::ProtectionEngine;
use cmp_client::trust::revocation::RevocationDispatcher;
use cmp_client::trust::ChainValidator;

fn bare_header() -> PkiHeader {
    PkiHeader {
        pvno: rasn::types::Integer::from(2),
        sender: rasn::types::OctetString::copy_from_slice(b"client"),
        recipient: rasn::types::OctetString::copy_from_slice(b"ca"),
        message_time: None,
        protection_alg: None,
        sender_kid: None,
        recip_kid: None,
        transaction_id: Some(rasn::types::OctetString::copy_from_slice(&[1u8; 16])),
        sender_nonce: Some(rasn::types::OctetString::copy_from_slice(&[2u8; 16])),
        recip_nonce: None,
        free_text: None,
        general_info: None,
    }
}

fn context_with_secret(secret: &str) -> CmpContext {
    let credentials = Credentials::Pbmac(PbmacCredential::new(b"ref".to_vec(), secret.as_bytes().to_vec()));
    let chain_validator = ChainValidator::new(Vec::new(), Vec::new(), RevocationDispatcher::disabled());
    CmpContext::new(
        b"client".to_vec(),
        Some(credentials),
        chain_validator,
        Box::new(support::UnusedTransport),
        Box::new(support::AcceptAll),
        ContextOptions::default(),
    )
}

#[test]
fn pbmac_protected_message_validates_with_matching_secret() {
    let sender_ctx = context_with_secret("9pp8-b35i-Xd3Q-udNR");
    let mut message = PkiMessage {
        header: bare_header(),
        body: PkiBody::PkiConf,
        protection: None,
        extra_certs: None,
    };

    let engine = ProtectionEngine;
    engine.apply(&mut message, &sender_ctx).expect("apply succeeds");

    let receiver_ctx = context_with_secret("9pp8-b35i-Xd3Q-udNR");
    assert!(engine.verify(&message, &receiver_ctx, None).is_ok());
}

#[test]
fn pbmac_protected_message_rejected_with_altered_secret() {
    let sender_ctx = context_with_secret("9pp8-b35i-Xd3Q-udNR");
    let mut message = PkiMessage {
        header: bare_header(),
        body: PkiBody::PkiConf,
        protection: None,
        extra_certs: None,
    };

    let engine = ProtectionEngine;
    engine.apply(&mut message, &sender_ctx).expect("apply succeeds");

    let receiver_ctx = context_with_secret("9pp8-b35i-Xd3Q-udNr");
    let err = engine.verify(&message, &receiver_ctx, None).unwrap_err();
    assert!(matches!(err, CmpError::BadProtection));
}
