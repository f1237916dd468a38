//! In-process mock transport and a minimal mock CA server (component G),
//! used to drive the client state machine's poll/confirm paths in tests.
//! Not a standalone product — just enough server-side state to exercise the
//! client.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rasn::types::Integer;

use crate::error::Result;
use crate::message::{
    body::{CertRepMessage, CertResponse, CertifiedKeyPair, PkiStatusInfo},
    codec::RasnCodec,
    InfoTypeAndValue, PkiBody, PkiHeader, PkiMessage,
};
use crate::traits::{MessageCodec, Transport};
use crate::types::{Certificate, Nonce, TransactionId};

/// Server-side behavior for one transaction: how many `pollReq`s to answer
/// with `waiting` before granting the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollBehavior {
    /// Number of poll rounds to serve before granting
    pub rounds: u32,
    /// `checkAfter` value advertised to the client, in seconds
    pub check_after_secs: u64,
}

/// Minimal server-side state machine: answers `ir/cr/kur/p10cr/rr/genm` with
/// a fixed disposition, optionally forcing a configured number of poll
/// rounds first.
pub struct MockCaServer {
    codec: RasnCodec,
    issued_cert: Certificate,
    extra_certs: Vec<Certificate>,
    poll_behavior: PollBehavior,
    poll_counts: Mutex<HashMap<[u8; 16], u32>>,
    accepted: bool,
}

impl MockCaServer {
    /// A server that grants immediately with `issued_cert`.
    pub fn granting(issued_cert: Certificate) -> Self {
        Self {
            codec: RasnCodec,
            issued_cert,
            extra_certs: Vec::new(),
            poll_behavior: PollBehavior::default(),
            poll_counts: Mutex::new(HashMap::new()),
            accepted: true,
        }
    }

    /// A server that rejects every request.
    pub fn rejecting(issued_cert: Certificate) -> Self {
        Self {
            accepted: false,
            ..Self::granting(issued_cert)
        }
    }

    /// Configure the server to require polling before granting.
    pub fn with_polling(mut self, behavior: PollBehavior) -> Self {
        self.poll_behavior = behavior;
        self
    }

    fn response_header(&self, request: &PkiHeader) -> PkiHeader {
        PkiHeader {
            pvno: request.pvno.clone(),
            sender: request.recipient.clone(),
            recipient: request.sender.clone(),
            message_time: None,
            protection_alg: None,
            sender_kid: None,
            recip_kid: None,
            transaction_id: request.transaction_id.clone(),
            sender_nonce: Some(rasn::types::OctetString::copy_from_slice(
                Nonce::new().as_bytes(),
            )),
            recip_nonce: request.sender_nonce.clone(),
            free_text: None,
            general_info: None,
        }
    }

    fn status_info(&self) -> PkiStatusInfo {
        if self.accepted {
            PkiStatusInfo {
                status: Integer::from(0),
                status_string: None,
                fail_info: None,
            }
        } else {
            PkiStatusInfo {
                status: Integer::from(2),
                status_string: Some(vec!["rejected by mock CA".to_string()]),
                fail_info: Some(Integer::from(crate::types::FailureInfo::BAD_REQUEST as i64)),
            }
        }
    }

    fn cert_rep(&self) -> CertRepMessage {
        let certified_key_pair = self.accepted.then(|| CertifiedKeyPair {
            certificate: rasn::types::OctetString::copy_from_slice(self.issued_cert.der()),
        });
        CertRepMessage {
            ca_pubs: None,
            response: vec![CertResponse {
                cert_req_id: Integer::from(0),
                status: self.status_info(),
                certified_key_pair,
            }],
        }
    }

    fn should_poll(&self, txn: &TransactionId) -> bool {
        if self.poll_behavior.rounds == 0 {
            return false;
        }
        let mut counts = self.poll_counts.lock().unwrap();
        let entry = counts.entry(*txn.as_bytes()).or_insert(0);
        if *entry < self.poll_behavior.rounds {
            *entry += 1;
            true
        } else {
            false
        }
    }

    /// Process one request, returning the DER-encoded response.
    pub fn handle(&self, request_bytes: &[u8]) -> Result<Vec<u8>> {
        let request = self.codec.decode(request_bytes)?;
        let header = self.response_header(&request.header);
        let txn = header
            .transaction_id()
            .unwrap_or_default();

        let body = match &request.body {
            PkiBody::Ir(_) | PkiBody::Cr(_) | PkiBody::Kur(_) => {
                if self.should_poll(&txn) {
                    PkiBody::PollRep(vec![crate::message::body::PollRepEntry {
                        cert_req_id: Integer::from(0),
                        check_after: Integer::from(self.poll_behavior.check_after_secs as i64),
                    }])
                } else {
                    match &request.body {
                        PkiBody::Ir(_) => PkiBody::Ip(self.cert_rep()),
                        PkiBody::Cr(_) => PkiBody::Cp(self.cert_rep()),
                        _ => PkiBody::Kup(self.cert_rep()),
                    }
                }
            }
            PkiBody::P10cr(_) => PkiBody::Cp(self.cert_rep()),
            PkiBody::PollReq(_) => {
                if self.should_poll(&txn) {
                    PkiBody::PollRep(vec![crate::message::body::PollRepEntry {
                        cert_req_id: Integer::from(0),
                        check_after: Integer::from(self.poll_behavior.check_after_secs as i64),
                    }])
                } else {
                    PkiBody::Cp(self.cert_rep())
                }
            }
            PkiBody::Rr(_) => PkiBody::Rp(crate::message::body::RevRepContent {
                status: vec![crate::message::body::RevRepContentEntry {
                    status: self.status_info(),
                }],
            }),
            PkiBody::Genm(itavs) => PkiBody::Genp(
                itavs
                    .iter()
                    .map(|i| InfoTypeAndValue {
                        info_type: i.info_type.clone(),
                        info_value: None,
                    })
                    .collect(),
            ),
            PkiBody::CertConf(_) => PkiBody::PkiConf,
            _ => PkiBody::Error(crate::message::body::ErrorMsgContent {
                pki_status_info: PkiStatusInfo {
                    status: Integer::from(2),
                    status_string: Some(vec![format!(
                        "mock CA does not handle {}",
                        request.body.variant_name()
                    )]),
                    fail_info: Some(Integer::from(crate::types::FailureInfo::BAD_REQUEST as i64)),
                },
                error_code: None,
            }),
        };

        let response = PkiMessage {
            header,
            body,
            protection: None,
            extra_certs: if self.extra_certs.is_empty() {
                None
            } else {
                Some(
                    self.extra_certs
                        .iter()
                        .map(|c| rasn::types::OctetString::copy_from_slice(c.der()))
                        .collect(),
                )
            },
        };

        self.codec.encode(&response)
    }
}

/// Client-side [`Transport`] that loops requests through a [`MockCaServer`]
/// in the same process, with no real network I/O.
pub struct MockTransport {
    server: std::sync::Arc<MockCaServer>,
}

impl MockTransport {
    /// Wrap a server for use as a client transport
    pub fn new(server: std::sync::Arc<MockCaServer>) -> Self {
        Self { server }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_receive(&self, req_bytes: &[u8], _timeout_secs: Option<u64>) -> Result<Vec<u8>> {
        self.server.handle(req_bytes)
    }
}
