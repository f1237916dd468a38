//! Transaction state machine (component D).
//!
//! Drives one request through Initial → Sent → AwaitingStatus →
//! [Polling] → Evaluating → [Confirming] → Done|Failed: builds and
//! protects the request, sends it, verifies and correlates the response,
//! polls while the server reports `waiting`, validates a granted
//! certificate's chain, and (unless confirmation is skipped) runs the
//! `certConf`/`pkiConf` round trip.

use std::time::{Duration, Instant, SystemTime};

use rasn::types::{Integer, ObjectIdentifier, OctetString};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::context::CmpContext;
use crate::error::{CmpError, Result};
use crate::message::body::{CertStatus, PkiStatusInfo};
use crate::message::codec::RasnCodec;
use crate::message::{InfoTypeAndValue, PkiBody, PkiHeader, PkiMessage};
use crate::protection::ProtectionEngine;
use crate::request::RequestBuilder;
use crate::response::{self, Outcome};
use crate::traits::MessageCodec;
use crate::types::{Certificate, CmpCommand};

/// id-it-implicitConfirm (RFC 4210 §5.3.19.4), used to tell whether the
/// server granted an implicit-confirm request.
const OID_IMPLICIT_CONFIRM: &[u32] = &[1, 3, 6, 1, 5, 5, 7, 4, 13];

/// Drives one transaction's wire exchanges against a [`CmpContext`].
pub struct TransactionRunner {
    codec: RasnCodec,
    protection: ProtectionEngine,
}

impl Default for TransactionRunner {
    fn default() -> Self {
        Self {
            codec: RasnCodec,
            protection: ProtectionEngine,
        }
    }
}

impl TransactionRunner {
    /// Build a runner with the default codec and protection engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `command`, built from `builder`, to completion against `ctx`.
    pub async fn run(
        &self,
        command: CmpCommand,
        builder: &RequestBuilder,
        ctx: &mut CmpContext,
    ) -> Result<Outcome> {
        ctx.start_transaction();
        let deadline = ctx.total_timeout.map(|d| Instant::now() + d);

        let (outcome, last_general_info) =
            self.send_until_settled(command, builder, ctx, deadline).await?;

        let Outcome::Success(issued) = &outcome else {
            return Ok(outcome);
        };

        ctx.chain_validator()
            .validate(&issued.certificate, SystemTime::now())
            .await?;
        ctx.set_new_cert(issued.certificate.clone());

        if ctx.options().disable_confirm {
            warn!(
                transaction_id = %ctx.transaction_id(),
                "disableConfirm set: skipping certConf after a successful enrollment; \
                 a server requiring confirmation will treat this transaction as incomplete"
            );
            return Ok(outcome);
        }

        if ctx.options().implicit_confirm && server_granted_implicit_confirm(last_general_info.as_ref()) {
            debug!(transaction_id = %ctx.transaction_id(), "implicitConfirm granted, skipping certConf");
            return Ok(outcome);
        }

        self.confirm(&issued.certificate, ctx, deadline).await?;
        Ok(outcome)
    }

    async fn send_until_settled(
        &self,
        command: CmpCommand,
        builder: &RequestBuilder,
        ctx: &mut CmpContext,
        deadline: Option<Instant>,
    ) -> Result<(Outcome, Option<Vec<InfoTypeAndValue>>)> {
        let sender_nonce = ctx.next_sender_nonce();
        let recip_nonce = ctx.recip_nonce_echo();
        let request = builder.build(command, ctx, sender_nonce, recip_nonce)?;
        let sender = request.header.sender.clone();
        let recipient = request.header.recipient.clone();

        let mut response = self.send_request(request, ctx, deadline).await?;
        let mut outcome = response::interpret(&response)?;

        loop {
            match outcome {
                Outcome::Waiting { check_after_secs } => {
                    let wait_secs = check_after_secs.unwrap_or(1);
                    self.wait_for_poll(wait_secs, deadline).await?;
                    let poll = self.build_poll_request(&sender, &recipient, ctx);
                    response = self.send_request(poll, ctx, deadline).await?;
                    outcome = response::interpret(&response)?;
                }
                other => return Ok((other, response.header.general_info.clone())),
            }
        }
    }

    /// Send a `certConf` confirming `cert` against `ctx`'s current
    /// transaction. Exposed as a standalone entry point (rather than only
    /// reachable through [`Self::run`]) so a caller confirming out-of-band
    /// gets [`CmpError::DuplicateCertConf`] from a second call on the same
    /// transaction instead of silently re-sending.
    pub async fn confirm(
        &self,
        cert: &Certificate,
        ctx: &mut CmpContext,
        deadline: Option<Instant>,
    ) -> Result<()> {
        if ctx.cert_conf_sent() {
            return Err(CmpError::DuplicateCertConf);
        }

        let failure_info = ctx.cert_conf_cb().decide(cert).await?;
        let hash = Sha256::digest(cert.der()).to_vec();
        let status_info = failure_info.map(|fi| PkiStatusInfo {
            status: Integer::from(if fi.0 == 0 { 0 } else { 2 }),
            status_string: None,
            fail_info: Some(Integer::from(fi.0 as i64)),
        });

        let sender = OctetString::copy_from_slice(ctx.sender_der());
        let recipient = ctx
            .pinned_srv_cert_subject()
            .map(|dn| OctetString::copy_from_slice(&dn.der))
            .unwrap_or_default();
        let header = self.bare_header(sender, recipient, ctx);
        let message = PkiMessage {
            header,
            body: PkiBody::CertConf(vec![CertStatus {
                cert_hash: OctetString::copy_from_slice(&hash),
                cert_req_id: Integer::from(0),
                status_info,
            }]),
            protection: None,
            extra_certs: ctx.extra_certs_out().map(|certs| {
                certs
                    .iter()
                    .map(|c| OctetString::copy_from_slice(c.der()))
                    .collect()
            }),
        };

        let response = self.send_request(message, ctx, deadline).await?;
        ctx.mark_cert_conf_sent();

        match response.body {
            PkiBody::PkiConf => Ok(()),
            other => Err(CmpError::ProtocolViolation(format!(
                "expected pkiConf in response to certConf, got {}",
                other.variant_name()
            ))),
        }
    }

    async fn send_request(
        &self,
        mut message: PkiMessage,
        ctx: &mut CmpContext,
        deadline: Option<Instant>,
    ) -> Result<PkiMessage> {
        self.protection.apply(&mut message, ctx)?;
        let request_bytes = self.codec.encode(&message)?;

        let timeout_secs = self.effective_timeout(ctx, deadline)?;
        let response_bytes = ctx.transport().send_receive(&request_bytes, timeout_secs).await?;
        let response = self.codec.decode(&response_bytes)?;

        self.check_correlation(&response, ctx)?;
        self.protection.verify(&response, ctx, None)?;

        if let Some(nonce) = response.header.sender_nonce() {
            ctx.record_peer_sender_nonce(nonce);
        }
        if let Some(certs) = &response.extra_certs {
            ctx.accumulate_extra_certs_in(
                certs.iter().map(|c| Certificate::from_der(c.to_vec())).collect(),
            );
        }
        if let PkiBody::Ip(rep) = &response.body {
            if let Some(ca_pubs) = &rep.ca_pubs {
                ctx.set_ca_pubs(
                    ca_pubs.iter().map(|c| Certificate::from_der(c.to_vec())).collect(),
                );
            }
        }

        Ok(response)
    }

    fn check_correlation(&self, response: &PkiMessage, ctx: &CmpContext) -> Result<()> {
        if response.header.transaction_id() != Some(ctx.transaction_id()) {
            return Err(CmpError::Unrelated);
        }
        if let (Some(got), Some(expected)) = (response.header.recip_nonce(), ctx.last_sender_nonce()) {
            if got != expected {
                return Err(CmpError::NonceMismatch);
            }
        }
        Ok(())
    }

    fn effective_timeout(&self, ctx: &CmpContext, deadline: Option<Instant>) -> Result<Option<u64>> {
        let remaining = match deadline {
            Some(d) => {
                let now = Instant::now();
                if now >= d {
                    return Err(CmpError::Timeout);
                }
                Some((d - now).as_secs().max(1))
            }
            None => None,
        };
        let msg = ctx.msg_timeout.map(|d| d.as_secs());
        Ok(match (msg, remaining) {
            (Some(m), Some(r)) => Some(m.min(r)),
            (Some(m), None) => Some(m),
            (None, Some(r)) => Some(r),
            (None, None) => None,
        })
    }

    async fn wait_for_poll(&self, wait_secs: u64, deadline: Option<Instant>) -> Result<()> {
        if let Some(d) = deadline {
            if Instant::now() >= d {
                return Err(CmpError::Timeout);
            }
        }
        tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        Ok(())
    }

    fn bare_header(&self, sender: OctetString, recipient: OctetString, ctx: &mut CmpContext) -> PkiHeader {
        let sender_nonce = ctx.next_sender_nonce();
        let recip_nonce = ctx.recip_nonce_echo();
        PkiHeader {
            pvno: Integer::from(2),
            sender,
            recipient,
            message_time: ctx.uses_signature_protection().then(|| Integer::from(0)),
            protection_alg: None,
            sender_kid: None,
            recip_kid: None,
            transaction_id: Some(OctetString::copy_from_slice(ctx.transaction_id().as_bytes())),
            sender_nonce: Some(OctetString::copy_from_slice(sender_nonce.as_bytes())),
            recip_nonce: recip_nonce.map(|n| OctetString::copy_from_slice(n.as_bytes())),
            free_text: None,
            general_info: None,
        }
    }

    fn build_poll_request(&self, sender: &OctetString, recipient: &OctetString, ctx: &mut CmpContext) -> PkiMessage {
        let header = self.bare_header(sender.clone(), recipient.clone(), ctx);
        PkiMessage {
            header,
            body: PkiBody::PollReq(vec![Integer::from(0)]),
            protection: None,
            extra_certs: None,
        }
    }
}

fn server_granted_implicit_confirm(general_info: Option<&Vec<InfoTypeAndValue>>) -> bool {
    let Some(target) = ObjectIdentifier::new(OID_IMPLICIT_CONFIRM.to_vec()) else {
        return false;
    };
    general_info
        .map(|itavs| itavs.iter().any(|itav| itav.info_type == target))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_confirm_absent_is_not_granted() {
        assert!(!server_granted_implicit_confirm(None));
    }

    #[test]
    fn implicit_confirm_itav_is_recognized() {
        let itav = InfoTypeAndValue {
            info_type: ObjectIdentifier::new(OID_IMPLICIT_CONFIRM.to_vec()).unwrap(),
            info_value: None,
        };
        assert!(server_granted_implicit_confirm(Some(&vec![itav])));
    }
}
