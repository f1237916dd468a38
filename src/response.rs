//! Response interpreter (component F): extracts status, failure info,
//! issued certificate, `extraCerts`, `caPubs` from a response body and
//! classifies the outcome.

use crate::error::{CmpError, Result};
use crate::message::{PkiBody, PkiMessage};
use crate::types::{Certificate, FailureInfo, IssuedCertificate, PkiStatus};

/// What the state machine should do with a parsed response.
pub enum Outcome {
    /// `accepted`/`grantedWithMods` on an enrollment response
    Success(IssuedCertificate),
    /// Terminal negative status — the transaction fails
    Rejected {
        /// Reported status
        status: PkiStatus,
        /// Reported failure info bits, if any
        failure_info: Option<FailureInfo>,
        /// Free-text diagnostic strings
        status_string: Vec<String>,
    },
    /// `waiting` status or an explicit `pollRep` — the state machine should poll
    Waiting {
        /// Seconds to wait before the next `pollReq`, when known
        check_after_secs: Option<u64>,
    },
    /// `pkiConf` acknowledging a `certConf`
    ConfirmationAck,
    /// `genp` reply to a `genm`
    GeneralResponse(Vec<crate::message::InfoTypeAndValue>),
    /// Revocation response, one status per request sent
    RevocationResult(Vec<PkiStatus>),
    /// A status/body combination outside what the interpreter recognizes
    ProtocolViolation(String),
}

/// Extract and classify the outcome of one response `PkiMessage`.
pub fn interpret(message: &PkiMessage) -> Result<Outcome> {
    match &message.body {
        PkiBody::Ip(rep) | PkiBody::Cp(rep) | PkiBody::Kup(rep) => interpret_cert_rep(rep),
        PkiBody::PollRep(entries) => {
            let check_after_secs = entries
                .first()
                .map(|e| i64_to_u64(&e.check_after));
            Ok(Outcome::Waiting { check_after_secs })
        }
        PkiBody::PkiConf => Ok(Outcome::ConfirmationAck),
        PkiBody::Genp(itavs) => Ok(Outcome::GeneralResponse(itavs.clone())),
        PkiBody::Rp(rep) => {
            let statuses = rep
                .status
                .iter()
                .map(|entry| pki_status_from_wire(&entry.status))
                .collect::<Result<Vec<_>>>()?;
            Ok(Outcome::RevocationResult(statuses))
        }
        PkiBody::Error(err) => {
            let status = pki_status_from_wire(&err.pki_status_info)?;
            Ok(Outcome::Rejected {
                status,
                failure_info: err
                    .pki_status_info
                    .fail_info
                    .as_ref()
                    .map(|i| FailureInfo(i64_to_u64(i) as u32)),
                status_string: err
                    .pki_status_info
                    .status_string
                    .clone()
                    .unwrap_or_default(),
            })
        }
        other => Ok(Outcome::ProtocolViolation(format!(
            "unexpected response body: {}",
            other.variant_name()
        ))),
    }
}

fn interpret_cert_rep(rep: &crate::message::body::CertRepMessage) -> Result<Outcome> {
    let Some(first) = rep.response.first() else {
        return Ok(Outcome::ProtocolViolation("empty CertRepMessage".into()));
    };

    let status = pki_status_from_wire(&first.status)?;
    let status_string = first
        .status
        .status_string
        .clone()
        .unwrap_or_default();
    let failure_info = first
        .status
        .fail_info
        .as_ref()
        .map(|i| FailureInfo(i64_to_u64(i) as u32));

    if status.is_success() {
        let Some(ckp) = &first.certified_key_pair else {
            return Ok(Outcome::ProtocolViolation(
                "granted status without a certified key pair".into(),
            ));
        };
        let certificate = Certificate::from_der(ckp.certificate.to_vec());
        let ca_pubs = rep
            .ca_pubs
            .as_ref()
            .map(|v| v.iter().map(|b| Certificate::from_der(b.to_vec())).collect())
            .unwrap_or_default();
        Ok(Outcome::Success(IssuedCertificate {
            certificate,
            extra_certs: Vec::new(),
            ca_pubs,
        }))
    } else if status == PkiStatus::Waiting {
        Ok(Outcome::Waiting {
            check_after_secs: None,
        })
    } else if status.is_rejection() {
        Ok(Outcome::Rejected {
            status,
            failure_info,
            status_string,
        })
    } else {
        Ok(Outcome::ProtocolViolation(format!(
            "unrecognized PKIStatus in CertRepMessage: {status:?}"
        )))
    }
}

fn pki_status_from_wire(info: &crate::message::body::PkiStatusInfo) -> Result<PkiStatus> {
    let v = i64_to_u64(&info.status) as i32;
    PkiStatus::from_wire(v).ok_or_else(|| {
        CmpError::ProtocolViolation(format!("unknown PKIStatus value: {v}"))
    })
}

fn i64_to_u64(i: &rasn::types::Integer) -> u64 {
    i.to_string().parse::<i64>().unwrap_or(0).max(0) as u64
}
