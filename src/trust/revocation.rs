//! Revocation status dispatch: stapled OCSP → live OCSP → CRL, per the
//! precedence described in the component design.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::traits::RevocationSource;
use crate::types::{Certificate, RevocationStatus};

/// Which revocation sources are enabled and in what order they are consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct RevocationPolicy {
    /// Consult a stapled OCSP response (TLS transport only, leaf cert only)
    pub stapled_ocsp: bool,
    /// Query a live OCSP responder
    pub live_ocsp: bool,
    /// Consult CRLs, including ones fetched from distribution points
    pub crl: bool,
    /// Per-fetch timeout for live OCSP/CRL retrieval
    pub fetch_timeout: Option<Duration>,
}

impl RevocationPolicy {
    /// No revocation checking at all
    pub fn disabled() -> Self {
        Self::default()
    }

    /// True if any source is enabled
    pub fn any_enabled(&self) -> bool {
        self.stapled_ocsp || self.live_ocsp || self.crl
    }
}

/// Consults the enabled revocation sources in precedence order and applies
/// the policy from the component design: `Revoked` is fatal, `Good` from any
/// enabled source satisfies the check, `Inconclusive` from every enabled
/// source fails with `RevocationUnknown` unless no source is enabled.
pub struct RevocationDispatcher {
    policy: RevocationPolicy,
    stapled: Option<Box<dyn RevocationSource>>,
    live_ocsp: Option<Box<dyn RevocationSource>>,
    crl: Option<Box<dyn RevocationSource>>,
}

impl RevocationDispatcher {
    /// Build a dispatcher from a policy and the sources that implement it.
    /// Any source left `None` for an enabled policy flag is treated as
    /// `Inconclusive` for every lookup.
    pub fn new(
        policy: RevocationPolicy,
        stapled: Option<Box<dyn RevocationSource>>,
        live_ocsp: Option<Box<dyn RevocationSource>>,
        crl: Option<Box<dyn RevocationSource>>,
    ) -> Self {
        Self {
            policy,
            stapled,
            live_ocsp,
            crl,
        }
    }

    /// A dispatcher with every source disabled.
    pub fn disabled() -> Self {
        Self {
            policy: RevocationPolicy::disabled(),
            stapled: None,
            live_ocsp: None,
            crl: None,
        }
    }

    /// True if any source is enabled by policy
    pub fn any_source_enabled(&self) -> bool {
        self.policy.any_enabled()
    }

    /// Check `cert` (issued by `issuer`) against the enabled sources in
    /// precedence order, stopping at the first `Good` or `Revoked`.
    pub async fn check(&self, cert: &Certificate, issuer: &Certificate) -> RevocationStatus {
        if self.policy.stapled_ocsp {
            if let Some(source) = &self.stapled {
                match source.check(cert, issuer).await {
                    RevocationStatus::Inconclusive => {}
                    decisive => return decisive,
                }
            }
        }

        if self.policy.live_ocsp {
            if let Some(source) = &self.live_ocsp {
                match source.check(cert, issuer).await {
                    RevocationStatus::Inconclusive => {}
                    decisive => return decisive,
                }
            }
        }

        if self.policy.crl {
            if let Some(source) = &self.crl {
                match source.check(cert, issuer).await {
                    RevocationStatus::Inconclusive => {}
                    decisive => return decisive,
                }
            }
        }

        debug!("no revocation source reached a decisive verdict");
        RevocationStatus::Inconclusive
    }
}

/// A revocation source that always returns `Good`, for tests and for
/// disabling a layer without removing it from the dispatch chain.
pub struct AlwaysGood;

#[async_trait]
impl RevocationSource for AlwaysGood {
    async fn check(&self, _cert: &Certificate, _issuer: &Certificate) -> RevocationStatus {
        RevocationStatus::Good
    }
}

/// An in-memory revocation list for tests: certificates identified by their
/// DER bytes are reported revoked with the given reason.
#[derive(Default)]
pub struct StaticRevocationList {
    revoked: Vec<(Vec<u8>, crate::types::RevocationReason)>,
}

impl StaticRevocationList {
    /// An empty list — every lookup is `Inconclusive`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `cert` as revoked with `reason`.
    pub fn revoke(&mut self, cert: &Certificate, reason: crate::types::RevocationReason) {
        self.revoked.push((cert.der().to_vec(), reason));
    }
}

#[async_trait]
impl RevocationSource for StaticRevocationList {
    async fn check(&self, cert: &Certificate, _issuer: &Certificate) -> RevocationStatus {
        match self.revoked.iter().find(|(der, _)| der == cert.der()) {
            Some((_, reason)) => RevocationStatus::Revoked(*reason),
            None => RevocationStatus::Inconclusive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn good_from_any_source_satisfies_check() {
        let dispatcher = RevocationDispatcher::new(
            RevocationPolicy {
                crl: true,
                ..Default::default()
            },
            None,
            None,
            Some(Box::new(AlwaysGood)),
        );
        let cert = Certificate::from_der(vec![1, 2, 3]);
        let issuer = Certificate::from_der(vec![4, 5, 6]);
        assert_eq!(dispatcher.check(&cert, &issuer).await, RevocationStatus::Good);
    }

    #[tokio::test]
    async fn inconclusive_when_no_source_enabled() {
        let dispatcher = RevocationDispatcher::disabled();
        let cert = Certificate::from_der(vec![1, 2, 3]);
        let issuer = Certificate::from_der(vec![4, 5, 6]);
        assert_eq!(
            dispatcher.check(&cert, &issuer).await,
            RevocationStatus::Inconclusive
        );
        assert!(!dispatcher.any_source_enabled());
    }

    #[tokio::test]
    async fn revoked_cert_is_fatal() {
        let mut list = StaticRevocationList::new();
        let cert = Certificate::from_der(vec![9, 9, 9]);
        list.revoke(&cert, crate::types::RevocationReason::KeyCompromise);
        let dispatcher = RevocationDispatcher::new(
            RevocationPolicy {
                crl: true,
                ..Default::default()
            },
            None,
            None,
            Some(Box::new(list)),
        );
        let issuer = Certificate::from_der(vec![4, 5, 6]);
        assert_eq!(
            dispatcher.check(&cert, &issuer).await,
            RevocationStatus::Revoked(crate::types::RevocationReason::KeyCompromise)
        );
    }
}
