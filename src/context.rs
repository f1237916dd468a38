//! Context / configuration (component H): holds keys, certs, trust store,
//! options, and transaction-scoped nonces/IDs. One context drives one or
//! more sequential transactions.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::protection::credentials::Credentials;
use crate::traits::{CertConfCallback, Transport};
use crate::trust::ChainValidator;
use crate::types::{Certificate, DigestAlgorithm, Dn, FailureInfo, Nonce, PopoMethod, TransactionId};

/// Non-secret option flags controlling protocol behavior.
#[derive(Debug, Clone, Copy)]
pub struct ContextOptions {
    /// Send requests unprotected when no credentials are configured
    pub unprotected_send: bool,
    /// Accept unprotected `error`/`ip`/`cp`/`kup`/`rp` responses
    pub accept_unprotected_errors: bool,
    /// Skip the KeyUsage check on the signature-verification sender cert
    pub ignore_keyusage: bool,
    /// Request implicit confirmation (skip the `certConf`/`pkiConf` round trip)
    pub implicit_confirm: bool,
    /// Skip `certConf` unconditionally; a logged protocol violation, kept
    /// only for interop with noncompliant servers.
    pub disable_confirm: bool,
    /// Default proof-of-possession method for enrollment requests
    pub popo: PopoMethod,
    /// Digest algorithm for signature protection and POPO signing
    pub digest: DigestAlgorithm,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            unprotected_send: false,
            accept_unprotected_errors: false,
            ignore_keyusage: false,
            implicit_confirm: false,
            disable_confirm: false,
            popo: PopoMethod::default(),
            digest: DigestAlgorithm::default(),
        }
    }
}

/// State that resets at the start of each transaction.
#[derive(Default)]
struct TransactionState {
    transaction_id: Option<TransactionId>,
    last_sender_nonce: Option<Nonce>,
    last_recipient_nonce: Option<Nonce>,
    ca_pubs: Vec<Certificate>,
    extra_certs_in: Vec<Certificate>,
    new_cert: Option<Certificate>,
    cert_conf_sent: bool,
}

/// One CMP client context. Populated by the caller; one context executes
/// one or more sequential transactions. Private keys and shared secrets are
/// held by [`Credentials`], which zeroizes them on drop.
pub struct CmpContext {
    /// Our own identity, DER-encoded, used as the PKIHeader `sender`
    sender_identity: Vec<u8>,
    /// Client credentials used to protect outbound messages
    credentials: Option<Credentials>,
    /// Certificate pinned as the expected signature-protection sender,
    /// bypassing chain validation of that specific certificate
    pinned_srv_cert: Option<Certificate>,
    /// Expected sender DN for signature-protected responses, defaulting to
    /// the pinned server certificate's subject
    expected_sender: Option<Dn>,
    /// Additional certificates attached to every outbound message
    extra_certs_out: Vec<Certificate>,
    /// Untrusted intermediates available for sender-cert candidate search
    /// and chain building
    untrusted_certs: Vec<Certificate>,
    /// Chain validator built from the trust store and revocation policy
    chain_validator: ChainValidator,
    /// Protocol option flags
    options: ContextOptions,
    /// Per-message transport timeout; `None` disables it
    pub msg_timeout: Option<Duration>,
    /// Overall transaction timeout; `None` disables it
    pub total_timeout: Option<Duration>,
    /// Pluggable transport (the `transfer_cb` of the component design)
    transport: Box<dyn Transport>,
    /// Invoked before sending `certConf`
    cert_conf_cb: Box<dyn CertConfCallback>,
    /// Transaction-scoped mutable state
    state: TransactionState,
}

impl CmpContext {
    /// Build a context. `chain_validator` backs both signature-protection
    /// sender verification and the issued certificate's own validation.
    pub fn new(
        sender_identity: Vec<u8>,
        credentials: Option<Credentials>,
        chain_validator: ChainValidator,
        transport: Box<dyn Transport>,
        cert_conf_cb: Box<dyn CertConfCallback>,
        options: ContextOptions,
    ) -> Self {
        Self {
            sender_identity,
            credentials,
            pinned_srv_cert: None,
            expected_sender: None,
            extra_certs_out: Vec::new(),
            untrusted_certs: Vec::new(),
            chain_validator,
            options,
            msg_timeout: Some(Duration::from_secs(120)),
            total_timeout: None,
            transport,
            cert_conf_cb,
            state: TransactionState::default(),
        }
    }

    /// Pin an expected server certificate for signature verification,
    /// bypassing chain validation of that specific certificate.
    pub fn pin_server_certificate(&mut self, cert: Certificate, subject: Dn) {
        self.pinned_srv_cert = Some(cert);
        self.expected_sender.get_or_insert(subject);
    }

    /// Set the DN a response's sender must match.
    pub fn set_expected_sender(&mut self, dn: Dn) {
        self.expected_sender = Some(dn);
    }

    /// Supply untrusted intermediates for chain building and sender-cert search.
    pub fn set_untrusted_certs(&mut self, certs: Vec<Certificate>) {
        self.untrusted_certs = certs;
    }

    /// Supply certificates to attach to every outbound message.
    pub fn set_extra_certs_out(&mut self, certs: Vec<Certificate>) {
        self.extra_certs_out = certs;
    }

    /// Set the per-message transport timeout from seconds, matching
    /// [`crate::config::TransportConfig::msg_timeout_secs`]'s convention:
    /// `0` disables the timeout.
    pub fn set_msg_timeout_secs(&mut self, secs: u64) {
        self.msg_timeout = (secs != 0).then(|| Duration::from_secs(secs));
    }

    /// Set the overall transaction timeout from seconds, matching
    /// [`crate::config::TransportConfig::total_timeout_secs`]'s convention:
    /// `0` disables the timeout.
    pub fn set_total_timeout_secs(&mut self, secs: u64) {
        self.total_timeout = (secs != 0).then(|| Duration::from_secs(secs));
    }

    /// Reset transaction-scoped state and allocate a fresh transaction id.
    /// Must be called before starting a new transaction on a reused context.
    pub fn start_transaction(&mut self) -> TransactionId {
        let id = TransactionId::new();
        self.state = TransactionState {
            transaction_id: Some(id),
            ..TransactionState::default()
        };
        id
    }

    /// The current transaction's id, allocating one if none is set yet.
    pub fn transaction_id(&self) -> TransactionId {
        self.state.transaction_id.unwrap_or_default()
    }

    /// Allocate and record a fresh sender nonce for the next outbound message.
    pub fn next_sender_nonce(&mut self) -> Nonce {
        let nonce = Nonce::new();
        self.state.last_sender_nonce = Some(nonce);
        nonce
    }

    /// The echo value for `recipNonce` on the next outbound message: the
    /// last sender nonce we received from the peer, if any.
    pub fn recip_nonce_echo(&self) -> Option<Nonce> {
        self.state.last_recipient_nonce
    }

    /// Record the sender nonce of a just-received response, to be echoed as
    /// `recipNonce` on the next outbound message.
    pub fn record_peer_sender_nonce(&mut self, nonce: Nonce) {
        self.state.last_recipient_nonce = Some(nonce);
    }

    /// The last sender nonce we sent, to check a response's `recipNonce` against.
    pub fn last_sender_nonce(&self) -> Option<Nonce> {
        self.state.last_sender_nonce
    }

    /// Accumulate `extraCerts` received on a response.
    pub fn accumulate_extra_certs_in(&mut self, certs: Vec<Certificate>) {
        self.state.extra_certs_in.extend(certs);
    }

    /// Certificates accumulated so far this transaction from response `extraCerts`.
    pub fn extra_certs_in(&self) -> &[Certificate] {
        &self.state.extra_certs_in
    }

    /// Record `caPubs` received on an `ip` response.
    pub fn set_ca_pubs(&mut self, certs: Vec<Certificate>) {
        self.state.ca_pubs = certs;
    }

    /// `caPubs` received this transaction, if any.
    pub fn ca_pubs(&self) -> &[Certificate] {
        &self.state.ca_pubs
    }

    /// Record the newly issued certificate once a success outcome is parsed.
    pub fn set_new_cert(&mut self, cert: Certificate) {
        self.state.new_cert = Some(cert);
    }

    /// The newly issued certificate, once recorded.
    pub fn new_cert(&self) -> Option<&Certificate> {
        self.state.new_cert.as_ref()
    }

    /// True if `certConf` has already been sent this transaction. A second
    /// attempt is a protocol violation ([`crate::error::CmpError::DuplicateCertConf`]).
    pub fn cert_conf_sent(&self) -> bool {
        self.state.cert_conf_sent
    }

    /// Mark `certConf` as sent for this transaction.
    pub fn mark_cert_conf_sent(&mut self) {
        self.state.cert_conf_sent = true;
    }

    /// Client credentials, if configured.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// True when this context protects outbound messages with a signature
    /// (as opposed to PBMAC1 or no protection).
    pub fn uses_signature_protection(&self) -> bool {
        matches!(self.credentials, Some(Credentials::Signature(_)))
    }

    /// Option flags.
    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// See [`ContextOptions::unprotected_send`].
    pub fn unprotected_send(&self) -> bool {
        self.options.unprotected_send
    }

    /// See [`ContextOptions::accept_unprotected_errors`].
    pub fn accept_unprotected_errors(&self) -> bool {
        self.options.accept_unprotected_errors
    }

    /// See [`ContextOptions::ignore_keyusage`].
    pub fn ignore_keyusage(&self) -> bool {
        self.options.ignore_keyusage
    }

    /// The digest algorithm used for signature protection and POPO signing.
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.options.digest
    }

    /// Our own sender identity, DER-encoded.
    pub fn sender_der(&self) -> &[u8] {
        &self.sender_identity
    }

    /// The pinned server certificate's expected-sender DN, if pinned.
    pub fn pinned_srv_cert_subject(&self) -> Option<&Dn> {
        self.pinned_srv_cert.as_ref().and(self.expected_sender.as_ref())
    }

    /// The DN a response's sender must match: explicit expectation, or the
    /// pinned server certificate's subject.
    pub fn expected_sender(&self) -> Option<&Dn> {
        self.expected_sender.as_ref()
    }

    /// Certificates attached to every outbound message, if any.
    pub fn extra_certs_out(&self) -> Option<&Vec<Certificate>> {
        (!self.extra_certs_out.is_empty()).then_some(&self.extra_certs_out)
    }

    /// Find a candidate sender certificate for signature verification: the
    /// pinned `srvCert` if one is set, otherwise the first certificate among
    /// `extraCerts ∪ untrustedCerts` whose `senderKID` (if present) matches
    /// its subjectKeyIdentifier.
    pub fn locate_sender_candidate(
        &self,
        message: &crate::message::PkiMessage,
    ) -> Option<&Certificate> {
        if let Some(pinned) = &self.pinned_srv_cert {
            return Some(pinned);
        }

        let wire_certs = message
            .extra_certs
            .as_ref()
            .map(|v| v.iter().map(|b| b.to_vec()).collect::<Vec<_>>())
            .unwrap_or_default();

        let sender_kid = message.header.sender_kid.as_ref().map(|k| k.to_vec());

        self.untrusted_certs.iter().chain(self.state.extra_certs_in.iter()).find(|cert| {
            match &sender_kid {
                Some(kid) => crate::trust::subject_key_identifier(cert).as_deref() == Some(kid.as_slice()),
                None => wire_certs.iter().any(|w| w == cert.der()),
            }
        })
    }

    /// The chain validator backing signature-verification and issued-cert validation.
    pub fn chain_validator(&self) -> &ChainValidator {
        &self.chain_validator
    }

    /// The configured transport.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// The configured `certConf` callback.
    pub fn cert_conf_cb(&self) -> &dyn CertConfCallback {
        self.cert_conf_cb.as_ref()
    }
}

/// Default `certConf` callback: accepts unconditionally. By the time
/// `certConf` is sent, the new certificate has already passed
/// [`ChainValidator::validate`], so there is nothing left for this hook to
/// check unless a caller wants additional, application-specific gating.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptIssuedCertificate;

#[async_trait]
impl CertConfCallback for AcceptIssuedCertificate {
    async fn decide(&self, _new_cert: &Certificate) -> Result<Option<FailureInfo>> {
        Ok(None)
    }
}
