//! Client credentials used to protect outbound messages: either a shared
//! secret (PBMAC1) or a certificate/private-key pair (signature). Secret
//! material is zeroized on drop.

use secrecy::{ExposeSecret, SecretBox};
use zeroize::Zeroize;

use crate::types::Certificate;

/// A private signing key, tagged by algorithm. Each variant owns its key
/// material directly so it zeroizes itself on drop via the underlying crate's
/// `Drop` impl (`rsa`, `p256`, and `ed25519-dalek` all zeroize their secret
/// scalars).
pub enum SigningKey {
    /// RSA PKCS#1 v1.5 / PSS signing key
    Rsa(Box<rsa::RsaPrivateKey>),
    /// ECDSA over NIST P-256
    P256(Box<p256::ecdsa::SigningKey>),
    /// Ed25519
    Ed25519(Box<ed25519_dalek::SigningKey>),
}

/// Shared-secret credential for PBMAC1 protection: a reference value
/// identifying the credential to the server, and the secret value itself.
pub struct PbmacCredential {
    /// `senderKID` value — identifies which shared secret the server should use
    pub reference_value: Vec<u8>,
    /// The shared secret, zeroized on drop
    secret_value: SecretBox<[u8]>,
}

impl PbmacCredential {
    /// Build a PBMAC credential from a reference value and secret bytes.
    /// `secret` is consumed and zeroized after copying into the secret box.
    pub fn new(reference_value: Vec<u8>, mut secret: Vec<u8>) -> Self {
        let boxed: Box<[u8]> = secret.clone().into_boxed_slice();
        secret.zeroize();
        Self {
            reference_value,
            secret_value: SecretBox::new(boxed),
        }
    }

    /// Borrow the secret value for the duration of a MAC computation
    pub fn expose_secret(&self) -> &[u8] {
        self.secret_value.expose_secret()
    }
}

/// Signature credential: the signer's certificate (for `senderKID` and
/// chain validation) plus its private key.
pub struct SignatureCredential {
    /// The signer's own certificate
    pub certificate: Certificate,
    /// The private key matching `certificate`'s public key
    pub private_key: SigningKey,
}

/// Either form of client credential the protection engine can apply.
pub enum Credentials {
    /// Password-based MAC credential
    Pbmac(PbmacCredential),
    /// Signature credential
    Signature(SignatureCredential),
}
