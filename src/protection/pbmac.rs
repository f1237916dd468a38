//! PBMAC1 (RFC 9044): PBKDF2-derived key, HMAC-SHA256 over the protected
//! portion of the message. Used when the context holds a shared secret
//! rather than a signing key.

use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{CmpError, ProtectionError, Result};

use super::credentials::PbmacCredential;

/// Default PBKDF2 iteration count when the caller does not override it.
/// Matches the historical CLI's compiled-in default for `-newkey`-less PBM
/// protection.
pub const DEFAULT_ITERATION_COUNT: u32 = 10_000;

/// Salt length in bytes for a freshly generated PBMAC1 parameter set.
pub const SALT_LEN: usize = 16;

/// Derived key length for HMAC-SHA256
const KEY_LEN: usize = 32;

/// PBMAC1 algorithm parameters as they travel in `protectionAlg.parameters`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbmac1Params {
    /// PBKDF2 salt
    pub salt: Vec<u8>,
    /// PBKDF2 iteration count
    pub iteration_count: u32,
}

impl Pbmac1Params {
    /// Generate fresh parameters for a new outbound message
    pub fn generate() -> Self {
        let mut salt = vec![0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self {
            salt,
            iteration_count: DEFAULT_ITERATION_COUNT,
        }
    }
}

fn derive_key(secret: &[u8], params: &Pbmac1Params) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(secret, &params.salt, params.iteration_count, &mut key);
    key
}

/// Compute the PBMAC1 tag over `protected_portion` using `credential` and `params`.
pub fn compute_mac(
    credential: &PbmacCredential,
    params: &Pbmac1Params,
    protected_portion: &[u8],
) -> Result<Vec<u8>> {
    let key = derive_key(credential.expose_secret(), params);
    let mut mac = Hmac::<Sha256>::new_from_slice(&key)
        .map_err(|_| CmpError::from(ProtectionError::BadProtection))?;
    mac.update(protected_portion);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify a received PBMAC1 tag in constant time.
pub fn verify_mac(
    credential: &PbmacCredential,
    params: &Pbmac1Params,
    protected_portion: &[u8],
    tag: &[u8],
) -> Result<()> {
    let expected = compute_mac(credential, params, protected_portion)?;
    ring::constant_time::verify_slices_are_equal(&expected, tag)
        .map_err(|_| CmpError::from(ProtectionError::BadProtection))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_round_trips() {
        let cred = PbmacCredential::new(b"ref".to_vec(), b"9pp8-b35i-Xd3Q-udNR".to_vec());
        let params = Pbmac1Params::generate();
        let tag = compute_mac(&cred, &params, b"protected bytes").unwrap();
        assert!(verify_mac(&cred, &params, b"protected bytes", &tag).is_ok());
    }

    #[test]
    fn altered_secret_fails_verification() {
        let cred = PbmacCredential::new(b"ref".to_vec(), b"9pp8-b35i-Xd3Q-udNR".to_vec());
        let wrong = PbmacCredential::new(b"ref".to_vec(), b"9pp8-b35i-Xd3Q-udNr".to_vec());
        let params = Pbmac1Params::generate();
        let tag = compute_mac(&cred, &params, b"protected bytes").unwrap();
        assert!(verify_mac(&wrong, &params, b"protected bytes", &tag).is_err());
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let cred = PbmacCredential::new(b"ref".to_vec(), b"9pp8-b35i-Xd3Q-udNR".to_vec());
        let params = Pbmac1Params::generate();
        let tag = compute_mac(&cred, &params, b"protected bytes").unwrap();
        assert!(verify_mac(&cred, &params, b"protected BYTES", &tag).is_err());
    }
}
