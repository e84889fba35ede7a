//! Secret derivation shared by the owner gate and shop-owner accounts.
//!
//! Secrets are verified against an Argon2id hash with a random per-record
//! salt; both are stored base64-encoded.

use argon2::Argon2;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::RngCore;
use zeroize::Zeroizing;

pub const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
#[error("failed to derive credential hash")]
pub struct KdfError;

pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

pub fn encode(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Derive the base64 hash for a secret and salt.
pub fn derive_hash(secret: &str, salt: &[u8]) -> Result<String, KdfError> {
    let mut derived = Zeroizing::new([0u8; HASH_LEN]);
    Argon2::default()
        .hash_password_into(secret.as_bytes(), salt, &mut derived[..])
        .map_err(|_| KdfError)?;
    Ok(BASE64.encode(&derived[..]))
}

/// Check a secret against a stored base64 salt and hash. Undecodable
/// records simply fail verification.
pub fn verify(secret: &str, salt_b64: &str, hash_b64: &str) -> bool {
    let Ok(salt) = BASE64.decode(salt_b64) else {
        return false;
    };
    match derive_hash(secret, &salt) {
        Ok(candidate) => candidate == hash_b64,
        Err(_) => false,
    }
}
