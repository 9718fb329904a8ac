//! Cryptographic Utilities

use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

/// Generate cryptographically secure random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Random token of `bytes` entropy bytes, hex-encoded (lowercase)
///
/// 32 bytes gives a 256-bit, 64-character token.
pub fn random_token_hex(bytes: usize) -> String {
    hex::encode(random_bytes(bytes))
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Short non-reversible fingerprint of a secret, safe to put in logs
pub fn log_fingerprint(secret: &str) -> String {
    hex::encode(&sha256(secret.as_bytes())[..6])
}
