//! Cryptographic helpers: random tokens, digests and constant-time comparison

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Generate `len` cryptographically secure random bytes
pub fn generate_key(len: usize) -> Vec<u8> {
    let mut key = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

/// Random token of `byte_len` bytes, hex-encoded (so `2 * byte_len` chars)
pub fn generate_token(byte_len: usize) -> String {
    hex::encode(generate_key(byte_len))
}

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// SHA-256 digest of `data`
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 digest as lowercase hex
pub fn sha256_hex(data: &str) -> String {
    hex::encode(sha256(data.as_bytes()))
}
