//! Shared utility functions

use rand::Rng;
use sha2::{Digest, Sha256};

/// Characters used for generated codes and keys.
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a cryptographically random alphanumeric string.
///
/// # Examples
///
/// ```
/// use gt_server::util::random_code;
///
/// let code = random_code(16);
/// assert_eq!(code.len(), 16);
/// assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
/// ```
pub fn random_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Lowercase hex SHA-256 of `input`.
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Whether `value` is a lowercase or uppercase hex string of `len` digits.
pub fn is_hex_digest(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_hexdigit())
}
