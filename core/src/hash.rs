//! Digests used by SigV4.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// Hex encoded SHA256 of an empty payload.
pub const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Lowercase hex SHA256 of `content`.
pub fn hex_sha256(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

fn hmac(key: &[u8], content: &[u8]) -> Hmac<Sha256> {
    // HMAC takes keys of any length, the error is unreachable.
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("hmac accepts keys of any size");
    mac.update(content);
    mac
}

/// Raw HMAC-SHA256 of `content`, used to chain signing keys.
pub fn hmac_sha256(key: &[u8], content: &[u8]) -> Vec<u8> {
    hmac(key, content).finalize().into_bytes().to_vec()
}

/// Lowercase hex HMAC-SHA256 of `content`.
pub fn hex_hmac_sha256(key: &[u8], content: &[u8]) -> String {
    hex::encode(hmac(key, content).finalize().into_bytes())
}
