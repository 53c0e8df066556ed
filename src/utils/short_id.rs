//! 短链接标识符生成
//!
//! Identifiers are the URL-safe base64 encoding of a 128-bit digest, cut to a
//! fixed length. The digest input is the URL followed by either the owner
//! identity (owner-scoped mode) or a one-byte attempt counter (legacy,
//! owner-less mode).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// Base64 URL-safe alphabet identifiers are drawn from.
pub const SHORT_ID_ALPHABET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// 128 bits encode to 22 base64 characters without padding.
pub const MAX_SHORT_ID_LENGTH: usize = 22;

/// Attempt ceiling for the owner-less counter loop.
pub const MAX_DERIVE_ATTEMPTS: u8 = 10;

fn digest_128(parts: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let full = hasher.finalize();
    let mut out = [0u8; 16];
    out.copy_from_slice(&full[..16]);
    out
}

fn encode(digest: &[u8; 16], length: usize) -> String {
    let mut encoded = URL_SAFE_NO_PAD.encode(digest);
    encoded.truncate(length.min(MAX_SHORT_ID_LENGTH));
    encoded
}

/// Derive the identifier for `(url, owner_uuid)`. Deterministic.
pub fn derive(url: &str, owner_uuid: &str, length: usize) -> String {
    encode(&digest_128(&[url.as_bytes(), owner_uuid.as_bytes()]), length)
}

/// Owner-less variant: `counter` is appended to the digest input so that a
/// caller can step to the next candidate after a collision.
pub fn derive_with_counter(url: &str, counter: u8, length: usize) -> String {
    encode(&digest_128(&[url.as_bytes(), &[counter]]), length)
}

/// Candidates tried, in order, by the owner-less create loop.
pub fn candidates(url: &str, length: usize) -> impl Iterator<Item = String> + '_ {
    (1..=MAX_DERIVE_ATTEMPTS).map(move |counter| derive_with_counter(url, counter, length))
}

pub fn is_valid_short_id(id: &str, length: usize) -> bool {
    id.len() == length && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
