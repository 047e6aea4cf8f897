//! SHA-256 hashing helpers.
//!
//! Every digest in Quorus — transaction hashes, block hashes, Merkle nodes,
//! contract addresses, channel signatures — is a SHA-256 over a canonical
//! byte string. This module provides the shared primitives.

use sha2::{Digest, Sha256};

/// Size of a SHA-256 digest in bytes
pub const HASH_SIZE: usize = 32;

/// Computes the SHA-256 digest of the given data.
pub fn sha256(data: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes the SHA-256 digest of multiple data slices.
///
/// This is more efficient than concatenating the slices first.
pub fn sha256_concat(data: &[&[u8]]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha256::new();
    for slice in data {
        hasher.update(slice);
    }
    hasher.finalize().into()
}

/// Computes the SHA-256 digest and returns it hex-encoded.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}
