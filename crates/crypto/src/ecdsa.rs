//! ECDSA key pairs on NIST P-256.
//!
//! Keys are encoded the same way transactions carry them: public keys as
//! the fixed-width `X ‖ Y` coordinate pair (64 bytes), private keys as the
//! 32-byte scalar. Addresses are the first 20 bytes of `SHA256(X ‖ Y)`.

use crate::{CryptoError, Result};
use p256::ecdsa::{SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{EncodedPoint, FieldBytes, SecretKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Byte length of an encoded public key (X ‖ Y)
pub const PUBLIC_KEY_LEN: usize = 64;

/// Byte length of a derived address
pub const ADDRESS_LEN: usize = 20;

/// A P-256 private key.
#[derive(Clone)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generates a random private key using the OS CSPRNG.
    pub fn random() -> Self {
        let secret = SecretKey::random(&mut OsRng);
        Self {
            inner: SigningKey::from(secret),
        }
    }

    /// Creates a private key from its 32-byte scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let secret = SecretKey::from_bytes(bytes.into())
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self {
            inner: SigningKey::from(secret),
        })
    }

    /// Creates a private key from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)?;
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Self::from_bytes(&arr)
    }

    /// Returns the raw 32-byte scalar.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes().into()
    }

    /// Returns the hex-encoded scalar.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Derives the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: *self.inner.verifying_key(),
        }
    }

    /// Borrows the underlying signing key.
    pub fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the scalar.
        f.write_str("PrivateKey(..)")
    }
}

/// A P-256 public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl PublicKey {
    /// Returns the fixed-width `X ‖ Y` encoding (64 bytes).
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        let point = self.inner.to_encoded_point(false);
        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        // Skip the SEC1 0x04 prefix.
        bytes.copy_from_slice(&point.as_bytes()[1..]);
        bytes
    }

    /// Returns the hex-encoded `X ‖ Y` form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Reconstructs a public key from its `X ‖ Y` encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(CryptoError::InvalidLength {
                expected: PUBLIC_KEY_LEN,
                actual: bytes.len(),
            });
        }
        let point = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(&bytes[..32]),
            FieldBytes::from_slice(&bytes[32..]),
            false,
        );
        let inner = VerifyingKey::from_encoded_point(&point)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Reconstructs a public key from its hex `X ‖ Y` encoding.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Derives the on-chain address for this key.
    pub fn to_address(&self) -> String {
        derive_address(&self.to_bytes())
    }
}

/// Derives an address from an `X ‖ Y` public key encoding.
///
/// The address is the hex encoding of the first 20 bytes of the SHA-256
/// digest of the coordinate pair.
pub fn derive_address(public_key: &[u8]) -> String {
    let digest = Sha256::digest(public_key);
    hex::encode(&digest[..ADDRESS_LEN])
}
