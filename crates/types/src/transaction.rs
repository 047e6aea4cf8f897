//! Value-transfer transactions with ECDSA P-256 signing.
//!
//! A [`Transaction`] moves `amount` coins from `from` to `to`, with an
//! optional `fee` paid by the sender. Coinbase and block-reward transactions
//! carry an empty `from` and no signature; everything else must be signed
//! with the sender's P-256 key.

use crate::hash::{sha256, HASH_SIZE};
use crate::{Error, Result};
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{EncodedPoint, FieldBytes};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte length of an encoded signature (r ‖ s) and of an encoded public key (X ‖ Y).
pub const ENCODED_LEN: usize = 64;

/// A value-transfer transaction.
///
/// The canonical hash covers `from`, `to`, `amount`, and `fee` (amounts
/// rendered with eight fractional digits), so mutating any of those fields
/// after signing invalidates the signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender address; empty for coinbase/reward transactions
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Transferred amount
    pub amount: f64,
    /// Transaction fee paid by the sender
    #[serde(default)]
    pub fee: f64,
    /// Hex-encoded signature (r ‖ s, 64 bytes); empty when unsigned
    #[serde(default)]
    pub signature: String,
    /// Hex-encoded public key (X ‖ Y, 64 bytes); empty when unsigned
    #[serde(default)]
    pub public_key: String,
    /// Contract call payload in the form `function:arg1,arg2,...`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_data: Option<String>,
}

impl Transaction {
    /// Creates a new transaction with no fee.
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: f64) -> Self {
        Self::new_with_fee(from, to, amount, 0.0)
    }

    /// Creates a new transaction with a fee.
    pub fn new_with_fee(
        from: impl Into<String>,
        to: impl Into<String>,
        amount: f64,
        fee: f64,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
            fee,
            signature: String::new(),
            public_key: String::new(),
            contract_data: None,
        }
    }

    /// Attaches a contract call payload (`function:arg1,arg2,...`).
    pub fn with_contract_data(mut self, data: impl Into<String>) -> Self {
        self.contract_data = Some(data.into());
        self
    }

    /// Checks whether this is a coinbase/reward transaction (empty sender).
    pub fn is_coinbase(&self) -> bool {
        self.from.is_empty()
    }

    /// Returns the total cost for the sender (amount + fee).
    pub fn total_cost(&self) -> f64 {
        self.amount + self.fee
    }

    /// Computes the canonical SHA-256 hash of the transaction.
    ///
    /// The preimage is `from ‖ to ‖ amount ‖ fee` with both amounts rendered
    /// at eight fractional digits.
    pub fn hash(&self) -> [u8; HASH_SIZE] {
        let data = format!("{}{}{:.8}{:.8}", self.from, self.to, self.amount, self.fee);
        sha256(data.as_bytes())
    }

    /// Returns the canonical hash as a hex string.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }

    /// Signs the transaction and stores the signature and public key.
    ///
    /// The signature is computed over the canonical hash and encoded as the
    /// concatenation of the fixed-width big-endian `r` and `s` scalars. The
    /// public key is stored as `X ‖ Y` for later verification.
    pub fn sign(&mut self, key: &SigningKey) -> Result<()> {
        let digest = self.hash();
        let signature: Signature = key
            .sign_prehash(&digest)
            .map_err(|e| Error::Signature(e.to_string()))?;
        self.signature = hex::encode(signature.to_bytes());

        let point = VerifyingKey::from(key).to_encoded_point(false);
        // Skip the SEC1 0x04 prefix: the stored form is the raw X ‖ Y coordinates.
        self.public_key = hex::encode(&point.as_bytes()[1..]);
        Ok(())
    }

    /// Verifies the stored signature against the stored public key.
    ///
    /// Returns `false` for unsigned transactions and for any signature or
    /// public key whose decoded length is not exactly 64 bytes.
    pub fn verify(&self) -> bool {
        if self.signature.is_empty() || self.public_key.is_empty() {
            return false;
        }

        let Ok(key_bytes) = hex::decode(&self.public_key) else {
            return false;
        };
        if key_bytes.len() != ENCODED_LEN {
            return false;
        }

        let Ok(sig_bytes) = hex::decode(&self.signature) else {
            return false;
        };
        if sig_bytes.len() != ENCODED_LEN {
            return false;
        }

        let point = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(&key_bytes[..32]),
            FieldBytes::from_slice(&key_bytes[32..]),
            false,
        );
        let verifying_key = match VerifyingKey::from_encoded_point(&point) {
            Ok(key) => key,
            Err(_) => return false,
        };

        let signature = match Signature::from_slice(&sig_bytes) {
            Ok(sig) => sig,
            Err(_) => return false,
        };

        verifying_key.verify_prehash(&self.hash(), &signature).is_ok()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fee > 0.0 {
            write!(
                f,
                "From: {}, To: {}, Amount: {:.2}, Fee: {:.2}",
                self.from, self.to, self.amount, self.fee
            )
        } else {
            write!(
                f,
                "From: {}, To: {}, Amount: {:.2}",
                self.from, self.to, self.amount
            )
        }
    }
}
