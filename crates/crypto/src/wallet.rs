//! Wallets: a key pair bundled with its derived address.

use crate::ecdsa::{PrivateKey, PublicKey};
use crate::Result;
use quorus_types::Transaction;
use std::fmt;

/// A wallet holding a P-256 key pair and its on-chain address.
pub struct Wallet {
    private_key: PrivateKey,
    public_key: PublicKey,
    address: String,
}

impl Wallet {
    /// Generates a fresh wallet.
    pub fn generate() -> Self {
        Self::from_private_key(PrivateKey::random())
    }

    /// Builds a wallet around an existing private key.
    pub fn from_private_key(private_key: PrivateKey) -> Self {
        let public_key = private_key.public_key();
        let address = public_key.to_address();
        Self {
            private_key,
            public_key,
            address,
        }
    }

    /// Restores a wallet from a hex-encoded private key.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        Ok(Self::from_private_key(PrivateKey::from_hex(hex_str)?))
    }

    /// Returns the wallet address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Returns the private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Signs a transaction with the wallet's private key.
    pub fn sign_transaction(&self, tx: &mut Transaction) -> Result<()> {
        tx.sign(self.private_key.signing_key())
            .map_err(|e| crate::CryptoError::Signature(e.to_string()))
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address: {}", self.address)
    }
}
