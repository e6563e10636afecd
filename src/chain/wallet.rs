//! Wallet identity.
//!
//! Parses the configured Ed25519 private key, derives the Aptos account
//! address and signs transaction messages. The key never leaves this module.

use ed25519_dalek::{Signer, SigningKey};
use secrecy::{ExposeSecret, SecretString};
use sha3::{Digest, Sha3_256};
use std::fmt;

use crate::types::Address;

/// AIP-80 prefix for Ed25519 private keys.
pub const PRIVATE_KEY_PREFIX: &str = "ed25519-priv-";

/// Authentication-key scheme byte for single Ed25519 keys.
const ED25519_SCHEME: u8 = 0x00;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("private key must start with \"ed25519-priv-\"")]
    MissingPrefix,

    #[error("private key is not valid hex")]
    InvalidHex,

    #[error("private key must be 32 bytes, got {0}")]
    WrongLength(usize),
}

pub struct Wallet {
    signing_key: SigningKey,
    address: Address,
}

impl Wallet {
    /// Parse an `ed25519-priv-0x…` key.
    pub fn from_private_key(key: &SecretString) -> Result<Self, WalletError> {
        let raw = key.expose_secret().trim();
        let body = raw
            .strip_prefix(PRIVATE_KEY_PREFIX)
            .ok_or(WalletError::MissingPrefix)?;
        let body = body.strip_prefix("0x").unwrap_or(body);

        let bytes = hex::decode(body).map_err(|_| WalletError::InvalidHex)?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| WalletError::WrongLength(bytes.len()))?;

        Ok(Self::from_seed(seed))
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let address = derive_address(signing_key.verifying_key().as_bytes());
        Self { signing_key, address }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.verifying_key().as_bytes()))
    }

    /// Sign raw bytes, returning a `0x`-prefixed 64-byte signature.
    pub fn sign_hex(&self, message: &[u8]) -> String {
        format!("0x{}", hex::encode(self.signing_key.sign(message).to_bytes()))
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// `sha3_256(public_key || scheme)`
fn derive_address(public_key: &[u8; 32]) -> Address {
    let mut hasher = Sha3_256::new();
    hasher.update(public_key);
    hasher.update([ED25519_SCHEME]);
    Address::from_bytes(hasher.finalize().into())
}
