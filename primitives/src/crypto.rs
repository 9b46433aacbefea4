//! Cryptographic operations and account key material.
//!
//! - Ed25519 for account signatures (transactions and query certificates)
//! - SHA-256 for transaction envelope hashing
//! - BLAKE3 for key derivation from seed phrases and general hashing

use core::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::{PrimitiveError, PrimitiveResult};
use crate::types::{bytes_from_hex, to_hex, Address, Hash};

/// BLAKE3 key-derivation context for seed phrases.
const SEED_DERIVATION_CONTEXT: &str = "deploykit 2024-01 account seed";

/// Compute BLAKE3 hash of the input data.
pub fn hash_blake3(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Compute SHA-256 hash of the input data.
pub fn hash_sha256(data: &[u8]) -> Hash {
    use sha2::Digest;
    let result = sha2::Sha256::digest(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Verify an Ed25519 signature.
///
/// Returns `true` if the signature is valid for the given message and
/// public key, `false` otherwise (including malformed public keys).
pub fn verify_ed25519(message: &[u8], signature: &[u8; 64], public_key: &[u8; 32]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let sig = Signature::from_bytes(signature);
    verifying_key.verify(message, &sig).is_ok()
}

/// A signing identity: an ed25519 keypair and the address derived from it.
///
/// Created once per run (ephemeral) or loaded from a known seed; never
/// persisted by this crate.
#[derive(Clone)]
pub struct Account {
    signing_key: SigningKey,
}

impl Account {
    /// Generate a fresh account from OS randomness.
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Derive a deterministic account from a seed phrase such as `//Alice`.
    pub fn from_seed_phrase(phrase: &str) -> Self {
        let secret = blake3::derive_key(SEED_DERIVATION_CONTEXT, phrase.as_bytes());
        Self::from_secret(secret)
    }

    /// Build an account from raw secret key bytes.
    pub fn from_secret(secret: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&secret),
        }
    }

    /// Build an account from a hex-encoded 32-byte secret.
    pub fn from_secret_hex(s: &str) -> PrimitiveResult<Self> {
        let bytes = bytes_from_hex(s)?;
        let secret: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            PrimitiveError::InvalidKey(format!("secret must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_secret(secret))
    }

    /// Address of this account (the verifying key bytes).
    pub fn address(&self) -> Address {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.address()
    }

    /// Hex-encoded secret, for printing an ephemeral account so it can be recovered.
    pub fn secret_hex(&self) -> String {
        to_hex(&self.signing_key.to_bytes())
    }

    /// Sign a message with this account's key.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &to_hex(&self.address()))
            .finish_non_exhaustive()
    }
}
