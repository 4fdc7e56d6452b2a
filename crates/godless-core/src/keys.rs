use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CryptoError;

/// Opaque printable identifier for a public key, used wherever a key
/// needs to be named without exposing the raw bytes (e.g. query
/// `PublicKeys` lists).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKeyHash(pub String);

impl fmt::Display for PublicKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A private signing key. Produces one `SignatureText` per call to `sign`.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    pub fn generate<R: rand_core::RngCore + rand_core::CryptoRng>(rng: &mut R) -> Self {
        Self(SigningKey::generate(rng))
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(SigningKey::from_bytes(bytes))
    }

    /// The raw 32-byte scalar. Exposed so a key-store implementation can
    /// persist and reload a specific private key across process restarts.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// Sign `text`, returning the printable signature form.
    ///
    /// `ed25519-dalek` signing is infallible for well-formed keys, but the
    /// signature is kept fallible (`SignFailed`) so a future key backend
    /// that can fail (e.g. an HSM round-trip) fits the same call shape.
    pub fn sign(&self, text: &str) -> Result<crate::point::SignatureText, CryptoError> {
        let sig = self.0.sign(text.as_bytes());
        Ok(crate::point::SignatureText(hex::encode(sig.to_bytes())))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({})", self.public_key().to_hash())
    }
}

/// A public verifying key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|e| CryptoError::BadSignature(e.to_string()))
    }

    pub fn to_hash(&self) -> PublicKeyHash {
        PublicKeyHash(hex::encode(self.0.to_bytes()))
    }

    /// Verify that `sig` (in printable form) is a valid signature over
    /// `text` under this key.
    pub fn verify(&self, text: &str, sig: &crate::point::SignatureText) -> bool {
        let Ok(raw) = hex::decode(&sig.0) else {
            return false;
        };
        let Ok(bytes) = <[u8; 64]>::try_from(raw.as_slice()) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&bytes);
        self.0.verify(text.as_bytes(), &signature).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hash())
    }
}
