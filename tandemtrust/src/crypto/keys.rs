// Ed25519 identity keypairs: certificate subjects, CA issuers, DH value signing.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::{TandemTrustError, Result};

/// An Ed25519 identity keypair.
///
/// The same type backs a party's long-term signing key (bound to its
/// certificate) and the CA key that issues certificates.
#[derive(Debug)]
pub struct IdentityKeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl IdentityKeyPair {
    /// Generate a fresh random Ed25519 keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// The 32-byte Ed25519 public key.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// The 32-byte secret key seed.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Short printable fingerprint of the public key, for logs.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.public_key_bytes())
    }

    /// Sign arbitrary data.
    pub fn sign(&self, data: &[u8]) -> [u8; 64] {
        let sig: Signature = self.signing_key.sign(data);
        sig.to_bytes()
    }
}

/// First 8 bytes of SHA-256(public_key), hex encoded.
pub fn fingerprint(public_key: &[u8; 32]) -> String {
    let hash = Sha256::digest(public_key);
    hash[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Verify a signature given raw public key bytes, message, and signature bytes.
pub fn verify_signature(
    pubkey_bytes: &[u8; 32],
    message: &[u8],
    signature: &[u8; 64],
) -> Result<()> {
    let vk = VerifyingKey::from_bytes(pubkey_bytes)
        .map_err(|e| TandemTrustError::InvalidKey(format!("{e}")))?;
    let sig = Signature::from_bytes(signature);
    vk.verify(message, &sig)
        .map_err(|_| TandemTrustError::SignatureVerification)
}
