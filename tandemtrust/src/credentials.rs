// Local key material: a party's signing identity plus its CA-issued
// certificate, and the on-disk layout they are loaded from.
//
// Seed files hold the raw 32-byte Ed25519 seed. Certificate files hold the
// binary certificate encoding. The locations come from a JSON document:
//
//   { "identity_seed": "server.seed",
//     "certificate": "server.cert",
//     "trust_anchor": "ca.cert" }
//
// Relative paths resolve against the directory of the JSON file when loaded
// with `KeyMaterialConfig::from_file`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::cert::{Certificate, CertificateBuilder, TrustAnchor};
use crate::crypto::keys::IdentityKeyPair;
use crate::error::{TandemTrustError, Result};

/// File locations of one party's key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMaterialConfig {
    /// Raw 32-byte Ed25519 seed of the party's identity key.
    pub identity_seed: PathBuf,
    /// The party's certificate, issued by the trust anchor.
    pub certificate: PathBuf,
    /// Self-signed certificate of the trust anchor.
    pub trust_anchor: PathBuf,
}

impl KeyMaterialConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TandemTrustError::KeyMaterial(format!("config: {e}")))
    }

    /// Read a JSON config file, resolving relative paths against its directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            TandemTrustError::KeyMaterial(format!("{}: {e}", path.display()))
        })?;
        let config = Self::from_json(&json)?;
        match path.parent() {
            Some(base) => Ok(config.relative_to(base)),
            None => Ok(config),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TandemTrustError::KeyMaterial(format!("config: {e}")))
    }

    fn relative_to(self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        Self {
            identity_seed: resolve(self.identity_seed),
            certificate: resolve(self.certificate),
            trust_anchor: resolve(self.trust_anchor),
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| TandemTrustError::KeyMaterial(format!("{}: {e}", path.display())))
}

/// A party's identity key and the certificate binding it to a name.
#[derive(Debug)]
pub struct LocalCredentials {
    identity: IdentityKeyPair,
    certificate: Certificate,
    encoded_certificate: Vec<u8>,
}

impl LocalCredentials {
    /// Pair an identity with its certificate. The certificate must name the
    /// identity's public key.
    pub fn new(identity: IdentityKeyPair, certificate: Certificate) -> Result<Self> {
        if certificate.subject_public_key != identity.public_key_bytes() {
            return Err(TandemTrustError::KeyMaterial(format!(
                "certificate for {} does not match the identity key",
                certificate.subject
            )));
        }
        let encoded_certificate = certificate.encode()?;
        Ok(Self {
            identity,
            certificate,
            encoded_certificate,
        })
    }

    /// Generate a fresh identity for `subject` and have `ca` certify it.
    pub fn issue(ca: &IdentityKeyPair, issuer: &str, subject: &str) -> Result<Self> {
        let identity = IdentityKeyPair::generate();
        let certificate = CertificateBuilder::new(ca, issuer)
            .subject(subject)
            .subject_key(identity.public_key_bytes())
            .build()?;
        Self::new(identity, certificate)
    }

    /// Load the identity seed and certificate named by `config`.
    pub fn load(config: &KeyMaterialConfig) -> Result<Self> {
        let seed_bytes = Zeroizing::new(read_file(&config.identity_seed)?);
        let seed: &[u8; 32] = seed_bytes.as_slice().try_into().map_err(|_| {
            TandemTrustError::KeyMaterial(format!(
                "{}: seed must be 32 bytes, got {}",
                config.identity_seed.display(),
                seed_bytes.len()
            ))
        })?;
        let identity = IdentityKeyPair::from_seed(seed);
        let certificate = Certificate::decode(&read_file(&config.certificate)?)?;
        debug!(subject = %certificate.subject, "loaded local credentials");
        Self::new(identity, certificate)
    }

    pub fn identity(&self) -> &IdentityKeyPair {
        &self.identity
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn encoded_certificate(&self) -> &[u8] {
        &self.encoded_certificate
    }

    /// Sign `data` with the identity key.
    pub fn sign(&self, data: &[u8]) -> [u8; 64] {
        self.identity.sign(data)
    }
}

impl TrustAnchor {
    /// Load the self-signed anchor certificate named by `config`.
    pub fn load(config: &KeyMaterialConfig) -> Result<Self> {
        let cert = Certificate::decode(&read_file(&config.trust_anchor)?)?;
        let anchor = Self::from_certificate(&cert)?;
        debug!(anchor = %anchor.name(), "loaded trust anchor");
        Ok(anchor)
    }
}
