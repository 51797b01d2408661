// Identity certificates: a subject name bound to an Ed25519 key, signed by a
// single certificate authority.

pub mod builder;
pub mod serializer;
pub mod validator;

use crate::crypto::keys::{verify_signature, IdentityKeyPair};
use crate::error::{TandemTrustError, Result};

pub use builder::CertificateBuilder;
pub use validator::{verify, CertificateVerifier};

// ── Certificate ──────────────────────────────────────────────────────────

/// A signed identity credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// Name of the party this certificate identifies.
    pub subject: String,
    /// The subject's Ed25519 public key; signs the subject's DH values.
    pub subject_public_key: [u8; 32],
    /// Name of the issuing authority.
    pub issuer: String,
    /// Issuer's Ed25519 signature over [`Certificate::signable_bytes`].
    pub signature: [u8; 64],
}

impl Certificate {
    /// The certificate encoding version.
    pub const VERSION: u8 = 1;

    /// Produce the byte content that is signed (everything except the signature field).
    /// This MUST match the order used by the serializer for the signed portion.
    pub fn signable_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(128);
        buf.push(Self::VERSION);
        put_name(&mut buf, &self.subject)?;
        buf.extend_from_slice(&self.subject_public_key);
        put_name(&mut buf, &self.issuer)?;
        Ok(buf)
    }

    /// Compact binary form (see [`serializer`]).
    pub fn encode(&self) -> Result<Vec<u8>> {
        serializer::serialize(self)
    }

    /// Parse the compact binary form.
    pub fn decode(data: &[u8]) -> Result<Self> {
        serializer::deserialize(data)
    }

    /// Issuer and subject coincide.
    pub fn is_self_signed(&self) -> bool {
        self.issuer == self.subject
    }
}

/// Names carry a u16 length prefix.
pub(crate) fn put_name(buf: &mut Vec<u8>, name: &str) -> Result<()> {
    let bytes = name.as_bytes();
    let len = u16::try_from(bytes.len()).map_err(|_| {
        TandemTrustError::Encoding(format!("name of {} bytes exceeds u16 prefix", bytes.len()))
    })?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

// ── Trust anchor ─────────────────────────────────────────────────────────

/// The one CA every peer certificate must chain to directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    name: String,
    public_key: [u8; 32],
}

impl TrustAnchor {
    pub fn new(name: impl Into<String>, public_key: [u8; 32]) -> Self {
        Self {
            name: name.into(),
            public_key,
        }
    }

    /// Anchor for a CA whose keypair is at hand (tests, demo).
    pub fn from_identity(name: impl Into<String>, ca: &IdentityKeyPair) -> Self {
        Self::new(name, ca.public_key_bytes())
    }

    /// Anchor from a self-signed CA certificate. The self-signature is checked.
    pub fn from_certificate(cert: &Certificate) -> Result<Self> {
        if !cert.is_self_signed() {
            return Err(TandemTrustError::CertificateInvalid);
        }
        let signable = cert
            .signable_bytes()
            .map_err(|_| TandemTrustError::CertificateInvalid)?;
        verify_signature(&cert.subject_public_key, &signable, &cert.signature)
            .map_err(|_| TandemTrustError::CertificateInvalid)?;
        Ok(Self::new(cert.subject.clone(), cert.subject_public_key))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }
}
