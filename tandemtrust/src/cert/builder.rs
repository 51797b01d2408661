// Certificate builder: fluent API for issuing a certificate signed by a CA key.

use crate::cert::Certificate;
use crate::crypto::keys::IdentityKeyPair;
use crate::error::{TandemTrustError, Result};

/// Builder for issuing a [`Certificate`].
///
/// # Example
/// ```ignore
/// let cert = CertificateBuilder::new(&ca_keypair, "Tandem Root CA")
///     .subject("server")
///     .subject_key(server_keypair.public_key_bytes())
///     .build()?;
/// ```
pub struct CertificateBuilder<'a> {
    issuer_key: &'a IdentityKeyPair,
    issuer: String,
    subject: Option<String>,
    subject_public_key: Option<[u8; 32]>,
}

impl<'a> CertificateBuilder<'a> {
    /// Start building a certificate that `issuer_key` will sign as `issuer`.
    pub fn new(issuer_key: &'a IdentityKeyPair, issuer: impl Into<String>) -> Self {
        Self {
            issuer_key,
            issuer: issuer.into(),
            subject: None,
            subject_public_key: None,
        }
    }

    /// Self-signed root certificate for a CA.
    pub fn self_signed(ca: &'a IdentityKeyPair, name: &str) -> Result<Certificate> {
        Self::new(ca, name)
            .subject(name)
            .subject_key(ca.public_key_bytes())
            .build()
    }

    pub fn subject(mut self, name: impl Into<String>) -> Self {
        self.subject = Some(name.into());
        self
    }

    pub fn subject_key(mut self, public_key: [u8; 32]) -> Self {
        self.subject_public_key = Some(public_key);
        self
    }

    /// Consume the builder and produce a signed [`Certificate`].
    pub fn build(self) -> Result<Certificate> {
        let subject = self
            .subject
            .ok_or_else(|| TandemTrustError::KeyMaterial("certificate subject is required".into()))?;
        let subject_public_key = self.subject_public_key.ok_or_else(|| {
            TandemTrustError::KeyMaterial("certificate subject key is required".into())
        })?;

        for name in [&subject, &self.issuer] {
            if name.is_empty() || name.len() > u16::MAX as usize {
                return Err(TandemTrustError::KeyMaterial(format!(
                    "certificate name length {} out of range",
                    name.len()
                )));
            }
        }

        let mut cert = Certificate {
            subject,
            subject_public_key,
            issuer: self.issuer,
            signature: [0u8; 64],
        };
        cert.signature = self.issuer_key.sign(&cert.signable_bytes()?);
        Ok(cert)
    }
}
