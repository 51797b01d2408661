// Certificate validation against a single trust anchor. One hop only: the
// peer certificate must be issued directly by the anchor.

use tracing::debug;

use crate::cert::{Certificate, TrustAnchor};
use crate::crypto::keys::{fingerprint, verify_signature};
use crate::error::{TandemTrustError, Result};

/// Verify an already parsed certificate against `anchor`.
///
/// Fails with `CertificateInvalid` when the issuer is not the anchor or the
/// signature does not verify under the anchor's key.
pub fn verify_certificate(cert: &Certificate, anchor: &TrustAnchor) -> Result<()> {
    if cert.issuer != anchor.name() {
        debug!(
            subject = %cert.subject,
            issuer = %cert.issuer,
            anchor = %anchor.name(),
            "certificate issuer is not the trust anchor"
        );
        return Err(TandemTrustError::CertificateInvalid);
    }
    let signable = cert
        .signable_bytes()
        .map_err(|_| TandemTrustError::CertificateInvalid)?;
    verify_signature(anchor.public_key(), &signable, &cert.signature)
        .map_err(|_| TandemTrustError::CertificateInvalid)
}

/// Parse `encoded` and verify it against `anchor`, returning the certificate.
///
/// Fails with `CertificateUnreadable` when parsing fails.
pub fn verify(encoded: &[u8], anchor: &TrustAnchor) -> Result<Certificate> {
    let cert = Certificate::decode(encoded)?;
    verify_certificate(&cert, anchor)?;
    Ok(cert)
}

/// Holds the configured trust anchor for one handshake.
#[derive(Debug, Clone)]
pub struct CertificateVerifier {
    anchor: TrustAnchor,
}

impl CertificateVerifier {
    pub fn new(anchor: TrustAnchor) -> Self {
        Self { anchor }
    }

    /// See [`verify`].
    pub fn verify(&self, encoded: &[u8]) -> Result<Certificate> {
        let cert = verify(encoded, &self.anchor)?;
        debug!(
            subject = %cert.subject,
            key = %fingerprint(&cert.subject_public_key),
            "peer certificate verified"
        );
        Ok(cert)
    }
}
