// TandemTrust error types

use thiserror::Error;

/// Top-level error type for the TandemTrust crate.
#[derive(Debug, Error)]
pub enum TandemTrustError {
    // ── Crypto errors ───────────────────────────────────────────────────
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("signature verification failed")]
    SignatureVerification,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Covers bad length, bad padding and bad MAC alike.
    #[error("message authentication failed")]
    AuthenticationFailed,

    // ── Certificate errors ──────────────────────────────────────────────
    #[error("certificate is not signed by the trust anchor")]
    CertificateInvalid,

    #[error("certificate unreadable: {0}")]
    CertificateUnreadable(String),

    // ── Handshake errors ────────────────────────────────────────────────
    #[error("handshake transcript mismatch")]
    TranscriptMismatch,

    #[error("unexpected handshake message: expected {expected}, got {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },

    #[error("invalid handshake state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("message decode error: {0}")]
    MessageDecode(String),

    /// A length does not fit its wire prefix.
    #[error("encoding error: {0}")]
    Encoding(String),

    // ── Channel errors ──────────────────────────────────────────────────
    #[error("peer did not acknowledge the message")]
    UnexpectedAcknowledgement,

    // ── Key material loading ────────────────────────────────────────────
    #[error("key material error: {0}")]
    KeyMaterial(String),
}

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, TandemTrustError>;
