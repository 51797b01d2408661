use std::time::Duration;

use tandemtrust::TandemTrustError;
use thiserror::Error;

/// All errors produced by the TandemStream session layer.
#[derive(Debug, Error)]
pub enum TandemStreamError {
    /// Transport failure other than an orderly close.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection is closed")]
    ConnectionClosed,

    #[error("record too large: {size} bytes exceeds maximum {max}")]
    RecordTooLarge { size: usize, max: usize },

    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    #[error("no message from peer within {0:?}")]
    ReceiveTimeout(Duration),

    /// Handshake, certificate or channel failure.
    #[error(transparent)]
    Trust(#[from] TandemTrustError),
}

impl TandemStreamError {
    /// The underlying trust error, if any.
    pub fn trust(&self) -> Option<&TandemTrustError> {
        match self {
            TandemStreamError::Trust(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TandemStreamError>;
