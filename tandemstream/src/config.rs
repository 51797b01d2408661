use std::time::Duration;

/// Configuration for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound on each handshake record receive.
    pub handshake_timeout: Duration,
    /// Bound on each application record receive, acknowledgements included.
    pub receive_timeout: Duration,
    /// Largest record body accepted from the peer.
    pub max_record_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            receive_timeout: Duration::from_secs(30),
            max_record_size: 1024 * 1024,
        }
    }
}
