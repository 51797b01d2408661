// Ordered log of handshake records; the input to both Finished MACs.

use crate::error::{TandemTrustError, Result};
use crate::handshake::messages::Message;

#[derive(Debug, Default, Clone)]
pub struct Transcript {
    log: Vec<u8>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes in call order.
    pub fn append(&mut self, bytes: &[u8]) {
        self.log.extend_from_slice(bytes);
    }

    /// Append the full encoded record of a handshake message. Application
    /// records never enter the transcript.
    pub fn append_message(&mut self, message: &Message) -> Result<()> {
        if !message.message_type().is_handshake() {
            return Err(TandemTrustError::UnexpectedMessage {
                expected: "handshake record",
                got: message.name(),
            });
        }
        self.append(&message.encode()?);
        Ok(())
    }

    /// The full ordered transcript so far.
    pub fn snapshot(&self) -> &[u8] {
        &self.log
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}
