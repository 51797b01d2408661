// Handshake state machine states and roles.

use std::fmt;

/// The current state of a handshake.
///
/// The initiator walks `Init -> NonceSent -> PeerCredentialsReceived ->
/// LocalCredentialsSent -> KeysDerived -> FinishReceived -> FinishSent ->
/// Established`; the responder walks `Init -> NonceReceived ->
/// LocalCredentialsSent -> PeerCredentialsReceived -> KeysDerived ->
/// FinishSent -> FinishReceived -> Established`. Any failure lands in
/// `Aborted`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Nothing sent or received yet.
    Init,
    /// Initiator has sent its nonce.
    NonceSent,
    /// Responder has received the initiator's nonce.
    NonceReceived,
    /// Peer certificate, DH value and signature accepted.
    PeerCredentialsReceived,
    /// Own certificate, DH value and signature sent.
    LocalCredentialsSent,
    /// Shared secret computed and session keys derived.
    KeysDerived,
    /// Own Finished MAC sent.
    FinishSent,
    /// Peer Finished MAC verified.
    FinishReceived,
    /// Both Finished MACs verified; the channel may be used.
    Established,
    /// A fatal error occurred. No further messages are produced.
    Aborted,
}

impl HandshakeState {
    /// Human-readable label for the current state (used in error messages).
    pub fn label(&self) -> &'static str {
        match self {
            HandshakeState::Init => "Init",
            HandshakeState::NonceSent => "NonceSent",
            HandshakeState::NonceReceived => "NonceReceived",
            HandshakeState::PeerCredentialsReceived => "PeerCredentialsReceived",
            HandshakeState::LocalCredentialsSent => "LocalCredentialsSent",
            HandshakeState::KeysDerived => "KeysDerived",
            HandshakeState::FinishSent => "FinishSent",
            HandshakeState::FinishReceived => "FinishReceived",
            HandshakeState::Established => "Established",
            HandshakeState::Aborted => "Aborted",
        }
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which side of the handshake a party plays.
///
/// The initiator is the client and the responder is the server; the role
/// decides which half of the session key set is used for sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => f.write_str("initiator"),
            Role::Responder => f.write_str("responder"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_display() {
        for state in [
            HandshakeState::Init,
            HandshakeState::NonceSent,
            HandshakeState::KeysDerived,
            HandshakeState::Established,
            HandshakeState::Aborted,
        ] {
            assert_eq!(state.to_string(), state.label());
        }
    }
}
