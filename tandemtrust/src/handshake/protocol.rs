// Handshake protocol: five records, certificate-authenticated DH, HMAC Finished.
//
//   Initiator                               Responder
//     |--- ClientNonce ------------------------>|
//     |<-- Credentials (cert, g^b, sig) --------|
//     |--- Credentials (cert, g^a, sig) ------->|
//     |<-- Finished HMAC(server MAC, t[1..3]) --|
//     |--- Finished HMAC(client MAC, t[1..4]) ->|
//     |========== sealed application data ======|
//
// Both roles share `HandshakeCore`; the drivers only differ in message order.

use std::sync::Arc;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::cert::{Certificate, CertificateVerifier, TrustAnchor};
use crate::channel::SecureChannel;
use crate::credentials::LocalCredentials;
use crate::crypto::dh::{validate_public_value, DhKeyPair, PublicValue, EXPONENT_LEN};
use crate::crypto::key_schedule::{derive_session_keys, generate_nonce, Nonce, SessionKeySet};
use crate::crypto::keys::verify_signature;
use crate::crypto::mac::{hmac_sha256, verify_hmac_sha256, MAC_LEN};
use crate::error::{TandemTrustError, Result};
use crate::handshake::messages::{Credentials, Message};
use crate::handshake::state::{HandshakeState, Role};
use crate::handshake::transcript::Transcript;

// ── Shared core ──────────────────────────────────────────────────────────

struct HandshakeCore {
    role: Role,
    credentials: Arc<LocalCredentials>,
    verifier: CertificateVerifier,
    transcript: Transcript,
    state: HandshakeState,
    nonce: Option<Nonce>,
    fixed_exponent: Option<Zeroizing<[u8; EXPONENT_LEN]>>,
    dh: Option<DhKeyPair>,
    peer_certificate: Option<Certificate>,
    peer_dh_public: Option<PublicValue>,
    keys: Option<SessionKeySet>,
}

impl HandshakeCore {
    fn new(role: Role, credentials: Arc<LocalCredentials>, anchor: TrustAnchor) -> Self {
        Self {
            role,
            credentials,
            verifier: CertificateVerifier::new(anchor),
            transcript: Transcript::new(),
            state: HandshakeState::Init,
            nonce: None,
            fixed_exponent: None,
            dh: None,
            peer_certificate: None,
            peer_dh_public: None,
            keys: None,
        }
    }

    fn expect_state(&self, expected: HandshakeState, next: HandshakeState) -> Result<()> {
        if self.state != expected {
            return Err(TandemTrustError::InvalidStateTransition {
                from: self.state.label().into(),
                to: next.label().into(),
            });
        }
        Ok(())
    }

    fn transition(&mut self, next: HandshakeState) {
        debug!(role = %self.role, from = %self.state, to = %next, "handshake transition");
        self.state = next;
    }

    /// Run one step; any error aborts the handshake and wipes secrets.
    fn step<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = f(self);
        if let Err(e) = &result {
            if self.state != HandshakeState::Aborted {
                warn!(role = %self.role, state = %self.state, error = %e, "handshake aborted");
            }
            self.state = HandshakeState::Aborted;
            self.dh = None;
            self.fixed_exponent = None;
            self.keys = None;
        }
        result
    }

    /// Verify a peer Credentials record and remember its DH value.
    fn accept_peer_credentials(&mut self, message: &Message) -> Result<()> {
        let Message::Credentials(creds) = message else {
            return Err(TandemTrustError::UnexpectedMessage {
                expected: "Credentials",
                got: message.name(),
            });
        };
        self.transcript.append_message(message)?;

        let cert = self.verifier.verify(&creds.certificate)?;
        verify_signature(&cert.subject_public_key, &creds.dh_public, &creds.signature)?;
        validate_public_value(&creds.dh_public)?;

        debug!(role = %self.role, peer = %cert.subject, "peer credentials accepted");
        self.peer_dh_public = Some(creds.dh_public);
        self.peer_certificate = Some(cert);
        self.transition(HandshakeState::PeerCredentialsReceived);
        Ok(())
    }

    /// Generate the DH pair (lazily) and build the local Credentials record.
    fn local_credentials(&mut self) -> Result<Message> {
        let dh = match self.fixed_exponent.take() {
            Some(exponent) => DhKeyPair::from_private_exponent(*exponent),
            None => DhKeyPair::generate(),
        };
        let dh_public = *dh.public_value();
        self.dh = Some(dh);

        let message = Message::Credentials(Credentials {
            certificate: self.credentials.encoded_certificate().to_vec(),
            dh_public,
            signature: self.credentials.sign(&dh_public),
        });
        self.transcript.append_message(&message)?;
        self.transition(HandshakeState::LocalCredentialsSent);
        Ok(message)
    }

    /// Consume the DH pair and derive the session keys.
    fn derive_keys(&mut self) -> Result<()> {
        let from = self.state.label();
        let invalid = || TandemTrustError::InvalidStateTransition {
            from: from.into(),
            to: HandshakeState::KeysDerived.label().into(),
        };
        let dh = self.dh.take().ok_or_else(invalid)?;
        let peer = self.peer_dh_public.ok_or_else(invalid)?;
        let nonce = self.nonce.ok_or_else(invalid)?;

        let shared = dh.diffie_hellman(&peer)?;
        self.keys = Some(derive_session_keys(&nonce, &shared)?);
        self.transition(HandshakeState::KeysDerived);
        Ok(())
    }

    fn keys(&self) -> Result<&SessionKeySet> {
        self.keys
            .as_ref()
            .ok_or_else(|| TandemTrustError::KeyDerivation("session keys not derived".into()))
    }

    /// Finished MAC over the transcript so far, keyed by the sender's MAC key.
    fn finished_mac(&self, sender: Role) -> Result<[u8; MAC_LEN]> {
        let keys = self.keys()?;
        let key = match sender {
            Role::Responder => &keys.server_mac,
            Role::Initiator => &keys.client_mac,
        };
        hmac_sha256(key, &[self.transcript.snapshot()])
    }

    /// Check a peer Finished record against the locally recomputed MAC.
    fn verify_finished(&mut self, message: &Message, sender: Role) -> Result<()> {
        let Message::Finished(mac) = message else {
            return Err(TandemTrustError::UnexpectedMessage {
                expected: "Finished",
                got: message.name(),
            });
        };
        let keys = self.keys()?;
        let key = match sender {
            Role::Responder => &keys.server_mac,
            Role::Initiator => &keys.client_mac,
        };
        if !verify_hmac_sha256(key, self.transcript.snapshot(), mac)? {
            return Err(TandemTrustError::TranscriptMismatch);
        }
        self.transcript.append_message(message)?;
        self.transition(HandshakeState::FinishReceived);
        Ok(())
    }

    fn send_finished(&mut self) -> Result<Message> {
        let message = Message::Finished(self.finished_mac(self.role)?);
        self.transcript.append_message(&message)?;
        self.transition(HandshakeState::FinishSent);
        Ok(message)
    }

    fn establish(&mut self) {
        self.transition(HandshakeState::Established);
        if let Some(peer) = &self.peer_certificate {
            info!(role = %self.role, peer = %peer.subject, "handshake established");
        }
    }

    fn into_channel(self) -> Result<SecureChannel> {
        self.into_established().map(|(channel, _)| channel)
    }

    fn into_established(self) -> Result<(SecureChannel, Certificate)> {
        let not_established = || TandemTrustError::InvalidStateTransition {
            from: self.state.label().into(),
            to: "Channel".into(),
        };
        if self.state != HandshakeState::Established {
            return Err(not_established());
        }
        let keys = self.keys.as_ref().ok_or_else(not_established)?;
        let peer = self.peer_certificate.clone().ok_or_else(not_established)?;
        Ok((SecureChannel::new(self.role, keys), peer))
    }
}

// ── Initiator ────────────────────────────────────────────────────────────

/// Client side of the handshake. Originates the nonce.
pub struct Initiator {
    core: HandshakeCore,
}

impl Initiator {
    pub fn new(credentials: Arc<LocalCredentials>, anchor: TrustAnchor) -> Self {
        Self {
            core: HandshakeCore::new(Role::Initiator, credentials, anchor),
        }
    }

    /// Deterministic construction: the nonce and DH exponent are injected
    /// instead of drawn from the OS RNG.
    pub fn with_fixed_secrets(
        credentials: Arc<LocalCredentials>,
        anchor: TrustAnchor,
        nonce: Nonce,
        exponent: [u8; EXPONENT_LEN],
    ) -> Self {
        let mut initiator = Self::new(credentials, anchor);
        initiator.core.nonce = Some(nonce);
        initiator.core.fixed_exponent = Some(Zeroizing::new(exponent));
        initiator
    }

    /// Message 1: emit the nonce.
    pub fn start(&mut self) -> Result<Message> {
        self.core.step(|core| {
            core.expect_state(HandshakeState::Init, HandshakeState::NonceSent)?;
            let nonce = *core.nonce.get_or_insert_with(generate_nonce);
            let message = Message::ClientNonce(nonce);
            core.transcript.append_message(&message)?;
            core.transition(HandshakeState::NonceSent);
            Ok(message)
        })
    }

    /// Message 2 in, message 3 out: verify the responder, send our own
    /// credentials, derive the session keys.
    pub fn process_credentials(&mut self, message: &Message) -> Result<Message> {
        self.core.step(|core| {
            core.expect_state(HandshakeState::NonceSent, HandshakeState::PeerCredentialsReceived)?;
            core.accept_peer_credentials(message)?;
            let reply = core.local_credentials()?;
            core.derive_keys()?;
            Ok(reply)
        })
    }

    /// Message 4 in, message 5 out: verify the responder's Finished, reply
    /// with ours and reach `Established`.
    pub fn process_finished(&mut self, message: &Message) -> Result<Message> {
        self.core.step(|core| {
            core.expect_state(HandshakeState::KeysDerived, HandshakeState::FinishReceived)?;
            core.verify_finished(message, Role::Responder)?;
            let reply = core.send_finished()?;
            core.establish();
            Ok(reply)
        })
    }

    pub fn state(&self) -> HandshakeState {
        self.core.state
    }

    pub fn role(&self) -> Role {
        self.core.role
    }

    /// Derived keys, once `KeysDerived` has been reached.
    pub fn session_keys(&self) -> Option<&SessionKeySet> {
        self.core.keys.as_ref()
    }

    pub fn peer_certificate(&self) -> Option<&Certificate> {
        self.core.peer_certificate.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.core.transcript
    }

    /// Hand over the established session keys as a role-bound channel.
    pub fn into_channel(self) -> Result<SecureChannel> {
        self.core.into_channel()
    }

    /// The channel together with the peer's verified certificate.
    pub fn into_established(self) -> Result<(SecureChannel, Certificate)> {
        self.core.into_established()
    }
}

// ── Responder ────────────────────────────────────────────────────────────

/// Server side of the handshake.
pub struct Responder {
    core: HandshakeCore,
}

impl Responder {
    pub fn new(credentials: Arc<LocalCredentials>, anchor: TrustAnchor) -> Self {
        Self {
            core: HandshakeCore::new(Role::Responder, credentials, anchor),
        }
    }

    /// Deterministic construction with an injected DH exponent.
    pub fn with_fixed_secrets(
        credentials: Arc<LocalCredentials>,
        anchor: TrustAnchor,
        exponent: [u8; EXPONENT_LEN],
    ) -> Self {
        let mut responder = Self::new(credentials, anchor);
        responder.core.fixed_exponent = Some(Zeroizing::new(exponent));
        responder
    }

    /// Message 1 in, message 2 out.
    pub fn process_nonce(&mut self, message: &Message) -> Result<Message> {
        self.core.step(|core| {
            core.expect_state(HandshakeState::Init, HandshakeState::NonceReceived)?;
            let Message::ClientNonce(nonce) = message else {
                return Err(TandemTrustError::UnexpectedMessage {
                    expected: "ClientNonce",
                    got: message.name(),
                });
            };
            core.nonce = Some(*nonce);
            core.transcript.append_message(message)?;
            core.transition(HandshakeState::NonceReceived);
            core.local_credentials()
        })
    }

    /// Message 3 in, message 4 out: verify the initiator, derive keys, send
    /// our Finished.
    pub fn process_credentials(&mut self, message: &Message) -> Result<Message> {
        self.core.step(|core| {
            core.expect_state(
                HandshakeState::LocalCredentialsSent,
                HandshakeState::PeerCredentialsReceived,
            )?;
            core.accept_peer_credentials(message)?;
            core.derive_keys()?;
            core.send_finished()
        })
    }

    /// Message 5 in: verify the initiator's Finished and reach `Established`.
    pub fn process_finished(&mut self, message: &Message) -> Result<()> {
        self.core.step(|core| {
            core.expect_state(HandshakeState::FinishSent, HandshakeState::FinishReceived)?;
            core.verify_finished(message, Role::Initiator)?;
            core.establish();
            Ok(())
        })
    }

    pub fn state(&self) -> HandshakeState {
        self.core.state
    }

    pub fn role(&self) -> Role {
        self.core.role
    }

    pub fn session_keys(&self) -> Option<&SessionKeySet> {
        self.core.keys.as_ref()
    }

    pub fn peer_certificate(&self) -> Option<&Certificate> {
        self.core.peer_certificate.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.core.transcript
    }

    pub fn into_channel(self) -> Result<SecureChannel> {
        self.core.into_channel()
    }

    /// The channel together with the peer's verified certificate.
    pub fn into_established(self) -> Result<(SecureChannel, Certificate)> {
        self.core.into_established()
    }
}
