// TandemTrust - certificate-authenticated handshake and authenticated channel
//
// Crate root: module declarations and public re-exports.

pub mod error;
pub mod crypto;
pub mod cert;
pub mod channel;
pub mod handshake;
pub mod credentials;

// Re-export key types at crate root for convenience.
pub use error::{TandemTrustError, Result};
pub use crypto::keys::IdentityKeyPair;
pub use crypto::key_schedule::SessionKeySet;
pub use cert::{Certificate, TrustAnchor};
pub use channel::SecureChannel;
pub use credentials::{KeyMaterialConfig, LocalCredentials};
pub use handshake::messages::Message;
pub use handshake::protocol::{Initiator, Responder};
pub use handshake::state::{HandshakeState, Role};
