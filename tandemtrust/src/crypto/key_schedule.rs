// Session key schedule: HKDF-Extract keyed by the initiator's nonce, then a
// one-way chain of HMAC expansions with one domain-separation tag per key.

use std::fmt;

use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::dh::SharedSecret;
use crate::crypto::mac::hmac_sha256;
use crate::error::Result;

/// Length of every derived key, MAC key and IV (AES-128 block size).
pub const KEY_LEN: usize = 16;

/// Length of the session nonce.
pub const NONCE_LEN: usize = 32;

/// Nonce originated by the initiating party.
pub type Nonce = [u8; NONCE_LEN];

/// Domain-separation tags, in chain order.
pub const SERVER_ENCRYPT_TAG: &str = "server encrypt";
pub const CLIENT_ENCRYPT_TAG: &str = "client encrypt";
pub const SERVER_MAC_TAG: &str = "server MAC";
pub const CLIENT_MAC_TAG: &str = "client MAC";
pub const SERVER_IV_TAG: &str = "server IV";
pub const CLIENT_IV_TAG: &str = "client IV";

/// Generate a fresh random nonce.
pub fn generate_nonce() -> Nonce {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// The six keys of one session. Server = responder, client = initiator.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeySet {
    pub server_encrypt: [u8; KEY_LEN],
    pub client_encrypt: [u8; KEY_LEN],
    pub server_mac: [u8; KEY_LEN],
    pub client_mac: [u8; KEY_LEN],
    pub server_iv: [u8; KEY_LEN],
    pub client_iv: [u8; KEY_LEN],
}

impl SessionKeySet {
    /// All six keys in chain order.
    pub fn as_array(&self) -> [&[u8; KEY_LEN]; 6] {
        [
            &self.server_encrypt,
            &self.client_encrypt,
            &self.server_mac,
            &self.client_mac,
            &self.server_iv,
            &self.client_iv,
        ]
    }
}

impl fmt::Debug for SessionKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKeySet { .. }")
    }
}

/// `truncate(HMAC(previous, tag || 0x01), KEY_LEN)`.
fn expand(previous: &[u8], tag: &str) -> Result<[u8; KEY_LEN]> {
    let block = Zeroizing::new(hmac_sha256(previous, &[tag.as_bytes(), &[0x01]])?);
    let mut out = [0u8; KEY_LEN];
    out.copy_from_slice(&block[..KEY_LEN]);
    Ok(out)
}

/// Derive the session keys from the initiator's nonce and the DH secret.
///
/// ```text
/// prk            = HMAC(key = nonce, msg = shared_secret)   (HKDF-Extract)
/// server_encrypt = expand(prk,            "server encrypt")
/// client_encrypt = expand(server_encrypt, "client encrypt")
/// server_mac     = expand(client_encrypt, "server MAC")
/// client_mac     = expand(server_mac,     "client MAC")
/// server_iv      = expand(client_mac,     "server IV")
/// client_iv      = expand(server_iv,      "client IV")
/// ```
///
/// Each link is keyed by the key before it, so a later key does not reveal
/// an earlier one. Deterministic; any shared-secret value is accepted.
pub fn derive_session_keys(nonce: &Nonce, shared_secret: &SharedSecret) -> Result<SessionKeySet> {
    let (prk, _) = Hkdf::<Sha256>::extract(Some(&nonce[..]), shared_secret.as_bytes());
    let prk: Zeroizing<[u8; 32]> = Zeroizing::new(prk.into());

    let server_encrypt = expand(&prk[..], SERVER_ENCRYPT_TAG)?;
    let client_encrypt = expand(&server_encrypt, CLIENT_ENCRYPT_TAG)?;
    let server_mac = expand(&client_encrypt, SERVER_MAC_TAG)?;
    let client_mac = expand(&server_mac, CLIENT_MAC_TAG)?;
    let server_iv = expand(&client_mac, SERVER_IV_TAG)?;
    let client_iv = expand(&server_iv, CLIENT_IV_TAG)?;

    Ok(SessionKeySet {
        server_encrypt,
        client_encrypt,
        server_mac,
        client_mac,
        server_iv,
        client_iv,
    })
}
