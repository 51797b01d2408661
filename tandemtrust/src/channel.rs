// Authenticated channel: MAC-then-encrypt with HMAC-SHA256 and AES-128-CBC.
//
//   ciphertext = AES-128-CBC(encrypt_key, iv, PKCS#7(plaintext || HMAC(mac_key, plaintext)))
//
// The IV is fixed per direction for the whole session, so equal plaintexts
// in one direction produce equal ciphertexts. That is acceptable for a
// short-lived session and nothing longer.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::key_schedule::{SessionKeySet, KEY_LEN};
use crate::crypto::mac::{hmac_sha256, verify_hmac_sha256, MAC_LEN};
use crate::error::{TandemTrustError, Result};
use crate::handshake::state::Role;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// AES block size.
pub const BLOCK_LEN: usize = 16;

/// Plaintext of every acknowledgement.
pub const ACK_TOKEN: &[u8] = b"ACK";

/// Seal `plaintext`: append its MAC, then encrypt the concatenation.
pub fn seal(
    plaintext: &[u8],
    encrypt_key: &[u8; KEY_LEN],
    iv: &[u8; KEY_LEN],
    mac_key: &[u8; KEY_LEN],
) -> Result<Vec<u8>> {
    let tag = hmac_sha256(mac_key, &[plaintext])?;

    let mut buf = Zeroizing::new(Vec::with_capacity(plaintext.len() + MAC_LEN));
    buf.extend_from_slice(plaintext);
    buf.extend_from_slice(&tag);

    let cipher = Aes128CbcEnc::new_from_slices(encrypt_key, iv)
        .map_err(|e| TandemTrustError::Encryption(format!("cipher init: {e}")))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(&buf))
}

/// Decrypt and split into (message, tag). Every failure is reported as
/// `AuthenticationFailed`, whatever stage it happened in.
fn decrypt_and_split(
    ciphertext: &[u8],
    encrypt_key: &[u8; KEY_LEN],
    iv: &[u8; KEY_LEN],
) -> Result<(Vec<u8>, [u8; MAC_LEN])> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(TandemTrustError::AuthenticationFailed);
    }
    let cipher = Aes128CbcDec::new_from_slices(encrypt_key, iv)
        .map_err(|_| TandemTrustError::AuthenticationFailed)?;
    let mut plaintext = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| TandemTrustError::AuthenticationFailed)?;
    if plaintext.len() < MAC_LEN {
        plaintext.zeroize();
        return Err(TandemTrustError::AuthenticationFailed);
    }
    let split = plaintext.len() - MAC_LEN;
    let mut tag = [0u8; MAC_LEN];
    tag.copy_from_slice(&plaintext[split..]);
    plaintext.truncate(split);
    Ok((plaintext, tag))
}

/// Decrypt `ciphertext` and verify the trailing MAC before returning the
/// message. A mismatch fails closed with `AuthenticationFailed`.
pub fn open(
    ciphertext: &[u8],
    encrypt_key: &[u8; KEY_LEN],
    iv: &[u8; KEY_LEN],
    mac_key: &[u8; KEY_LEN],
) -> Result<Vec<u8>> {
    let (mut message, tag) = decrypt_and_split(ciphertext, encrypt_key, iv)?;
    if !verify_hmac_sha256(mac_key, &message, &tag)? {
        message.zeroize();
        return Err(TandemTrustError::AuthenticationFailed);
    }
    Ok(message)
}

/// Legacy receive path: decrypts and strips the MAC without checking it.
///
/// Kept only so tests can pin down how it differs from [`open`]. Never use
/// it on untrusted input.
pub fn open_unverified(
    ciphertext: &[u8],
    encrypt_key: &[u8; KEY_LEN],
    iv: &[u8; KEY_LEN],
) -> Result<Vec<u8>> {
    decrypt_and_split(ciphertext, encrypt_key, iv).map(|(message, _)| message)
}

/// Keys for one direction of traffic.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DirectionKeys {
    encrypt_key: [u8; KEY_LEN],
    mac_key: [u8; KEY_LEN],
    iv: [u8; KEY_LEN],
}

impl DirectionKeys {
    /// Server-to-client keys.
    pub fn server(keys: &SessionKeySet) -> Self {
        Self {
            encrypt_key: keys.server_encrypt,
            mac_key: keys.server_mac,
            iv: keys.server_iv,
        }
    }

    /// Client-to-server keys.
    pub fn client(keys: &SessionKeySet) -> Self {
        Self {
            encrypt_key: keys.client_encrypt,
            mac_key: keys.client_mac,
            iv: keys.client_iv,
        }
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        seal(plaintext, &self.encrypt_key, &self.iv, &self.mac_key)
    }

    pub fn open(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        open(ciphertext, &self.encrypt_key, &self.iv, &self.mac_key)
    }
}

/// Post-handshake channel bound to one role: seals with the role's own keys
/// and opens with the peer's.
pub struct SecureChannel {
    role: Role,
    outbound: DirectionKeys,
    inbound: DirectionKeys,
}

impl SecureChannel {
    pub fn new(role: Role, keys: &SessionKeySet) -> Self {
        let (outbound, inbound) = match role {
            Role::Initiator => (DirectionKeys::client(keys), DirectionKeys::server(keys)),
            Role::Responder => (DirectionKeys::server(keys), DirectionKeys::client(keys)),
        };
        Self {
            role,
            outbound,
            inbound,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Seal an outbound application message.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.outbound.seal(plaintext)
    }

    /// Open an inbound application message.
    pub fn open(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.inbound.open(ciphertext).map_err(|e| {
            warn!(role = %self.role, "inbound message failed authentication");
            e
        })
    }

    /// Seal the acknowledgement token.
    pub fn seal_ack(&self) -> Result<Vec<u8>> {
        self.seal(ACK_TOKEN)
    }

    /// Open an inbound acknowledgement. Anything but the literal token is
    /// `UnexpectedAcknowledgement`.
    pub fn open_ack(&self, ciphertext: &[u8]) -> Result<()> {
        let plaintext = self.open(ciphertext)?;
        if plaintext != ACK_TOKEN {
            warn!(role = %self.role, len = plaintext.len(), "acknowledgement token mismatch");
            return Err(TandemTrustError::UnexpectedAcknowledgement);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::dh::{SharedSecret, PUBLIC_VALUE_LEN};
    use crate::crypto::key_schedule::derive_session_keys;

    const KEY: [u8; 16] = [0x42; 16];
    const IV: [u8; 16] = [0x24; 16];
    const MAC_KEY: [u8; 16] = [0x99; 16];

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn session_keys() -> SessionKeySet {
        let shared = SharedSecret::from_bytes([0x33; PUBLIC_VALUE_LEN]);
        derive_session_keys(&[0x11; 32], &shared).unwrap()
    }

    #[test]
    fn roundtrip_various_lengths() {
        for len in [0usize, 1, 3, 15, 16, 17, 31, 32, 48, 1000] {
            let msg: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let ct = seal(&msg, &KEY, &IV, &MAC_KEY).unwrap();
            assert_eq!(ct.len() % BLOCK_LEN, 0);
            assert_eq!(open(&ct, &KEY, &IV, &MAC_KEY).unwrap(), msg, "len {len}");
        }
    }

    #[test]
    fn every_bit_flip_is_rejected() {
        let msg = b"Is anyone there?";
        let ct = seal(msg, &KEY, &IV, &MAC_KEY).unwrap();
        for bit in 0..ct.len() * 8 {
            let mut tampered = ct.clone();
            tampered[bit / 8] ^= 1 << (bit % 8);
            match open(&tampered, &KEY, &IV, &MAC_KEY) {
                Err(TandemTrustError::AuthenticationFailed) => {}
                other => panic!("bit {bit}: expected AuthenticationFailed, got {other:?}"),
            }
        }
    }

    #[test]
    fn wrong_mac_key_rejected_by_open() {
        let ct = seal(b"payload", &KEY, &IV, &MAC_KEY).unwrap();
        let err = open(&ct, &KEY, &IV, &[0u8; 16]).unwrap_err();
        assert!(matches!(err, TandemTrustError::AuthenticationFailed));
    }

    #[test]
    fn legacy_open_skips_mac_check() {
        // Divergence from the legacy receive path: a message whose MAC was
        // made with the wrong key still comes back from `open_unverified`,
        // while `open` refuses it.
        let ct = seal(b"payload", &KEY, &IV, &[0u8; 16]).unwrap();
        assert_eq!(open_unverified(&ct, &KEY, &IV).unwrap(), b"payload");
        assert!(open(&ct, &KEY, &IV, &MAC_KEY).is_err());
    }

    #[test]
    fn legacy_open_accepts_forged_tag() {
        // Encrypt plaintext || garbage tag directly: only `open` notices.
        let mut forged = b"forged".to_vec();
        forged.extend_from_slice(&[0xEE; MAC_LEN]);
        let ct = Aes128CbcEnc::new_from_slices(&KEY, &IV)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(&forged);
        assert_eq!(open_unverified(&ct, &KEY, &IV).unwrap(), b"forged");
        assert!(matches!(
            open(&ct, &KEY, &IV, &MAC_KEY),
            Err(TandemTrustError::AuthenticationFailed)
        ));
    }

    #[test]
    fn truncated_or_misaligned_rejected() {
        let ct = seal(b"payload", &KEY, &IV, &MAC_KEY).unwrap();
        assert!(open(&ct[..ct.len() - 1], &KEY, &IV, &MAC_KEY).is_err());
        assert!(open(&ct[..BLOCK_LEN], &KEY, &IV, &MAC_KEY).is_err());
        assert!(open(&[], &KEY, &IV, &MAC_KEY).is_err());
    }

    #[test]
    fn static_iv_repeats_ciphertext() {
        let a = seal(b"same", &KEY, &IV, &MAC_KEY).unwrap();
        let b = seal(b"same", &KEY, &IV, &MAC_KEY).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn golden_ack_ciphertext() {
        let key = [
            0x03, 0xdc, 0x82, 0x5d, 0x51, 0xd7, 0xe8, 0xea, 0xdc, 0x60, 0x0f, 0x17, 0x9e, 0xa4,
            0xd5, 0x28,
        ];
        let mac_key = [
            0x09, 0xb6, 0xd5, 0xed, 0xff, 0x2a, 0xe3, 0x69, 0xba, 0x77, 0x1c, 0x24, 0xde, 0x8b,
            0xb2, 0xed,
        ];
        let iv = [
            0xba, 0x3c, 0x41, 0x29, 0x8c, 0x69, 0x97, 0xaf, 0x93, 0x73, 0xe2, 0xdd, 0x2b, 0xcc,
            0x0c, 0x34,
        ];
        let ct = seal(ACK_TOKEN, &key, &iv, &mac_key).unwrap();
        assert_eq!(
            hex(&ct),
            "941168a59522c929e0c298218578066134f023ecca70d1b6b05cbe3bb273aaaadc199cef79ef40b157cb1bafede512f0"
        );
    }

    #[test]
    fn channel_roles_interoperate() {
        let keys = session_keys();
        let client = SecureChannel::new(Role::Initiator, &keys);
        let server = SecureChannel::new(Role::Responder, &keys);

        let ct = server.seal(b"Is anyone there?").unwrap();
        assert_eq!(client.open(&ct).unwrap(), b"Is anyone there?");

        let ct = client.seal(b"Yeah, what do you want?").unwrap();
        assert_eq!(server.open(&ct).unwrap(), b"Yeah, what do you want?");
    }

    #[test]
    fn channel_cannot_open_its_own_output() {
        let keys = session_keys();
        let client = SecureChannel::new(Role::Initiator, &keys);
        let ct = client.seal(b"echo").unwrap();
        assert!(client.open(&ct).is_err());
    }

    #[test]
    fn ack_roundtrip() {
        let keys = session_keys();
        let client = SecureChannel::new(Role::Initiator, &keys);
        let server = SecureChannel::new(Role::Responder, &keys);
        server.open_ack(&client.seal_ack().unwrap()).unwrap();
        client.open_ack(&server.seal_ack().unwrap()).unwrap();
    }

    #[test]
    fn non_ack_payload_is_unexpected() {
        let keys = session_keys();
        let client = SecureChannel::new(Role::Initiator, &keys);
        let server = SecureChannel::new(Role::Responder, &keys);
        let ct = client.seal(b"NAK").unwrap();
        assert!(matches!(
            server.open_ack(&ct),
            Err(TandemTrustError::UnexpectedAcknowledgement)
        ));
    }
}
