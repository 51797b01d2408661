// HMAC-SHA256: per-message tags and handshake Finished MACs.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{TandemTrustError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Tag length in bytes.
pub const MAC_LEN: usize = 32;

/// HMAC-SHA256 over the concatenation of `parts`.
pub fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Result<[u8; MAC_LEN]> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| TandemTrustError::KeyDerivation(format!("HMAC init: {e}")))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

/// Constant-time check of `tag` against HMAC-SHA256(key, message).
pub fn verify_hmac_sha256(key: &[u8], message: &[u8], tag: &[u8]) -> Result<bool> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| TandemTrustError::KeyDerivation(format!("HMAC init: {e}")))?;
    mac.update(message);
    Ok(mac.verify_slice(tag).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn rfc4231_case_2() {
        let tag = hmac_sha256(b"Jefe", &[b"what do ya want ", b"for nothing?"]).unwrap();
        assert_eq!(
            hex(&tag),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn verify_accepts_own_tag() {
        let tag = hmac_sha256(b"key", &[b"message"]).unwrap();
        assert!(verify_hmac_sha256(b"key", b"message", &tag).unwrap());
    }

    #[test]
    fn verify_rejects_flipped_tag() {
        let mut tag = hmac_sha256(b"key", &[b"message"]).unwrap();
        tag[MAC_LEN - 1] ^= 0x01;
        assert!(!verify_hmac_sha256(b"key", b"message", &tag).unwrap());
    }

    #[test]
    fn verify_rejects_short_tag() {
        let tag = hmac_sha256(b"key", &[b"message"]).unwrap();
        assert!(!verify_hmac_sha256(b"key", b"message", &tag[..16]).unwrap());
    }
}
