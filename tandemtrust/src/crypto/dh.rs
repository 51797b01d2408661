// Finite-field Diffie-Hellman over the RFC 3526 1536-bit MODP group.
//
// Public values and shared secrets travel as fixed-width 192-byte
// big-endian integers. Private exponents are 32 random bytes.

use std::fmt;
use std::sync::OnceLock;

use num_bigint::BigUint;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{TandemTrustError, Result};

/// Byte length of an encoded public value or shared secret.
pub const PUBLIC_VALUE_LEN: usize = 192;

/// Byte length of a private exponent.
pub const EXPONENT_LEN: usize = 32;

/// Group generator.
pub const GENERATOR: u32 = 2;

/// RFC 3526 group 5 safe prime, big-endian.
const MODP_1536_PRIME: [u8; PUBLIC_VALUE_LEN] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xC9, 0x0F, 0xDA, 0xA2,
    0x21, 0x68, 0xC2, 0x34, 0xC4, 0xC6, 0x62, 0x8B, 0x80, 0xDC, 0x1C, 0xD1,
    0x29, 0x02, 0x4E, 0x08, 0x8A, 0x67, 0xCC, 0x74, 0x02, 0x0B, 0xBE, 0xA6,
    0x3B, 0x13, 0x9B, 0x22, 0x51, 0x4A, 0x08, 0x79, 0x8E, 0x34, 0x04, 0xDD,
    0xEF, 0x95, 0x19, 0xB3, 0xCD, 0x3A, 0x43, 0x1B, 0x30, 0x2B, 0x0A, 0x6D,
    0xF2, 0x5F, 0x14, 0x37, 0x4F, 0xE1, 0x35, 0x6D, 0x6D, 0x51, 0xC2, 0x45,
    0xE4, 0x85, 0xB5, 0x76, 0x62, 0x5E, 0x7E, 0xC6, 0xF4, 0x4C, 0x42, 0xE9,
    0xA6, 0x37, 0xED, 0x6B, 0x0B, 0xFF, 0x5C, 0xB6, 0xF4, 0x06, 0xB7, 0xED,
    0xEE, 0x38, 0x6B, 0xFB, 0x5A, 0x89, 0x9F, 0xA5, 0xAE, 0x9F, 0x24, 0x11,
    0x7C, 0x4B, 0x1F, 0xE6, 0x49, 0x28, 0x66, 0x51, 0xEC, 0xE4, 0x5B, 0x3D,
    0xC2, 0x00, 0x7C, 0xB8, 0xA1, 0x63, 0xBF, 0x05, 0x98, 0xDA, 0x48, 0x36,
    0x1C, 0x55, 0xD3, 0x9A, 0x69, 0x16, 0x3F, 0xA8, 0xFD, 0x24, 0xCF, 0x5F,
    0x83, 0x65, 0x5D, 0x23, 0xDC, 0xA3, 0xAD, 0x96, 0x1C, 0x62, 0xF3, 0x56,
    0x20, 0x85, 0x52, 0xBB, 0x9E, 0xD5, 0x29, 0x07, 0x70, 0x96, 0x96, 0x6D,
    0x67, 0x0C, 0x35, 0x4E, 0x4A, 0xBC, 0x98, 0x04, 0xF1, 0x74, 0x6C, 0x08,
    0xCA, 0x23, 0x73, 0x27, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// A DH public value on the wire.
pub type PublicValue = [u8; PUBLIC_VALUE_LEN];

fn prime() -> &'static BigUint {
    static PRIME: OnceLock<BigUint> = OnceLock::new();
    PRIME.get_or_init(|| BigUint::from_bytes_be(&MODP_1536_PRIME))
}

fn to_fixed_width(n: &BigUint) -> PublicValue {
    let bytes = n.to_bytes_be();
    let mut out = [0u8; PUBLIC_VALUE_LEN];
    out[PUBLIC_VALUE_LEN - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// `generator ^ private_exponent mod prime`.
pub fn compute_public_value(private_exponent: &[u8]) -> PublicValue {
    let x = BigUint::from_bytes_be(private_exponent);
    to_fixed_width(&BigUint::from(GENERATOR).modpow(&x, prime()))
}

/// Reject peer values outside `[2, p - 2]`.
///
/// 0, 1 and p - 1 confine the shared secret to a subgroup of order at most
/// two, so a peer sending one of them fixes the secret regardless of our
/// exponent.
pub fn validate_public_value(value: &PublicValue) -> Result<()> {
    let y = BigUint::from_bytes_be(value);
    let two = BigUint::from(2u32);
    let upper = prime() - &two;
    if y < two || y > upper {
        return Err(TandemTrustError::InvalidKey(
            "DH public value out of range".into(),
        ));
    }
    Ok(())
}

/// `peer_public ^ own_private mod prime`.
///
/// The peer value is range-checked first; see [`validate_public_value`].
pub fn compute_shared_secret(
    peer_public: &PublicValue,
    own_private: &[u8],
) -> Result<SharedSecret> {
    validate_public_value(peer_public)?;
    let y = BigUint::from_bytes_be(peer_public);
    let x = BigUint::from_bytes_be(own_private);
    Ok(SharedSecret(to_fixed_width(&y.modpow(&x, prime()))))
}

/// The agreed DH secret. Only ever fed to the key schedule.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; PUBLIC_VALUE_LEN]);

impl SharedSecret {
    /// Wrap raw secret bytes (tests and key-schedule vectors).
    pub fn from_bytes(bytes: [u8; PUBLIC_VALUE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_VALUE_LEN] {
        &self.0
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct PrivateExponent([u8; EXPONENT_LEN]);

/// An ephemeral DH keypair for one handshake.
///
/// The private exponent never leaves this struct and is wiped when the pair
/// is consumed by [`DhKeyPair::diffie_hellman`].
pub struct DhKeyPair {
    private: PrivateExponent,
    public: PublicValue,
}

impl DhKeyPair {
    /// Generate a new random ephemeral keypair.
    pub fn generate() -> Self {
        let mut exponent = [0u8; EXPONENT_LEN];
        OsRng.fill_bytes(&mut exponent);
        let pair = Self::from_private_exponent(exponent);
        exponent.zeroize();
        pair
    }

    /// Create from existing exponent bytes (used in deterministic tests).
    pub fn from_private_exponent(exponent: [u8; EXPONENT_LEN]) -> Self {
        let public = compute_public_value(&exponent);
        Self {
            private: PrivateExponent(exponent),
            public,
        }
    }

    /// The 192-byte public value.
    pub fn public_value(&self) -> &PublicValue {
        &self.public
    }

    /// Combine with the peer's public value. Consumes the pair so the
    /// exponent is used exactly once.
    pub fn diffie_hellman(self, peer_public: &PublicValue) -> Result<SharedSecret> {
        compute_shared_secret(peer_public, &self.private.0)
    }
}

impl fmt::Debug for DhKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DhKeyPair").finish_non_exhaustive()
    }
}
