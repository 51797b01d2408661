// Certificate binary serializer / deserializer.
//
// Wire format (big-endian):
// [version:1B]
// [subject_len:2B][subject utf8]
// [subject_public_key:32B]
// [issuer_len:2B][issuer utf8]
// [signature:64B]

use crate::cert::Certificate;
use crate::error::{TandemTrustError, Result};

/// Serialize a [`Certificate`] into its compact binary form.
pub fn serialize(cert: &Certificate) -> Result<Vec<u8>> {
    let mut buf = cert.signable_bytes()?;
    // Signature (last field)
    buf.extend_from_slice(&cert.signature);
    Ok(buf)
}

/// Bounds-checked cursor over the encoded bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(TandemTrustError::CertificateUnreadable(
                "unexpected end of data".into(),
            ));
        }
        let v = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(v)
    }

    fn name(&mut self) -> Result<String> {
        let len_bytes = self.take(2)?;
        let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| TandemTrustError::CertificateUnreadable(format!("invalid utf8: {e}")))
    }
}

/// Deserialize a [`Certificate`] from its compact binary form.
pub fn deserialize(data: &[u8]) -> Result<Certificate> {
    let mut reader = Reader { data, pos: 0 };

    // Version
    let version = reader.take(1)?[0];
    if version != Certificate::VERSION {
        return Err(TandemTrustError::CertificateUnreadable(format!(
            "unsupported version {version}"
        )));
    }

    let subject = reader.name()?;

    let mut subject_public_key = [0u8; 32];
    subject_public_key.copy_from_slice(reader.take(32)?);

    let issuer = reader.name()?;

    let mut signature = [0u8; 64];
    signature.copy_from_slice(reader.take(64)?);

    if reader.pos != data.len() {
        return Err(TandemTrustError::CertificateUnreadable(format!(
            "{} trailing bytes",
            data.len() - reader.pos
        )));
    }

    Ok(Certificate {
        subject,
        subject_public_key,
        issuer,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::CertificateBuilder;
    use crate::crypto::keys::IdentityKeyPair;

    fn sample() -> Certificate {
        let ca = IdentityKeyPair::generate();
        let leaf = IdentityKeyPair::generate();
        CertificateBuilder::new(&ca, "Tandem Root CA")
            .subject("server.tandem.test")
            .subject_key(leaf.public_key_bytes())
            .build()
            .unwrap()
    }

    #[test]
    fn roundtrip() {
        let cert = sample();
        let bytes = serialize(&cert).unwrap();
        assert_eq!(deserialize(&bytes).unwrap(), cert);
    }

    #[test]
    fn bad_version_fails() {
        let mut bytes = serialize(&sample()).unwrap();
        bytes[0] = 0xFF;
        assert!(matches!(
            deserialize(&bytes),
            Err(TandemTrustError::CertificateUnreadable(_))
        ));
    }

    #[test]
    fn truncated_data_fails() {
        let bytes = serialize(&sample()).unwrap();
        for cut in [0, 1, 3, bytes.len() - 1] {
            assert!(deserialize(&bytes[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn trailing_bytes_fail() {
        let mut bytes = serialize(&sample()).unwrap();
        bytes.push(0);
        assert!(deserialize(&bytes).is_err());
    }

    #[test]
    fn invalid_utf8_name_fails() {
        let mut bytes = serialize(&sample()).unwrap();
        // First subject byte sits right after version + length.
        bytes[3] = 0xFF;
        assert!(deserialize(&bytes).is_err());
    }
}
