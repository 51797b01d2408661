// Handshake and application records.
//
// Every record is `[version:1][type:1][body_len:4 BE][body]`.

use bytes::{Buf, BufMut, BytesMut};

use crate::crypto::dh::{PublicValue, PUBLIC_VALUE_LEN};
use crate::crypto::key_schedule::{Nonce, NONCE_LEN};
use crate::crypto::mac::MAC_LEN;
use crate::error::{TandemTrustError, Result};

/// Record format version.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Length of the record header (version, type, body length).
pub const HEADER_LEN: usize = 6;

/// Ed25519 signature length.
pub const SIGNATURE_LEN: usize = 64;

/// Record type identifiers. 0x01–0x03 are handshake records and go into the
/// transcript; 0x10 carries sealed application data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    ClientNonce = 0x01,
    Credentials = 0x02,
    Finished = 0x03,
    ApplicationData = 0x10,
}

impl MessageType {
    pub fn name(self) -> &'static str {
        match self {
            MessageType::ClientNonce => "ClientNonce",
            MessageType::Credentials => "Credentials",
            MessageType::Finished => "Finished",
            MessageType::ApplicationData => "ApplicationData",
        }
    }

    pub fn is_handshake(self) -> bool {
        !matches!(self, MessageType::ApplicationData)
    }
}

impl TryFrom<u8> for MessageType {
    type Error = TandemTrustError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(MessageType::ClientNonce),
            0x02 => Ok(MessageType::Credentials),
            0x03 => Ok(MessageType::Finished),
            0x10 => Ok(MessageType::ApplicationData),
            other => Err(TandemTrustError::MessageDecode(format!(
                "unknown message type 0x{other:02x}"
            ))),
        }
    }
}

/// A party's certificate, its ephemeral DH public value and its signature
/// over that value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Encoded certificate.
    pub certificate: Vec<u8>,
    pub dh_public: PublicValue,
    /// Ed25519 signature over `dh_public` by the certificate's subject key.
    pub signature: [u8; SIGNATURE_LEN],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Message 1: initiator nonce, the salt of the key schedule.
    ClientNonce(Nonce),
    /// Messages 2 and 3.
    Credentials(Credentials),
    /// Messages 4 and 5: HMAC over the transcript so far.
    Finished([u8; MAC_LEN]),
    /// Sealed application payload or acknowledgement.
    ApplicationData(Vec<u8>),
}

/// Parsed record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub message_type: MessageType,
    pub body_len: usize,
}

impl RecordHeader {
    /// Decode the fixed-size header that precedes every record body.
    pub fn decode(header: &[u8; HEADER_LEN]) -> Result<Self> {
        if header[0] != PROTOCOL_VERSION {
            return Err(TandemTrustError::MessageDecode(format!(
                "unsupported version 0x{:02x}",
                header[0]
            )));
        }
        let message_type = MessageType::try_from(header[1])?;
        let body_len = (&header[2..6]).get_u32() as usize;
        Ok(Self {
            message_type,
            body_len,
        })
    }
}

fn length_prefix(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| TandemTrustError::Encoding(format!("{what} length {len} exceeds u32")))
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::ClientNonce(_) => MessageType::ClientNonce,
            Message::Credentials(_) => MessageType::Credentials,
            Message::Finished(_) => MessageType::Finished,
            Message::ApplicationData(_) => MessageType::ApplicationData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.message_type().name()
    }

    fn body_len(&self) -> usize {
        match self {
            Message::ClientNonce(_) => NONCE_LEN,
            Message::Credentials(c) => c
                .certificate
                .len()
                .saturating_add(4 + PUBLIC_VALUE_LEN + SIGNATURE_LEN),
            Message::Finished(_) => MAC_LEN,
            Message::ApplicationData(ct) => ct.len(),
        }
    }

    pub fn encoded_len(&self) -> usize {
        self.body_len().saturating_add(HEADER_LEN)
    }

    /// Encode into a full record.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf)?;
        Ok(buf.to_vec())
    }

    /// Append the record to `buf`. Lengths that overflow their `u32` prefix
    /// are refused and nothing is written.
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<()> {
        let body_len = length_prefix(self.body_len(), "record body")?;
        let cert_len = match self {
            Message::Credentials(c) => length_prefix(c.certificate.len(), "certificate")?,
            _ => 0,
        };
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(self.message_type() as u8);
        buf.put_u32(body_len);
        match self {
            Message::ClientNonce(nonce) => buf.put_slice(nonce),
            Message::Credentials(c) => {
                buf.put_u32(cert_len);
                buf.put_slice(&c.certificate);
                buf.put_slice(&c.dh_public);
                buf.put_slice(&c.signature);
            }
            Message::Finished(mac) => buf.put_slice(mac),
            Message::ApplicationData(ct) => buf.put_slice(ct),
        }
        Ok(())
    }

    /// Decode a full record. The body length must match the header exactly.
    pub fn decode(record: &[u8]) -> Result<Self> {
        Self::ensure_len(record, HEADER_LEN, "record header")?;
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&record[..HEADER_LEN]);
        let header = RecordHeader::decode(&header)?;
        let body = &record[HEADER_LEN..];
        if body.len() != header.body_len {
            return Err(TandemTrustError::MessageDecode(format!(
                "body length {} does not match header {}",
                body.len(),
                header.body_len
            )));
        }
        Self::decode_body(header.message_type, body)
    }

    /// Decode a body whose type came from an already-parsed header.
    pub fn decode_body(message_type: MessageType, body: &[u8]) -> Result<Self> {
        match message_type {
            MessageType::ClientNonce => {
                Self::ensure_exact(body, NONCE_LEN, "ClientNonce")?;
                let mut nonce = [0u8; NONCE_LEN];
                nonce.copy_from_slice(body);
                Ok(Message::ClientNonce(nonce))
            }
            MessageType::Credentials => {
                Self::ensure_len(body, 4, "Credentials")?;
                let cert_len = (&body[0..4]).get_u32() as usize;
                let rest = &body[4..];
                let expected = cert_len
                    .checked_add(PUBLIC_VALUE_LEN + SIGNATURE_LEN)
                    .ok_or_else(|| {
                        TandemTrustError::MessageDecode("certificate length overflow".into())
                    })?;
                Self::ensure_exact(rest, expected, "Credentials")?;
                let (certificate, rest) = rest.split_at(cert_len);
                let (dh, sig) = rest.split_at(PUBLIC_VALUE_LEN);
                let mut dh_public = [0u8; PUBLIC_VALUE_LEN];
                dh_public.copy_from_slice(dh);
                let mut signature = [0u8; SIGNATURE_LEN];
                signature.copy_from_slice(sig);
                Ok(Message::Credentials(Credentials {
                    certificate: certificate.to_vec(),
                    dh_public,
                    signature,
                }))
            }
            MessageType::Finished => {
                Self::ensure_exact(body, MAC_LEN, "Finished")?;
                let mut mac = [0u8; MAC_LEN];
                mac.copy_from_slice(body);
                Ok(Message::Finished(mac))
            }
            MessageType::ApplicationData => Ok(Message::ApplicationData(body.to_vec())),
        }
    }

    fn ensure_len(data: &[u8], needed: usize, context: &str) -> Result<()> {
        if data.len() < needed {
            return Err(TandemTrustError::MessageDecode(format!(
                "{context}: need {needed} bytes, got {}",
                data.len()
            )));
        }
        Ok(())
    }

    fn ensure_exact(data: &[u8], needed: usize, context: &str) -> Result<()> {
        if data.len() != needed {
            return Err(TandemTrustError::MessageDecode(format!(
                "{context}: expected {needed} bytes, got {}",
                data.len()
            )));
        }
        Ok(())
    }
}
