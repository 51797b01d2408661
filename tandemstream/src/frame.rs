// Async record I/O: one header read, one body read, no buffering between
// records.

use std::io::ErrorKind;

use tandemtrust::handshake::messages::{Message, RecordHeader, HEADER_LEN};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{Result, TandemStreamError};

fn map_read_error(e: std::io::Error) -> TandemStreamError {
    if e.kind() == ErrorKind::UnexpectedEof {
        TandemStreamError::ConnectionClosed
    } else {
        TandemStreamError::Io(e)
    }
}

/// Read one record. EOF at any point is `ConnectionClosed`; a body longer
/// than `max_record_size` is refused before it is read.
pub async fn read_record<R>(reader: &mut R, max_record_size: usize) -> Result<Message>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await.map_err(map_read_error)?;
    let header = RecordHeader::decode(&header)?;

    if header.body_len > max_record_size {
        return Err(TandemStreamError::RecordTooLarge {
            size: header.body_len,
            max: max_record_size,
        });
    }

    let mut body = vec![0u8; header.body_len];
    reader.read_exact(&mut body).await.map_err(map_read_error)?;
    trace!(kind = header.message_type.name(), len = header.body_len, "record received");
    Ok(Message::decode_body(header.message_type, &body)?)
}

/// Write one record and flush it.
pub async fn write_record<W>(writer: &mut W, message: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let encoded = message.encode()?;
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    trace!(kind = message.name(), len = encoded.len(), "record sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandemtrust::TandemTrustError;

    #[tokio::test]
    async fn record_roundtrip_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let msg = Message::Finished([0x5A; 32]);
        write_record(&mut a, &msg).await.unwrap();
        assert_eq!(read_record(&mut b, 1024).await.unwrap(), msg);
    }

    #[tokio::test]
    async fn oversized_record_refused() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        write_record(&mut a, &Message::ApplicationData(vec![0u8; 64]))
            .await
            .unwrap();
        let err = read_record(&mut b, 32).await.unwrap_err();
        assert!(matches!(
            err,
            TandemStreamError::RecordTooLarge { size: 64, max: 32 }
        ));
    }

    #[tokio::test]
    async fn eof_is_connection_closed() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);
        assert!(matches!(
            read_record(&mut b, 1024).await,
            Err(TandemStreamError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn eof_mid_body_is_connection_closed() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let encoded = Message::Finished([1u8; 32]).encode().unwrap();
        a.write_all(&encoded[..20]).await.unwrap();
        drop(a);
        assert!(matches!(
            read_record(&mut b, 1024).await,
            Err(TandemStreamError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn bad_version_is_decode_error() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        a.write_all(&[0x09, 0x01, 0, 0, 0, 0]).await.unwrap();
        assert!(matches!(
            read_record(&mut b, 1024).await,
            Err(TandemStreamError::Trust(TandemTrustError::MessageDecode(_)))
        ));
    }
}
