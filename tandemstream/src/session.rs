// Session drivers: run the handshake over a stream, then exchange sealed
// messages with strict send / acknowledge alternation.

use std::time::Duration;

use tandemtrust::cert::Certificate;
use tandemtrust::handshake::messages::Message;
use tandemtrust::{Initiator, Responder, Role, SecureChannel, TandemTrustError};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, TandemStreamError};
use crate::frame::{read_record, write_record};

async fn read_within<S, F>(
    stream: &mut S,
    limit: Duration,
    max: usize,
    on_timeout: F,
) -> Result<Message>
where
    S: AsyncRead + Unpin,
    F: FnOnce(Duration) -> TandemStreamError,
{
    timeout(limit, read_record(stream, max))
        .await
        .map_err(|_| on_timeout(limit))?
}

async fn handshake_read<S>(stream: &mut S, config: &SessionConfig) -> Result<Message>
where
    S: AsyncRead + Unpin,
{
    read_within(
        stream,
        config.handshake_timeout,
        config.max_record_size,
        TandemStreamError::HandshakeTimeout,
    )
    .await
}

/// Shut the transport down after a fatal error.
async fn abort_transport<S>(stream: &mut S, role: Role, error: &TandemStreamError)
where
    S: AsyncWrite + Unpin,
{
    warn!(%role, %error, "closing transport after fatal error");
    if let Err(close) = stream.shutdown().await {
        debug!(%role, error = %close, "transport shutdown failed");
    }
}

async fn drive_initiator<S>(
    stream: &mut S,
    initiator: &mut Initiator,
    config: &SessionConfig,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_record(stream, &initiator.start()?).await?;
    let server_credentials = handshake_read(stream, config).await?;
    write_record(stream, &initiator.process_credentials(&server_credentials)?).await?;
    let server_finished = handshake_read(stream, config).await?;
    write_record(stream, &initiator.process_finished(&server_finished)?).await?;
    Ok(())
}

async fn drive_responder<S>(
    stream: &mut S,
    responder: &mut Responder,
    config: &SessionConfig,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let nonce = handshake_read(stream, config).await?;
    write_record(stream, &responder.process_nonce(&nonce)?).await?;
    let client_credentials = handshake_read(stream, config).await?;
    write_record(stream, &responder.process_credentials(&client_credentials)?).await?;
    let client_finished = handshake_read(stream, config).await?;
    responder.process_finished(&client_finished)?;
    Ok(())
}

/// Run the handshake as initiator over `stream`.
///
/// On failure the stream is shut down before the error is returned.
pub async fn connect<S>(
    mut stream: S,
    mut initiator: Initiator,
    config: &SessionConfig,
) -> Result<Session<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Err(e) = drive_initiator(&mut stream, &mut initiator, config).await {
        abort_transport(&mut stream, Role::Initiator, &e).await;
        return Err(e);
    }
    Session::established(stream, initiator.into_established()?, config)
}

/// Run the handshake as responder over `stream`.
pub async fn accept<S>(
    mut stream: S,
    mut responder: Responder,
    config: &SessionConfig,
) -> Result<Session<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Err(e) = drive_responder(&mut stream, &mut responder, config).await {
        abort_transport(&mut stream, Role::Responder, &e).await;
        return Err(e);
    }
    Session::established(stream, responder.into_established()?, config)
}

/// An established session.
///
/// Exactly one message is in flight at a time: `send` does not return until
/// the peer has acknowledged, and `recv` acknowledges before returning.
pub struct Session<S> {
    stream: S,
    channel: SecureChannel,
    peer: Certificate,
    config: SessionConfig,
    closed: bool,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn established(
        stream: S,
        (channel, peer): (SecureChannel, Certificate),
        config: &SessionConfig,
    ) -> Result<Self> {
        info!(role = %channel.role(), peer = %peer.subject, "session established");
        Ok(Self {
            stream,
            channel,
            peer,
            config: config.clone(),
            closed: false,
        })
    }

    pub fn role(&self) -> Role {
        self.channel.role()
    }

    /// The verified certificate the peer presented.
    pub fn peer_certificate(&self) -> &Certificate {
        &self.peer
    }

    /// The role-bound channel protecting this session's records.
    pub fn channel(&self) -> &SecureChannel {
        &self.channel
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    async fn read_application(&mut self) -> Result<Vec<u8>> {
        let record = read_within(
            &mut self.stream,
            self.config.receive_timeout,
            self.config.max_record_size,
            TandemStreamError::ReceiveTimeout,
        )
        .await?;
        match record {
            Message::ApplicationData(ciphertext) => Ok(ciphertext),
            other => Err(TandemTrustError::UnexpectedMessage {
                expected: "ApplicationData",
                got: other.name(),
            }
            .into()),
        }
    }

    async fn send_sealed(&mut self, sealed: Vec<u8>) -> Result<()> {
        write_record(&mut self.stream, &Message::ApplicationData(sealed)).await?;
        let ack = self.read_application().await?;
        self.channel.open_ack(&ack)?;
        Ok(())
    }

    async fn recv_inner(&mut self) -> Result<Vec<u8>> {
        let ciphertext = self.read_application().await?;
        let plaintext = self.channel.open(&ciphertext)?;
        let ack = self.channel.seal_ack()?;
        write_record(&mut self.stream, &Message::ApplicationData(ack)).await?;
        debug!(role = %self.role(), len = plaintext.len(), "message received and acknowledged");
        Ok(plaintext)
    }

    /// Seal and send `plaintext`, then wait for the peer's acknowledgement.
    ///
    /// A sealed record larger than `max_record_size` is refused with
    /// `RecordTooLarge` before anything is written; the session stays open.
    pub async fn send(&mut self, plaintext: &[u8]) -> Result<()> {
        if self.closed {
            return Err(TandemStreamError::ConnectionClosed);
        }
        let sealed = self.channel.seal(plaintext)?;
        if sealed.len() > self.config.max_record_size {
            return Err(TandemStreamError::RecordTooLarge {
                size: sealed.len(),
                max: self.config.max_record_size,
            });
        }
        let result = self.send_sealed(sealed).await;
        let result = self.close_on_error(result).await;
        if result.is_ok() {
            debug!(role = %self.role(), len = plaintext.len(), "message acknowledged");
        }
        result
    }

    /// Receive one message and acknowledge it.
    pub async fn recv(&mut self) -> Result<Vec<u8>> {
        if self.closed {
            return Err(TandemStreamError::ConnectionClosed);
        }
        let result = self.recv_inner().await;
        self.close_on_error(result).await
    }

    async fn close_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.closed = true;
            let role = self.role();
            abort_transport(&mut self.stream, role, e).await;
        }
        result
    }

    /// Shut the transport down.
    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        self.stream.shutdown().await?;
        Ok(())
    }
}
