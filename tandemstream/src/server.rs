// TCP plumbing: a listener that hands every connection a fresh responder,
// and the matching client-side connect.

use std::net::SocketAddr;
use std::sync::Arc;

use tandemtrust::cert::TrustAnchor;
use tandemtrust::credentials::LocalCredentials;
use tandemtrust::{Initiator, Responder};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::info;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::{accept, connect, Session};

/// Accepts TCP connections and runs the responder side of the handshake.
///
/// Only the credentials and trust anchor are shared between connections;
/// every session gets its own transcript, DH exponent and keys.
pub struct Server {
    listener: TcpListener,
    credentials: Arc<LocalCredentials>,
    anchor: TrustAnchor,
    config: SessionConfig,
}

impl Server {
    pub async fn bind(
        addr: impl ToSocketAddrs,
        credentials: Arc<LocalCredentials>,
        anchor: TrustAnchor,
        config: SessionConfig,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            addr = %listener.local_addr()?,
            subject = %credentials.certificate().subject,
            key = %credentials.identity().fingerprint(),
            "listening"
        );
        Ok(Self {
            listener,
            credentials,
            anchor,
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept the next TCP connection without running the handshake, so the
    /// caller can move it to its own task.
    pub async fn accept_tcp(&self) -> Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        info!(%peer, "connection accepted");
        Ok((stream, peer))
    }

    /// A responder bound to this server's credentials.
    pub fn responder(&self) -> Responder {
        Responder::new(self.credentials.clone(), self.anchor.clone())
    }

    /// Run the handshake on an accepted connection.
    pub async fn handshake(&self, stream: TcpStream) -> Result<Session<TcpStream>> {
        accept(stream, self.responder(), &self.config).await
    }

    /// Accept the next connection and complete its handshake.
    pub async fn accept(&self) -> Result<Session<TcpStream>> {
        let (stream, _) = self.accept_tcp().await?;
        self.handshake(stream).await
    }
}

/// Connect to `addr` and run the initiator side of the handshake.
pub async fn connect_tcp(
    addr: impl ToSocketAddrs,
    credentials: Arc<LocalCredentials>,
    anchor: TrustAnchor,
    config: &SessionConfig,
) -> Result<Session<TcpStream>> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    connect(stream, Initiator::new(credentials, anchor), config).await
}
