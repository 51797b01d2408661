//! Local demo: one server and one client exchanging a message each way.
//!
//! With no arguments an in-process CA issues both certificates. With two
//! arguments they are read as the server's and the client's key material
//! configs (see `KeyMaterialConfig`).

use std::sync::Arc;

use tandemstream::{connect_tcp, Result, Server, SessionConfig};
use tandemtrust::cert::TrustAnchor;
use tandemtrust::credentials::{KeyMaterialConfig, LocalCredentials};
use tandemtrust::crypto::keys::IdentityKeyPair;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

const CA_NAME: &str = "Tandem Demo CA";

struct Party {
    credentials: Arc<LocalCredentials>,
    anchor: TrustAnchor,
}

fn load_party(path: &str) -> Result<Party> {
    let config = KeyMaterialConfig::from_file(path)?;
    Ok(Party {
        credentials: Arc::new(LocalCredentials::load(&config)?),
        anchor: TrustAnchor::load(&config)?,
    })
}

fn provision() -> Result<(Party, Party)> {
    let ca = IdentityKeyPair::generate();
    let anchor = TrustAnchor::from_identity(CA_NAME, &ca);
    let server = Party {
        credentials: Arc::new(LocalCredentials::issue(&ca, CA_NAME, "server")?),
        anchor: anchor.clone(),
    };
    let client = Party {
        credentials: Arc::new(LocalCredentials::issue(&ca, CA_NAME, "client")?),
        anchor,
    };
    Ok((server, client))
}

async fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (server_party, client_party) = match args.as_slice() {
        [server, client] => (load_party(server)?, load_party(client)?),
        _ => provision()?,
    };

    let config = SessionConfig::default();
    let server = Server::bind(
        "127.0.0.1:0",
        server_party.credentials,
        server_party.anchor,
        config.clone(),
    )
    .await?;
    let addr = server.local_addr()?;

    let server_task = tokio::spawn(async move {
        let mut session = server.accept().await?;
        session.send(b"Is anyone there?").await?;
        let reply = session.recv().await?;
        info!(from = %session.peer_certificate().subject, "{}", String::from_utf8_lossy(&reply));
        session.close().await
    });

    let mut session = connect_tcp(addr, client_party.credentials, client_party.anchor, &config).await?;
    let greeting = session.recv().await?;
    info!(from = %session.peer_certificate().subject, "{}", String::from_utf8_lossy(&greeting));
    session.send(b"Yeah, what do you want?").await?;

    match server_task.await {
        Ok(result) => result,
        Err(e) => Err(std::io::Error::other(e).into()),
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber already installed");
    }

    if let Err(e) = run().await {
        error!(error = %e, "demo failed");
        std::process::exit(1);
    }
}
