//! TandemStream -- async record transport and session drivers for TandemTrust.
//!
//! Carries the five handshake records and the sealed application records
//! over any `AsyncRead + AsyncWrite` stream. Every application message is
//! answered by a sealed acknowledgement before the next one may be sent.

pub mod config;
pub mod error;
pub mod frame;
pub mod server;
pub mod session;

pub use config::SessionConfig;
pub use error::{Result, TandemStreamError};
pub use server::{connect_tcp, Server};
pub use session::{accept, connect, Session};
