//! Self-reconnecting live update client for the Tempest streaming API
//!
//! One persistent duplex connection per client instance. After open, the
//! client sends a `listen_start` handshake for its device, filters inbound
//! messages down to live observations, throttles delivery to its consumer,
//! and reconnects on a fixed delay when the connection drops.

pub mod client;
pub mod machine;

pub use client::*;
pub use machine::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("invalid websocket url: {0}")]
    InvalidUrl(String),
}

pub type LiveResult<T> = Result<T, LiveError>;
