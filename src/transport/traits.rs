//! Transport trait abstraction for pluggable datagram backends

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;

/// A connected datagram link to a single peer
///
/// Both methods take `&self` so one task can wait on `recv` while another
/// sends.
#[async_trait]
pub trait DatagramLink: Send + Sync + 'static {
    /// Send one datagram to the peer
    async fn send(&self, payload: &[u8]) -> Result<()>;

    /// Wait for the next datagram from the peer
    async fn recv(&self) -> Result<Bytes>;

    /// Take every datagram already queued, without waiting
    fn drain(&self) -> Result<Vec<Bytes>>;

    /// Address of the peer this link talks to
    fn peer(&self) -> SocketAddr;
}

/// Factory for creating datagram links
#[async_trait]
pub trait DatagramConnector: Send + Sync + 'static {
    /// Attempt to bind and associate, returning a link on success
    async fn connect(&self) -> Result<Box<dyn DatagramLink>>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
