//! UDP transport implementation for the drone command port

use crate::transport::traits::{DatagramConnector, DatagramLink};
use anyhow::Result;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::io;
use std::net::SocketAddr;
use tello_shared::protocol::MAX_DATAGRAM_SIZE;
use tokio::net::UdpSocket;
use tracing::debug;

/// UDP socket associated with one peer
pub struct UdpLink {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpLink {
    pub fn new(socket: UdpSocket, peer: SocketAddr) -> Self {
        Self { socket, peer }
    }
}

#[async_trait]
impl DatagramLink for UdpLink {
    async fn send(&self, payload: &[u8]) -> Result<()> {
        let sent = self.socket.send(payload).await?;
        if sent != payload.len() {
            anyhow::bail!("Partial datagram: {} of {} bytes sent", sent, payload.len());
        }
        Ok(())
    }

    async fn recv(&self) -> Result<Bytes> {
        // Sized for the largest IPv4 datagram so replies are never truncated
        let mut buf = BytesMut::zeroed(MAX_DATAGRAM_SIZE);
        let len = self.socket.recv(&mut buf).await?;
        buf.truncate(len);
        Ok(buf.freeze())
    }

    fn drain(&self) -> Result<Vec<Bytes>> {
        let mut queued = Vec::new();
        loop {
            let mut buf = BytesMut::zeroed(MAX_DATAGRAM_SIZE);
            match self.socket.try_recv(&mut buf) {
                Ok(len) => {
                    buf.truncate(len);
                    queued.push(buf.freeze());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(queued),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn peer(&self) -> SocketAddr {
        self.peer
    }
}

/// UDP connector binding a local socket and associating it with the peer
pub struct UdpConnector {
    bind: SocketAddr,
    peer: SocketAddr,
}

impl UdpConnector {
    pub fn new(bind: SocketAddr, peer: SocketAddr) -> Self {
        Self { bind, peer }
    }
}

#[async_trait]
impl DatagramConnector for UdpConnector {
    async fn connect(&self) -> Result<Box<dyn DatagramLink>> {
        let socket = UdpSocket::bind(self.bind).await?;
        // Only datagrams from the peer are delivered once connected
        socket.connect(self.peer).await?;
        debug!(
            "UDP socket {} associated with {}",
            socket.local_addr()?,
            self.peer
        );
        Ok(Box::new(UdpLink::new(socket, self.peer)))
    }

    fn name(&self) -> &'static str {
        "UDP"
    }
}
