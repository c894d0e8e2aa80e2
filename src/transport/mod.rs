pub mod session;
pub mod traits;
pub mod udp;

#[cfg(test)]
pub(crate) mod mock;

pub use session::TransportSession;
pub use traits::{DatagramConnector, DatagramLink};
pub use udp::{UdpConnector, UdpLink};
