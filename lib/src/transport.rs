//! Provides the packet transport abstraction clients send and receive on
//!
//! [`PacketConn`] is implemented by [`raw::RawConn`] for real raw sockets and
//! by [`memory::MemoryConn`] for driving clients without touching the network.

#[cfg(test)]
use mockall::automock;

use std::{
    fmt,
    net::Ipv4Addr,
    time::{Duration, Instant},
};

use crate::{
    error::{RLanProbeError, Result},
    packet::MacAddr,
};

pub mod memory;
#[cfg(target_os = "linux")]
pub mod raw;

/// Address of a peer or local endpoint on a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Addr {
    /// Link-layer hardware address
    Hardware(MacAddr),
    /// IPv4 network-layer address
    Ip(Ipv4Addr),
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware(mac) => write!(f, "{}", mac),
            Self::Ip(ip) => write!(f, "{}", ip),
        }
    }
}

/// Trait describing a datagram transport with deadlines
///
/// Deadlines are absolute. A read or write attempted after its deadline, or
/// still blocked when the deadline passes, fails with
/// [`RLanProbeError::Timeout`]. `None` clears a deadline. Deadlines may be
/// changed from another thread while a read is blocked.
#[cfg_attr(test, automock)]
pub trait PacketConn: Send + Sync {
    /// Receives one packet into `buf`, returning its length and sender
    fn read_from(&self, buf: &mut [u8]) -> Result<(usize, Addr)>;

    /// Sends exactly `buf` to `addr`
    fn write_to(&self, buf: &[u8], addr: &Addr) -> Result<usize>;

    /// Releases the transport. Every later call, including a second close,
    /// fails with [`RLanProbeError::Closed`]
    fn close(&self) -> Result<()>;

    /// Returns the local address of the transport
    fn local_addr(&self) -> Addr;

    /// Sets both the read and the write deadline
    fn set_deadline(&self, deadline: Option<Instant>) -> Result<()>;

    /// Sets the read deadline
    fn set_read_deadline(&self, deadline: Option<Instant>) -> Result<()>;

    /// Sets the write deadline
    fn set_write_deadline(&self, deadline: Option<Instant>) -> Result<()>;
}

/// Read and write deadlines of a transport, kept behind a single lock
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    /// Deadline for reads
    pub read: Option<Instant>,
    /// Deadline for writes
    pub write: Option<Instant>,
}

/// Returns the time left before `deadline`, `None` if there is no deadline
///
/// # Errors
///
/// Returns [`RLanProbeError::Timeout`] if the deadline has passed
pub fn time_remaining(deadline: Option<Instant>) -> Result<Option<Duration>> {
    match deadline {
        None => Ok(None),
        Some(d) => {
            let now = Instant::now();
            if now >= d {
                Err(RLanProbeError::Timeout)
            } else {
                Ok(Some(d - now))
            }
        }
    }
}

#[cfg(test)]
#[path = "./transport_tests.rs"]
mod tests;
