//! Provides the [`Client`] that owns a local identity and a transport and
//! performs ARP resolution and ICMP echo on top of them
//!
//! A client performs one blocking exchange at a time: every operation that
//! touches the wire takes `&mut self`, so replies can never be attributed to
//! the wrong in-flight call. Callers wanting concurrency give each caller its
//! own client and transport.

use std::{net::Ipv4Addr, time::Instant};

use crate::{
    error::{RLanProbeError, Result},
    network::NetworkInterface,
    packet::MacAddr,
    transport::PacketConn,
};

pub mod arp;
pub mod icmp;

pub use arp::{DiscardReason, ReplyMatch, ResolveState};
pub use icmp::PingResult;

/// A client bound to one interface and one transport
pub struct Client {
    interface: NetworkInterface,
    conn: Box<dyn PacketConn>,
    source_ip: Option<Ipv4Addr>,
    source_hardware_addr: MacAddr,
    icmp_id: u16,
    icmp_seq: u16,
}

impl Client {
    /// Returns a new client sending from the first IPv4 address and the
    /// native hardware address of `interface`
    ///
    /// An interface without an IPv4 address still yields a client, but every
    /// operation that needs a source address fails with
    /// [`RLanProbeError::InvalidClient`].
    pub fn new(interface: NetworkInterface, conn: Box<dyn PacketConn>) -> Self {
        let source_ip = interface.ipv4();

        if source_ip.is_none() {
            log::warn!("interface {} has no IPv4 address", interface.name);
        }

        Self {
            source_hardware_addr: interface.mac,
            source_ip,
            interface,
            conn,
            icmp_id: (std::process::id() & 0xffff) as u16,
            icmp_seq: 1,
        }
    }

    /// Returns a client on a link-layer raw socket receiving ARP frames
    #[cfg(target_os = "linux")]
    pub fn open_arp(interface: NetworkInterface) -> Result<Self> {
        use crate::{
            packet::ETHER_TYPE_ARP,
            transport::raw::{RawConn, SocketKind},
        };

        let conn = RawConn::open(&interface, SocketKind::Link, ETHER_TYPE_ARP)?;
        Ok(Self::new(interface, Box::new(conn)))
    }

    /// Returns a client on a raw IP socket receiving ICMP datagrams
    #[cfg(target_os = "linux")]
    pub fn open_icmp(interface: NetworkInterface) -> Result<Self> {
        use crate::{
            packet::IP_PROTOCOL_ICMP,
            transport::raw::{RawConn, SocketKind},
        };

        let conn = RawConn::open(
            &interface,
            SocketKind::Ip,
            IP_PROTOCOL_ICMP as u16,
        )?;
        Ok(Self::new(interface, Box::new(conn)))
    }

    /// Returns the interface the client is bound to
    pub fn interface(&self) -> &NetworkInterface {
        &self.interface
    }

    /// Returns the transport
    pub fn conn(&self) -> &dyn PacketConn {
        self.conn.as_ref()
    }

    /// Returns the source IPv4 address, if the interface has one
    pub fn source_ip(&self) -> Option<Ipv4Addr> {
        self.source_ip
    }

    /// Returns the source hardware address
    pub fn source_hardware_addr(&self) -> MacAddr {
        self.source_hardware_addr
    }

    /// Returns the ICMP identifier used for every echo request
    pub fn icmp_id(&self) -> u16 {
        self.icmp_id
    }

    /// Returns the sequence number the next echo request will carry
    pub fn icmp_seq(&self) -> u16 {
        self.icmp_seq
    }

    /// Sets both transport deadlines
    pub fn set_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.conn.set_deadline(deadline)
    }

    /// Sets the transport read deadline
    pub fn set_read_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.conn.set_read_deadline(deadline)
    }

    /// Sets the transport write deadline
    pub fn set_write_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.conn.set_write_deadline(deadline)
    }

    /// Closes the transport
    pub fn close(&self) -> Result<()> {
        self.conn.close()
    }

    fn require_source_ip(&self) -> Result<Ipv4Addr> {
        self.source_ip.ok_or_else(|| {
            RLanProbeError::InvalidClient(self.interface.name.clone())
        })
    }
}

#[cfg(test)]
#[path = "./client_tests.rs"]
mod tests;
