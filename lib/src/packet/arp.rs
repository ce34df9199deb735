//! Provides the ARP (RFC 826) packet codec and helpers for creating ARP
//! requests and replies

use byteorder::{BigEndian, ByteOrder};
use std::{fmt, net::Ipv4Addr};

use crate::error::{RLanProbeError, Result};

use super::{
    ethernet::mac_from_slice, MacAddr, ETHER_TYPE_IPV4, HARDWARE_ADDR_LEN,
    IPV4_ADDR_LEN,
};

/// Length of the fixed part of an ARP packet preceding the address fields
pub const ARP_FIXED_HEADER_LEN: usize = 8;
/// Hardware type for Ethernet
pub const ARP_HARDWARE_ETHERNET: u16 = 1;

/// ARP operation code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArpOperation {
    /// Who has `target_ip`?
    Request,
    /// `sender_ip` is at `sender_hardware_addr`
    Reply,
    /// Any other operation code, preserved as found on the wire
    Other(u16),
}

impl From<u16> for ArpOperation {
    fn from(value: u16) -> Self {
        match value {
            1 => Self::Request,
            2 => Self::Reply,
            v => Self::Other(v),
        }
    }
}

impl From<ArpOperation> for u16 {
    fn from(value: ArpOperation) -> Self {
        match value {
            ArpOperation::Request => 1,
            ArpOperation::Reply => 2,
            ArpOperation::Other(v) => v,
        }
    }
}

impl fmt::Display for ArpOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Reply => write!(f, "reply"),
            Self::Other(v) => write!(f, "op({})", v),
        }
    }
}

/// An ARP packet
///
/// Address widths on the wire are governed by `hardware_addr_length` and
/// `protocol_length`. Only Ethernet hardware addresses (6 bytes) and IPv4
/// protocol addresses (4 bytes) can be represented; the codec rejects other
/// widths rather than guessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpPacket {
    /// Link type, 1 for Ethernet
    pub hardware_type: u16,
    /// EtherType of the resolved protocol, normally IPv4
    pub protocol_type: u16,
    /// Byte width of hardware addresses
    pub hardware_addr_length: u8,
    /// Byte width of protocol addresses
    pub protocol_length: u8,
    /// Request or reply
    pub operation: ArpOperation,
    /// Hardware address of the sender
    pub sender_hardware_addr: MacAddr,
    /// Protocol address of the sender
    pub sender_ip: Ipv4Addr,
    /// Hardware address of the target (ignored in requests)
    pub target_hardware_addr: MacAddr,
    /// Protocol address of the target
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    /// Builds a new ARP request asking who owns `target_ip`
    ///
    /// `dest_mac` is conventionally the broadcast address for discovery
    pub fn build_request(
        source_ip: Ipv4Addr,
        target_ip: Ipv4Addr,
        source_mac: MacAddr,
        dest_mac: MacAddr,
    ) -> Self {
        Self::build(
            ArpOperation::Request,
            source_ip,
            target_ip,
            source_mac,
            dest_mac,
        )
    }

    /// Builds a new ARP reply announcing that `source_ip` is at `source_mac`
    pub fn build_reply(
        source_ip: Ipv4Addr,
        target_ip: Ipv4Addr,
        source_mac: MacAddr,
        dest_mac: MacAddr,
    ) -> Self {
        Self::build(
            ArpOperation::Reply,
            source_ip,
            target_ip,
            source_mac,
            dest_mac,
        )
    }

    fn build(
        operation: ArpOperation,
        source_ip: Ipv4Addr,
        target_ip: Ipv4Addr,
        source_mac: MacAddr,
        dest_mac: MacAddr,
    ) -> Self {
        Self {
            hardware_type: ARP_HARDWARE_ETHERNET,
            protocol_type: ETHER_TYPE_IPV4,
            hardware_addr_length: HARDWARE_ADDR_LEN as u8,
            protocol_length: IPV4_ADDR_LEN as u8,
            operation,
            sender_hardware_addr: source_mac,
            sender_ip: source_ip,
            target_hardware_addr: dest_mac,
            target_ip,
        }
    }

    /// Returns the encoded length implied by the address length fields
    pub fn encoded_len(&self) -> usize {
        packet_len(self.hardware_addr_length, self.protocol_length)
    }

    /// Encodes the packet
    ///
    /// # Errors
    ///
    /// Returns [`RLanProbeError::InvalidLength`] if a length field is zero or
    /// does not match the width of the address it describes
    pub fn marshal(&self) -> Result<Vec<u8>> {
        check_lengths(self.hardware_addr_length, self.protocol_length)?;

        let hlen = self.hardware_addr_length as usize;
        let plen = self.protocol_length as usize;

        if hlen != HARDWARE_ADDR_LEN || plen != IPV4_ADDR_LEN {
            return Err(RLanProbeError::InvalidLength(format!(
                "cannot encode hardware length {} / protocol length {}",
                hlen, plen
            )));
        }

        let mut buf = vec![0u8; self.encoded_len()];

        BigEndian::write_u16(&mut buf[0..2], self.hardware_type);
        BigEndian::write_u16(&mut buf[2..4], self.protocol_type);
        buf[4] = self.hardware_addr_length;
        buf[5] = self.protocol_length;
        BigEndian::write_u16(&mut buf[6..8], self.operation.into());

        let mut n = ARP_FIXED_HEADER_LEN;
        buf[n..n + hlen].copy_from_slice(&self.sender_hardware_addr.octets());
        n += hlen;
        buf[n..n + plen].copy_from_slice(&self.sender_ip.octets());
        n += plen;
        buf[n..n + hlen].copy_from_slice(&self.target_hardware_addr.octets());
        n += hlen;
        buf[n..n + plen].copy_from_slice(&self.target_ip.octets());

        Ok(buf)
    }

    /// Decodes a packet. Trailing bytes beyond the declared length (such as
    /// Ethernet padding) are ignored.
    ///
    /// # Errors
    ///
    /// - [`RLanProbeError::Truncated`] if `data` is shorter than the fixed
    ///   header or the length implied by the address length fields
    /// - [`RLanProbeError::InvalidLength`] if an address length field is zero
    /// - [`RLanProbeError::InvalidAddress`] if an address is not a 6 byte
    ///   hardware address or a 4 byte IPv4 address
    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        if data.len() < ARP_FIXED_HEADER_LEN {
            return Err(RLanProbeError::Truncated {
                packet: "arp",
                expected: ARP_FIXED_HEADER_LEN,
                actual: data.len(),
            });
        }

        let hardware_type = BigEndian::read_u16(&data[0..2]);
        let protocol_type = BigEndian::read_u16(&data[2..4]);
        let hardware_addr_length = data[4];
        let protocol_length = data[5];
        let operation = ArpOperation::from(BigEndian::read_u16(&data[6..8]));

        check_lengths(hardware_addr_length, protocol_length)?;

        let arp_len = packet_len(hardware_addr_length, protocol_length);
        if data.len() < arp_len {
            return Err(RLanProbeError::Truncated {
                packet: "arp",
                expected: arp_len,
                actual: data.len(),
            });
        }

        let hlen = hardware_addr_length as usize;
        let plen = protocol_length as usize;

        let mut n = ARP_FIXED_HEADER_LEN;
        let sender_hw = &data[n..n + hlen];
        n += hlen;
        let sender_ip = &data[n..n + plen];
        n += plen;
        let target_hw = &data[n..n + hlen];
        n += hlen;
        let target_ip = &data[n..n + plen];

        Ok(Self {
            hardware_type,
            protocol_type,
            hardware_addr_length,
            protocol_length,
            operation,
            sender_hardware_addr: hardware_addr(sender_hw, "sender")?,
            sender_ip: ipv4_addr(sender_ip, "sender")?,
            target_hardware_addr: hardware_addr(target_hw, "target")?,
            target_ip: ipv4_addr(target_ip, "target")?,
        })
    }
}

fn packet_len(hardware_addr_length: u8, protocol_length: u8) -> usize {
    ARP_FIXED_HEADER_LEN
        + 2 * hardware_addr_length as usize
        + 2 * protocol_length as usize
}

fn check_lengths(hardware_addr_length: u8, protocol_length: u8) -> Result<()> {
    if hardware_addr_length == 0 {
        return Err(RLanProbeError::InvalidLength(
            "hardware address length is zero".into(),
        ));
    }
    if protocol_length == 0 {
        return Err(RLanProbeError::InvalidLength(
            "protocol address length is zero".into(),
        ));
    }
    Ok(())
}

fn hardware_addr(b: &[u8], which: &str) -> Result<MacAddr> {
    if b.len() != HARDWARE_ADDR_LEN {
        return Err(RLanProbeError::InvalidAddress(format!(
            "{} hardware address has {} bytes",
            which,
            b.len()
        )));
    }
    Ok(mac_from_slice(b))
}

fn ipv4_addr(b: &[u8], which: &str) -> Result<Ipv4Addr> {
    let octets: [u8; IPV4_ADDR_LEN] = b.try_into().map_err(|_| {
        RLanProbeError::InvalidAddress(format!(
            "{} ip address has {} bytes",
            which,
            b.len()
        ))
    })?;
    Ok(Ipv4Addr::from(octets))
}

#[cfg(test)]
#[path = "./arp_tests.rs"]
mod tests;
