//! Provides the Ethernet II frame codec

use byteorder::{BigEndian, ByteOrder};

use crate::error::{RLanProbeError, Result};

use super::MacAddr;

/// Length of the destination + source + ethertype header
pub const ETHERNET_HEADER_LEN: usize = 14;
/// Minimum payload carried by a frame; shorter payloads are zero padded
pub const ETHERNET_MIN_PAYLOAD_LEN: usize = 46;
/// Minimum frame length on the wire (excluding FCS)
pub const ETHERNET_MIN_FRAME_LEN: usize =
    ETHERNET_HEADER_LEN + ETHERNET_MIN_PAYLOAD_LEN;

/// Hardware address of a frame that is delivered to every device on the
/// segment
pub const ETHERNET_BROADCAST: MacAddr =
    MacAddr(0xff, 0xff, 0xff, 0xff, 0xff, 0xff);

/// An Ethernet II frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetHeader {
    /// Destination hardware address
    pub dest_addr: MacAddr,
    /// Source hardware address
    pub source_addr: MacAddr,
    /// Protocol discriminator of the payload
    pub ether_type: u16,
    /// Frame payload. Decoded frames keep any trailing pad bytes; the codec
    /// for the embedded protocol determines its own length.
    pub payload: Vec<u8>,
}

impl EthernetHeader {
    /// Returns a new frame wrapping `payload`
    pub fn new(
        dest_addr: MacAddr,
        source_addr: MacAddr,
        ether_type: u16,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            dest_addr,
            source_addr,
            ether_type,
            payload,
        }
    }

    /// Encodes the frame, zero filling the payload up to the Ethernet minimum
    pub fn marshal(&self) -> Vec<u8> {
        let payload_len = self.payload.len().max(ETHERNET_MIN_PAYLOAD_LEN);
        let mut buf = vec![0u8; ETHERNET_HEADER_LEN + payload_len];

        buf[0..6].copy_from_slice(&self.dest_addr.octets());
        buf[6..12].copy_from_slice(&self.source_addr.octets());
        BigEndian::write_u16(&mut buf[12..14], self.ether_type);
        buf[ETHERNET_HEADER_LEN..ETHERNET_HEADER_LEN + self.payload.len()]
            .copy_from_slice(&self.payload);

        buf
    }

    /// Decodes a frame
    ///
    /// # Errors
    ///
    /// Returns [`RLanProbeError::Truncated`] if `data` is shorter than the 14
    /// byte header
    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        if data.len() < ETHERNET_HEADER_LEN {
            return Err(RLanProbeError::Truncated {
                packet: "ethernet",
                expected: ETHERNET_HEADER_LEN,
                actual: data.len(),
            });
        }

        Ok(Self {
            dest_addr: mac_from_slice(&data[0..6]),
            source_addr: mac_from_slice(&data[6..12]),
            ether_type: BigEndian::read_u16(&data[12..14]),
            payload: data[ETHERNET_HEADER_LEN..].to_vec(),
        })
    }
}

// caller guarantees a 6 byte slice
pub(crate) fn mac_from_slice(b: &[u8]) -> MacAddr {
    MacAddr::new(b[0], b[1], b[2], b[3], b[4], b[5])
}

#[cfg(test)]
#[path = "./ethernet_tests.rs"]
mod tests;
