//! Demultiplexes raw frames read off the wire into typed packets

use crate::error::{RLanProbeError, Result};

use super::{arp::ArpPacket, ethernet::EthernetHeader, ETHER_TYPE_ARP};

/// Parses a raw frame into its Ethernet header and embedded ARP packet
///
/// # Errors
///
/// - [`RLanProbeError::Truncated`] if the frame is shorter than an Ethernet
///   header
/// - [`RLanProbeError::NotArp`] if the frame carries some other protocol;
///   callers waiting for ARP traffic should drop the frame and keep reading
/// - any ARP decoding error for a malformed ARP payload
pub fn parse_packet(data: &[u8]) -> Result<(EthernetHeader, ArpPacket)> {
    let frame = EthernetHeader::unmarshal(data)?;

    if frame.ether_type != ETHER_TYPE_ARP {
        return Err(RLanProbeError::NotArp(frame.ether_type));
    }

    let arp = ArpPacket::unmarshal(&frame.payload)?;

    Ok((frame, arp))
}

#[cfg(test)]
#[path = "./dispatch_tests.rs"]
mod tests;
