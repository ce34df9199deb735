//! Provides the ICMP (RFC 792) echo request / reply codec

use byteorder::{BigEndian, ByteOrder};

use crate::error::{RLanProbeError, Result};

use super::checksum;

/// Length of the ICMP echo header preceding the payload
pub const ICMP_HEADER_LEN: usize = 8;
/// ICMP type of an echo reply
pub const ICMP_TYPE_ECHO_REPLY: u8 = 0;
/// ICMP type of an echo request
pub const ICMP_TYPE_ECHO_REQUEST: u8 = 8;

/// An ICMP echo packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpPacket {
    /// Message type: 8 for echo request, 0 for echo reply
    pub icmp_type: u8,
    /// Message code, 0 for echo
    pub code: u8,
    /// Internet checksum over the whole packet including payload
    pub checksum: u16,
    /// Identifies the sending session
    pub id: u16,
    /// Sequence number of the request
    pub seq: u16,
    /// Arbitrary data echoed back unchanged
    pub payload: Vec<u8>,
}

impl IcmpPacket {
    /// Builds an echo request with its checksum computed over the header and
    /// payload
    pub fn build_echo_request(seq: u16, id: u16, payload: &[u8]) -> Self {
        let mut packet = Self {
            icmp_type: ICMP_TYPE_ECHO_REQUEST,
            code: 0,
            checksum: 0,
            id,
            seq,
            payload: payload.to_vec(),
        };
        packet.update_checksum();
        packet
    }

    /// Builds the echo reply a peer would send back for `request`
    pub fn build_echo_reply(request: &IcmpPacket) -> Self {
        let mut packet = Self {
            icmp_type: ICMP_TYPE_ECHO_REPLY,
            code: 0,
            checksum: 0,
            id: request.id,
            seq: request.seq,
            payload: request.payload.clone(),
        };
        packet.update_checksum();
        packet
    }

    /// Returns true if this is an echo reply
    pub fn is_echo_reply(&self) -> bool {
        self.icmp_type == ICMP_TYPE_ECHO_REPLY
    }

    /// Recomputes and stores the checksum
    pub fn update_checksum(&mut self) {
        self.checksum = 0;
        self.checksum = checksum::checksum(&self.marshal());
    }

    /// Returns true if the stored checksum matches the packet contents
    pub fn verify_checksum(&self) -> bool {
        checksum::verify(&self.marshal())
    }

    /// Encodes the header followed by the payload
    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = vec![0u8; ICMP_HEADER_LEN + self.payload.len()];
        buf[0] = self.icmp_type;
        buf[1] = self.code;
        BigEndian::write_u16(&mut buf[2..4], self.checksum);
        BigEndian::write_u16(&mut buf[4..6], self.id);
        BigEndian::write_u16(&mut buf[6..8], self.seq);
        buf[ICMP_HEADER_LEN..].copy_from_slice(&self.payload);
        buf
    }

    /// Decodes a packet; everything after the header is the payload
    ///
    /// # Errors
    ///
    /// Returns [`RLanProbeError::Truncated`] if `data` is shorter than the 8
    /// byte header
    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        if data.len() < ICMP_HEADER_LEN {
            return Err(RLanProbeError::Truncated {
                packet: "icmp",
                expected: ICMP_HEADER_LEN,
                actual: data.len(),
            });
        }

        Ok(Self {
            icmp_type: data[0],
            code: data[1],
            checksum: BigEndian::read_u16(&data[2..4]),
            id: BigEndian::read_u16(&data[4..6]),
            seq: BigEndian::read_u16(&data[6..8]),
            payload: data[ICMP_HEADER_LEN..].to_vec(),
        })
    }
}

#[cfg(test)]
#[path = "./icmp_tests.rs"]
mod tests;
