//! Provides a minimal IPv4 header builder for raw-IP sends, and a helper for
//! splitting the header off datagrams read from a raw-IP socket

use byteorder::{BigEndian, ByteOrder};
use derive_builder::Builder;
use std::net::Ipv4Addr;

use crate::error::{RLanProbeError, Result};

use super::checksum;

/// Length of an IPv4 header without options
pub const IPV4_HEADER_LEN: usize = 20;
/// Default time to live for outgoing datagrams
pub const DEFAULT_TTL: u8 = 64;

const IPV4_VERSION: u8 = 4;
const MIN_IHL: u8 = 5;

/// An IPv4 header without options
///
/// Fragmentation is not supported, so the random `id` only needs to be
/// collision tolerant.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(setter(into))]
pub struct Ipv4Header {
    /// Header length in 32-bit words as decoded by [`split`]. Headers are
    /// only ever built without options, so this cannot be set on the builder
    #[builder(setter(skip), default = "MIN_IHL")]
    pub ihl: u8,
    /// DSCP / ECN
    #[builder(default)]
    pub service: u8,
    /// Header + payload length in bytes
    pub total_len: u16,
    /// Datagram identifier
    #[builder(default = "rand::random()")]
    pub id: u16,
    /// Flags and fragment offset
    #[builder(default)]
    pub flags_fragment_offset: u16,
    /// Time to live
    #[builder(default = "DEFAULT_TTL")]
    pub ttl: u8,
    /// Next-layer protocol number
    pub protocol: u8,
    /// Header checksum as found on the wire; recomputed by
    /// [`Ipv4Header::to_raw`]
    #[builder(default)]
    pub checksum: u16,
    /// Source address
    pub source: Ipv4Addr,
    /// Destination address
    pub destination: Ipv4Addr,
}

impl Ipv4Header {
    /// Returns builder for Ipv4Header
    pub fn builder() -> Ipv4HeaderBuilder {
        Ipv4HeaderBuilder::default()
    }

    /// Encodes the 20 byte header with a freshly computed checksum. Options
    /// are never written, so the IHL on the wire is always 5 even for a
    /// decoded header that carried options.
    pub fn to_raw(&self) -> [u8; IPV4_HEADER_LEN] {
        let mut buf = [0u8; IPV4_HEADER_LEN];

        buf[0] = (IPV4_VERSION << 4) | MIN_IHL;
        buf[1] = self.service;
        BigEndian::write_u16(&mut buf[2..4], self.total_len);
        BigEndian::write_u16(&mut buf[4..6], self.id);
        BigEndian::write_u16(&mut buf[6..8], self.flags_fragment_offset);
        buf[8] = self.ttl;
        buf[9] = self.protocol;
        buf[12..16].copy_from_slice(&self.source.octets());
        buf[16..20].copy_from_slice(&self.destination.octets());

        let sum = checksum::checksum(&buf);
        BigEndian::write_u16(&mut buf[10..12], sum);

        buf
    }
}

/// Builds a header for a datagram carrying `payload_len` bytes of `protocol`
///
/// # Errors
///
/// Returns [`RLanProbeError::InvalidLength`] if the datagram would exceed the
/// 16-bit total length field
pub fn build(
    source_ip: Ipv4Addr,
    dest_ip: Ipv4Addr,
    protocol: u8,
    payload_len: usize,
) -> Result<Vec<u8>> {
    let total_len = u16::try_from(IPV4_HEADER_LEN + payload_len).map_err(|_| {
        RLanProbeError::InvalidLength(format!(
            "ipv4 payload of {} bytes is too large",
            payload_len
        ))
    })?;

    let header = Ipv4Header::builder()
        .source(source_ip)
        .destination(dest_ip)
        .protocol(protocol)
        .total_len(total_len)
        .build()?;

    Ok(header.to_raw().to_vec())
}

/// Splits a datagram into its decoded header and payload
///
/// The payload ends at `total_len` when that field is consistent with the
/// buffer, otherwise at the end of the buffer.
///
/// # Errors
///
/// - [`RLanProbeError::Truncated`] if `data` is shorter than the header
/// - [`RLanProbeError::InvalidLength`] if the version is not 4 or the header
///   length is below 5 words
pub fn split(data: &[u8]) -> Result<(Ipv4Header, &[u8])> {
    if data.len() < IPV4_HEADER_LEN {
        return Err(RLanProbeError::Truncated {
            packet: "ipv4",
            expected: IPV4_HEADER_LEN,
            actual: data.len(),
        });
    }

    let version = data[0] >> 4;
    let ihl = data[0] & 0x0f;

    if version != IPV4_VERSION {
        return Err(RLanProbeError::InvalidLength(format!(
            "ip version {} is not 4",
            version
        )));
    }

    if ihl < MIN_IHL {
        return Err(RLanProbeError::InvalidLength(format!(
            "ipv4 header length of {} words",
            ihl
        )));
    }

    let header_len = ihl as usize * 4;
    if data.len() < header_len {
        return Err(RLanProbeError::Truncated {
            packet: "ipv4",
            expected: header_len,
            actual: data.len(),
        });
    }

    let total_len = BigEndian::read_u16(&data[2..4]);
    let end = match total_len as usize {
        n if n >= header_len && n <= data.len() => n,
        _ => data.len(),
    };

    let header = Ipv4Header {
        ihl,
        service: data[1],
        total_len,
        id: BigEndian::read_u16(&data[4..6]),
        flags_fragment_offset: BigEndian::read_u16(&data[6..8]),
        ttl: data[8],
        protocol: data[9],
        checksum: BigEndian::read_u16(&data[10..12]),
        source: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
        destination: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
    };

    Ok((header, &data[header_len..end]))
}

#[cfg(test)]
#[path = "./ipv4_tests.rs"]
mod tests;
