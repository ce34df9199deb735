//! Internet checksum (RFC 1071) shared by the ICMP and IPv4 codecs

use byteorder::{BigEndian, ByteOrder};

/// Computes the one's complement internet checksum of `data`
///
/// Bytes are summed as big-endian 16-bit words. A trailing odd byte is
/// treated as the high byte of a zero-padded word. The checksum field of the
/// packet being summed must be zero while computing.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        sum += BigEndian::read_u16(word) as u32;
    }

    if let Some(&odd) = chunks.remainder().first() {
        sum += (odd as u32) << 8;
    }

    // fold twice so no carry survives into bit 16
    sum = (sum >> 16) + (sum & 0xffff);
    sum += sum >> 16;

    !(sum as u16)
}

/// Returns true if `data`, with its checksum field filled in, sums to zero
pub fn verify(data: &[u8]) -> bool {
    checksum(data) == 0
}

#[cfg(test)]
#[path = "./checksum_tests.rs"]
mod tests;
