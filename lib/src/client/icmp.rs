//! ICMP echo for [`Client`]

use std::{
    net::Ipv4Addr,
    time::{Duration, Instant},
};

use crate::{
    error::{RLanProbeError, Result},
    packet::{icmp::IcmpPacket, ipv4, IP_PROTOCOL_ICMP},
    transport::Addr,
};

use super::Client;

// Large enough for any datagram on an untagged Ethernet segment
const DATAGRAM_BUF_LEN: usize = 1500;

/// Outcome of [`Client::ping`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingResult {
    /// Time from sending the request until the reply or the deadline
    pub rtt: Duration,
    /// True if the peer answered before the deadline
    pub alive: bool,
}

impl Client {
    /// Sends one echo request to `dest`
    ///
    /// The request carries the client's ICMP id and current sequence number;
    /// the sequence number is advanced even if the write fails so it is
    /// never reused.
    ///
    /// # Errors
    ///
    /// Returns [`RLanProbeError::InvalidClient`] if the client has no source
    /// IPv4 address, or any transport error from the write
    pub fn send_icmp(&mut self, dest: Ipv4Addr, payload: &[u8]) -> Result<()> {
        let source_ip = self.require_source_ip()?;

        let icmp = IcmpPacket::build_echo_request(
            self.icmp_seq,
            self.icmp_id,
            payload,
        );
        self.icmp_seq = self.icmp_seq.wrapping_add(1);

        let icmp_bytes = icmp.marshal();
        let mut datagram =
            ipv4::build(source_ip, dest, IP_PROTOCOL_ICMP, icmp_bytes.len())?;
        datagram.extend_from_slice(&icmp_bytes);

        log::debug!(
            "sending ICMP echo request to {}: id={} seq={}",
            dest,
            icmp.id,
            icmp.seq
        );

        self.conn.write_to(&datagram, &Addr::Ip(dest))?;

        Ok(())
    }

    /// Reads one datagram and returns it as an echo reply along with the time
    /// spent waiting for it
    ///
    /// Unlike [`Client::resolve_mac`] this does not loop: a datagram that is
    /// not an echo reply for this client is reported, not skipped.
    ///
    /// # Errors
    ///
    /// - [`RLanProbeError::UnexpectedReply`] if the datagram is not ICMP, is
    ///   not an echo reply, or carries another session's id
    /// - any decoding error for a malformed datagram
    /// - [`RLanProbeError::Timeout`] or any other transport error
    pub fn receive_icmp(&mut self) -> Result<(IcmpPacket, Duration)> {
        let (_, icmp, elapsed) = self.read_echo_reply()?;
        Ok((icmp, elapsed))
    }

    /// Sends one echo request to `dest` and reads one reply
    ///
    /// A read deadline expiring is not an error here: the peer is reported
    /// as not alive. Only a reply from `dest` carrying the sequence number
    /// just sent counts; a late reply to an earlier request is reported, not
    /// credited to this one.
    ///
    /// # Errors
    ///
    /// - [`RLanProbeError::UnexpectedReply`] if the reply is from another
    ///   host or answers another request
    /// - any error from [`Client::send_icmp`] or [`Client::receive_icmp`]
    ///   other than [`RLanProbeError::Timeout`]
    pub fn ping(
        &mut self,
        dest: Ipv4Addr,
        payload: &[u8],
    ) -> Result<PingResult> {
        let start = Instant::now();
        let seq = self.icmp_seq;

        self.send_icmp(dest, payload)?;

        match self.read_echo_reply() {
            Ok((source, icmp, _)) if source == dest && icmp.seq == seq => {
                Ok(PingResult {
                    rtt: start.elapsed(),
                    alive: true,
                })
            }
            Ok((source, icmp, _)) => Err(RLanProbeError::UnexpectedReply(
                format!(
                    "reply seq {} from {}, expected seq {} from {}",
                    icmp.seq, source, seq, dest
                ),
            )),
            Err(RLanProbeError::Timeout) => {
                log::debug!("ping {} timed out", dest);
                Ok(PingResult {
                    rtt: start.elapsed(),
                    alive: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    // Returns the IPv4 source of the reply alongside the packet
    fn read_echo_reply(&mut self) -> Result<(Ipv4Addr, IcmpPacket, Duration)> {
        let mut buf = [0u8; DATAGRAM_BUF_LEN];

        let start = Instant::now();
        let (n, from) = self.conn.read_from(&mut buf)?;
        let elapsed = start.elapsed();

        let (header, payload) = ipv4::split(&buf[..n])?;

        if header.protocol != IP_PROTOCOL_ICMP {
            return Err(RLanProbeError::UnexpectedReply(format!(
                "ip protocol {} from {}",
                header.protocol, from
            )));
        }

        let icmp = IcmpPacket::unmarshal(payload)?;

        if icmp.id != self.icmp_id || !icmp.is_echo_reply() {
            return Err(RLanProbeError::UnexpectedReply(format!(
                "icmp type {} id {} from {}",
                icmp.icmp_type, icmp.id, header.source
            )));
        }

        log::debug!(
            "received ICMP echo reply from {}: seq={} in {:?}",
            header.source,
            icmp.seq,
            elapsed
        );

        Ok((header.source, icmp, elapsed))
    }
}

#[cfg(test)]
#[path = "./icmp_tests.rs"]
mod tests;
