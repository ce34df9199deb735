//! ARP request and MAC resolution for [`Client`]

use std::{fmt, net::Ipv4Addr};

use crate::{
    error::{RLanProbeError, Result},
    packet::{
        arp::{ArpOperation, ArpPacket},
        dispatch::parse_packet,
        ethernet::{EthernetHeader, ETHERNET_BROADCAST},
        MacAddr, ETHER_TYPE_ARP,
    },
    transport::Addr,
};

use super::Client;

// Large enough for any untagged Ethernet frame
const FRAME_BUF_LEN: usize = 1518;

/// Why a received frame did not answer an outstanding ARP request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Frame does not carry ARP
    NotArp,
    /// Frame is tagged ARP but could not be decoded
    Malformed,
    /// ARP packet is not a reply
    NotReply,
    /// ARP reply is from someone other than the target
    WrongSender,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotArp => "not arp",
            Self::Malformed => "malformed arp",
            Self::NotReply => "not a reply",
            Self::WrongSender => "wrong sender",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of checking one frame against an outstanding request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMatch {
    /// Frame is the awaited reply; carries the resolved hardware address
    Matched(MacAddr),
    /// Frame should be dropped and the wait continued
    Discard(DiscardReason),
}

/// States of a single [`Client::resolve_mac`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    /// Nothing sent yet
    Idle,
    /// Request is on the wire
    RequestSent,
    /// Blocked reading the next frame
    WaitingReply,
    /// Last frame was dropped
    DiscardUnmatched(DiscardReason),
    /// Target answered
    Resolved(MacAddr),
    /// Call ended with an I/O error or timeout
    Failed,
}

/// Checks whether `arp` is a reply from `target_ip`
pub fn classify_arp_reply(arp: &ArpPacket, target_ip: Ipv4Addr) -> ReplyMatch {
    if arp.operation != ArpOperation::Reply {
        return ReplyMatch::Discard(DiscardReason::NotReply);
    }
    if arp.sender_ip != target_ip {
        return ReplyMatch::Discard(DiscardReason::WrongSender);
    }
    ReplyMatch::Matched(arp.sender_hardware_addr)
}

/// Checks whether a raw frame is an ARP reply from `target_ip`
pub fn match_arp_reply(frame: &[u8], target_ip: Ipv4Addr) -> ReplyMatch {
    match parse_packet(frame) {
        Ok((_, arp)) => classify_arp_reply(&arp, target_ip),
        Err(RLanProbeError::NotArp(_)) => {
            ReplyMatch::Discard(DiscardReason::NotArp)
        }
        Err(_) => ReplyMatch::Discard(DiscardReason::Malformed),
    }
}

impl Client {
    /// Broadcasts one ARP request asking who has `target_ip`
    ///
    /// # Errors
    ///
    /// Returns [`RLanProbeError::InvalidClient`] if the client has no source
    /// IPv4 address, or any transport error from the write
    pub fn arp_request(&mut self, target_ip: Ipv4Addr) -> Result<()> {
        let source_ip = self.require_source_ip()?;

        let arp = ArpPacket::build_request(
            source_ip,
            target_ip,
            self.source_hardware_addr,
            ETHERNET_BROADCAST,
        );

        let frame = EthernetHeader::new(
            ETHERNET_BROADCAST,
            self.source_hardware_addr,
            ETHER_TYPE_ARP,
            arp.marshal()?,
        );

        log::debug!("sending ARP request for {}", target_ip);

        self.conn
            .write_to(&frame.marshal(), &Addr::Hardware(ETHERNET_BROADCAST))?;

        Ok(())
    }

    /// Resolves the hardware address of `target_ip`
    ///
    /// Sends a single request, then reads frames until the target replies.
    /// Unrelated frames are dropped. The wait is bounded only by the
    /// transport's read deadline; set one before calling. The request is
    /// never retransmitted, call again to retry.
    ///
    /// # Errors
    ///
    /// - [`RLanProbeError::InvalidClient`] if the client has no source IPv4
    /// - [`RLanProbeError::Timeout`] if the read deadline expires first
    /// - any other transport error
    pub fn resolve_mac(&mut self, target_ip: Ipv4Addr) -> Result<MacAddr> {
        let mut state = ResolveState::Idle;
        log::trace!("resolve {}: {:?}", target_ip, state);

        let result = self.run_resolution(target_ip, &mut state);

        if result.is_err() {
            state = ResolveState::Failed;
        }
        log::trace!("resolve {}: {:?}", target_ip, state);

        result
    }

    fn run_resolution(
        &mut self,
        target_ip: Ipv4Addr,
        state: &mut ResolveState,
    ) -> Result<MacAddr> {
        self.arp_request(target_ip)?;
        *state = ResolveState::RequestSent;
        log::trace!("resolve {}: {:?}", target_ip, state);

        let mut buf = [0u8; FRAME_BUF_LEN];

        loop {
            *state = ResolveState::WaitingReply;

            let (n, _) = self.conn.read_from(&mut buf)?;

            match match_arp_reply(&buf[..n], target_ip) {
                ReplyMatch::Matched(mac) => {
                    *state = ResolveState::Resolved(mac);
                    log::debug!("resolved {} to {}", target_ip, mac);
                    return Ok(mac);
                }
                ReplyMatch::Discard(reason) => {
                    *state = ResolveState::DiscardUnmatched(reason);
                    log::trace!("resolve {}: {:?}", target_ip, state);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "./arp_tests.rs"]
mod tests;
