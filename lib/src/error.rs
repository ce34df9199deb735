//! Custom Error and Result types for this library

use std::io;
use thiserror::Error;

use crate::packet::ipv4::Ipv4HeaderBuilderError;

/// Custom Error type for this library
///
/// Decoding errors ([`RLanProbeError::Truncated`],
/// [`RLanProbeError::InvalidLength`], [`RLanProbeError::InvalidAddress`]) and
/// "not the awaited message" errors ([`RLanProbeError::NotArp`],
/// [`RLanProbeError::UnexpectedReply`]) describe a single packet and can be
/// recovered from by dropping that packet. All other variants are fatal to the
/// operation that produced them.
#[derive(Error, Debug)]
pub enum RLanProbeError {
    /// Input is shorter than its declared or required length
    #[error("truncated {packet} packet: need {expected} bytes, got {actual}")]
    Truncated {
        /// The packet format being decoded
        packet: &'static str,
        /// The number of bytes required
        expected: usize,
        /// The number of bytes available
        actual: usize,
    },

    /// A length field is zero or does not fit the address type it describes
    #[error("invalid length: {0}")]
    InvalidLength(String),

    /// An address slice does not form a valid address
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Frame is well formed but does not carry an ARP payload
    #[error("not an ARP frame: ethertype {0:#06x}")]
    NotArp(u16),

    /// Packet is well formed but is not the reply we are waiting for
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// Failure creating or configuring a raw socket
    #[error("socket error: {0}")]
    Socket(#[source] io::Error),

    /// Failure reading from or writing to a raw socket
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// A read or write deadline expired
    #[error("i/o timeout")]
    Timeout,

    /// The transport has already been closed
    #[error("use of closed connection")]
    Closed,

    /// The client has no usable source IPv4 address
    #[error("invalid client: no source IPv4 address on interface {0}")]
    InvalidClient(String),

    /// Error locating or inspecting a network interface
    #[error("interface error: {0}")]
    Interface(String),

    /// Error generated during IPv4 header construction
    #[error("failed to build IPv4 header: {0}")]
    Ipv4HeaderBuild(#[from] Ipv4HeaderBuilderError),

    /// Invalid entry in an IP target list
    #[error("invalid target {target}: {error}")]
    Target {
        /// The offending target string
        target: String,
        /// The parse or lookup error encountered
        error: String,
    },
}

impl RLanProbeError {
    /// Converter for std::net::AddrParseError
    pub fn from_net_addr_parse_error(
        target: &str,
        error: std::net::AddrParseError,
    ) -> Self {
        Self::Target {
            target: target.to_string(),
            error: error.to_string(),
        }
    }

    /// Converter for ipnet::AddrParseError
    pub fn from_ipnet_addr_parse_error(
        target: &str,
        error: ipnet::AddrParseError,
    ) -> Self {
        Self::Target {
            target: target.to_string(),
            error: error.to_string(),
        }
    }

    /// Returns true for errors that describe a single bad or unrelated packet
    /// rather than a failure of the operation itself
    pub fn is_discardable(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. }
                | Self::InvalidLength(_)
                | Self::InvalidAddress(_)
                | Self::NotArp(_)
                | Self::UnexpectedReply(_)
        )
    }

    /// Returns true if this error was caused by an expired deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// Custom Result type for this library. All Errors exposed by this library
/// will be returned as [`RLanProbeError`]
pub type Result<T> = std::result::Result<T, RLanProbeError>;
