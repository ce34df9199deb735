//! Provides codecs for building and parsing the packets this library puts on
//! the wire
//!
//! All multi-byte fields are encoded in network (big-endian) byte order.

pub mod arp;
pub mod checksum;
pub mod dispatch;
pub mod ethernet;
pub mod icmp;
pub mod ipv4;

pub use pnet::util::MacAddr;

/// EtherType for ARP frames
pub const ETHER_TYPE_ARP: u16 = 0x0806;
/// EtherType for IPv4 frames
pub const ETHER_TYPE_IPV4: u16 = 0x0800;
/// EtherType for IPv6 frames
pub const ETHER_TYPE_IPV6: u16 = 0x86DD;

/// IP protocol number for ICMP
pub const IP_PROTOCOL_ICMP: u8 = 1;

/// Width in bytes of an Ethernet hardware address
pub const HARDWARE_ADDR_LEN: usize = 6;
/// Width in bytes of an IPv4 protocol address
pub const IPV4_ADDR_LEN: usize = 4;
