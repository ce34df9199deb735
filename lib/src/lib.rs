//! Library package for probing hosts on a local Ethernet segment over raw
//! sockets
//!
//! Provides codecs for Ethernet, ARP, ICMP echo and IPv4 headers, a raw
//! socket transport, and a [`client::Client`] that resolves hardware
//! addresses with ARP and measures reachability with ICMP echo.
//!
//! # Examples
//!
//! ## Resolving a MAC address
//!
//! <https://github.com/robgonnella/r-lanprobe/blob/main/lib/examples/resolve-mac.rs>
//!
//! ```bash
//! sudo -E cargo run --example resolve-mac -p r-lanprobe -- 192.168.1.1
//! ```
//!
//! ## Pinging a host
//!
//! <https://github.com/robgonnella/r-lanprobe/blob/main/lib/examples/ping.rs>
//!
//! ```bash
//! sudo -E cargo run --example ping -p r-lanprobe -- 192.168.1.1
//! ```

#![deny(missing_docs)]
pub mod client;
pub mod error;
pub mod network;
pub mod packet;
pub mod targets;
pub mod transport;
