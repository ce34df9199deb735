//! Provides helpers for selecting the network interface a client binds to

use pnet::{
    datalink::NetworkInterface as PNetNetworkInterface, ipnetwork::IpNetwork,
};
use std::net::{IpAddr, Ipv4Addr};

use crate::{
    error::{RLanProbeError, Result},
    packet::MacAddr,
};

/// Represents a network interface on the current host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    /// The name of the interface i.e. "eth0"
    pub name: String,
    /// The description of the interface
    pub description: String,
    /// The OS index of the interface
    pub index: u32,
    /// The native hardware address of the interface
    pub mac: MacAddr,
    /// All IP networks assigned to the interface
    pub ips: Vec<IpNetwork>,
    /// Interface flags
    pub flags: u32,
}

impl NetworkInterface {
    /// Returns the first usable IPv4 address bound to the interface
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        self.ips.iter().find_map(|net| match net.ip() {
            IpAddr::V4(ip) if !ip.is_unspecified() => Some(ip),
            _ => None,
        })
    }

    /// Returns the CIDR block of the first IPv4 network on the interface
    pub fn cidr(&self) -> Option<String> {
        let net = self.ips.iter().find(|i| i.is_ipv4())?;
        Some(format!("{}/{}", net.network(), net.prefix()))
    }
}

impl TryFrom<PNetNetworkInterface> for NetworkInterface {
    type Error = RLanProbeError;

    fn try_from(value: PNetNetworkInterface) -> Result<Self> {
        let mac = value.mac.ok_or_else(|| {
            RLanProbeError::Interface(format!(
                "failed to get mac address for interface {}",
                value.name
            ))
        })?;

        Ok(Self {
            name: value.name,
            description: value.description,
            index: value.index,
            mac,
            ips: value.ips,
            flags: value.flags,
        })
    }
}

impl From<&NetworkInterface> for PNetNetworkInterface {
    fn from(value: &NetworkInterface) -> Self {
        Self {
            name: value.name.clone(),
            description: value.description.clone(),
            index: value.index,
            mac: Some(value.mac),
            ips: value.ips.clone(),
            flags: value.flags,
        }
    }
}

/// Finds an interface by name
pub fn get_interface(name: &str) -> Result<NetworkInterface> {
    let iface = pnet::datalink::interfaces()
        .into_iter()
        .find(|i| i.name == name)
        .ok_or_else(|| {
            RLanProbeError::Interface(format!("no interface named {}", name))
        })?;
    NetworkInterface::try_from(iface)
}

/// Finds the first interface that is up, is not loopback, and has an IPv4
/// address
pub fn get_default_interface() -> Result<NetworkInterface> {
    let iface = pnet::datalink::interfaces()
        .into_iter()
        .find(|e| {
            e.is_up() && !e.is_loopback() && e.ips.iter().any(|i| i.is_ipv4())
        })
        .ok_or_else(|| {
            RLanProbeError::Interface(
                "could not detect default network interface".into(),
            )
        })?;
    NetworkInterface::try_from(iface)
}

#[cfg(test)]
#[path = "./network_tests.rs"]
mod tests;
