//! Provides helpers for managing IP target lists

use std::{
    net::{self, IpAddr},
    str::FromStr,
    sync::Arc,
};

use crate::error::{RLanProbeError, Result};

#[derive(Debug)]
/// Represents a list of IPv4 targets
///
/// Ranges and CIDR blocks are kept in string form and expanded lazily while
/// looping, so a /16 does not cost 65536 stored addresses. Hostnames are
/// resolved each time the list is looped.
///
/// # Errors
///
/// Returns an error if an item in the list is not a valid IP, CIDR block,
/// range, or resolvable hostname
///
/// # Examples
///
/// ```
/// # use std::net;
/// # use r_lanprobe::error::Result;
/// # use r_lanprobe::targets::ips::IPTargets;
/// let print_ip = |ip: net::Ipv4Addr| -> Result<()> {
///   println!("ip: {}", ip);
///   Ok(())
/// };
/// let ips = IPTargets::new(
///     vec![
///       "192.168.0.1".to_string(),
///       "172.17.0.1-172.17.0.24".to_string(),
///       "192.168.68.1/24".to_string(),
///     ]
/// ).unwrap();
/// ips.lazy_loop(print_ip).unwrap();
/// ```
pub struct IPTargets(Vec<String>, usize);

fn loop_ips<F: FnMut(net::Ipv4Addr) -> Result<()>>(
    list: &[String],
    mut cb: F,
) -> Result<()> {
    for target in list.iter() {
        let target = target.trim();

        if let Ok(ip) = net::Ipv4Addr::from_str(target) {
            cb(ip)?;
        } else if target.contains("/") {
            // target is cidr block
            let ip_net = ipnet::Ipv4Net::from_str(target).map_err(|e| {
                RLanProbeError::from_ipnet_addr_parse_error(target, e)
            })?;

            for ip in ip_net.hosts() {
                cb(ip)?;
            }
        } else if let Some((begin, end)) = parse_range(target)? {
            let subnet = ipnet::Ipv4Subnets::new(begin, end, 32);

            for ip_net in subnet {
                for ip in ip_net.hosts() {
                    cb(ip)?;
                }
            }
        } else {
            cb(lookup_ipv4(target)?)?;
        }
    }
    Ok(())
}

// A range is recognised by its first half being an address, which leaves
// hyphenated hostnames alone
fn parse_range(target: &str) -> Result<Option<(net::Ipv4Addr, net::Ipv4Addr)>> {
    let Some((first, last)) = target.split_once("-") else {
        return Ok(None);
    };

    let Ok(begin) = net::Ipv4Addr::from_str(first) else {
        return Ok(None);
    };

    let end = net::Ipv4Addr::from_str(last)
        .map_err(|e| RLanProbeError::from_net_addr_parse_error(target, e))?;

    Ok(Some((begin, end)))
}

fn lookup_ipv4(host: &str) -> Result<net::Ipv4Addr> {
    let to_error = |error: String| RLanProbeError::Target {
        target: host.to_string(),
        error,
    };

    let found = dns_lookup::lookup_host(host)
        .map_err(|e| to_error(e.to_string()))?;

    let ip = found
        .into_iter()
        .find_map(|ip| match ip {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| to_error("host has no IPv4 address".to_string()))?;

    log::debug!("resolved {} to {}", host, ip);

    Ok(ip)
}

impl IPTargets {
    /// Returns a new instance of IPTargets using the provided list
    pub fn new(list: Vec<String>) -> Result<Arc<Self>> {
        let mut len = 0;

        loop_ips(&list, |_| {
            len += 1;
            Ok(())
        })?;

        Ok(Arc::new(Self(list, len)))
    }

    /// Returns the true length of the target list. If the underlying
    /// `Vec<String>` is just `["192.168.0.1/24"]`, then a call to "len" will
    /// return 254
    pub fn len(&self) -> usize {
        self.1
    }

    /// Returns true if the list is empty
    pub fn is_empty(&self) -> bool {
        self.1 == 0
    }

    /// loops over all targets including those that are not explicitly in the
    /// list but fall within a range or CIDR block defined in the list
    pub fn lazy_loop<F: FnMut(net::Ipv4Addr) -> Result<()>>(
        &self,
        cb: F,
    ) -> Result<()> {
        loop_ips(&self.0, cb)
    }
}

#[cfg(test)]
#[path = "./ips_tests.rs"]
mod tests;
