//! CLI for resolving MAC addresses and pinging hosts on a LAN over raw
//! sockets
//!
//! # Examples
//!
//! ```bash
//! # help menu
//! sudo r-lanprobe --help
//!
//! # resolve the MAC address of every host in a block
//! sudo r-lanprobe resolve --targets 192.168.1.0/24 --vendor
//!
//! # ping a couple of hosts with a short timeout
//! sudo r-lanprobe --timeout 500ms ping --targets 192.168.1.1,router.lan
//! ```
use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use itertools::Itertools;
use log::*;
use r_lanprobe::{
    client::Client,
    error::{RLanProbeError, Result as LibResult},
    network::{self, NetworkInterface},
    packet::MacAddr,
    targets::ips::IPTargets,
};
use serde::Serialize;
use std::{
    net::Ipv4Addr,
    time::{Duration, Instant},
};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
/// Operation to run against each target
enum Command {
    /// Resolve the MAC address of each target with ARP
    Resolve {
        /// Comma separated list of IPs, IP ranges, CIDR blocks, and hostnames
        #[arg(short, long, use_value_delimiter = true)]
        targets: Vec<String>,
    },
    /// Send one ICMP echo request to each target
    Ping {
        /// Comma separated list of IPs, IP ranges, CIDR blocks, and hostnames
        #[arg(short, long, use_value_delimiter = true)]
        targets: Vec<String>,

        /// Payload carried by each echo request
        #[arg(long, default_value = "Hello world!")]
        payload: String,
    },
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
/// CLI for resolving MAC addresses and pinging hosts on a LAN
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output final report in json instead of table text
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Only print final output nothing else
    #[arg(short, long, default_value_t = false, global = true)]
    quiet: bool,

    /// Perform vendor lookups on resolved MAC addresses
    #[arg(long, default_value_t = false, global = true)]
    vendor: bool,

    /// How long to wait for each target to answer, i.e. "500ms" or "2s"
    #[arg(
        long,
        default_value = "2s",
        value_parser = humantime::parse_duration,
        global = true
    )]
    timeout: Duration,

    /// Choose a specific network interface
    #[arg(short, long, global = true)]
    interface: Option<String>,

    /// Prints debug logs including those from r-lanprobe
    #[arg(long, default_value_t = false, global = true)]
    debug: bool,
}

impl Args {
    fn targets(&self) -> &Vec<String> {
        match &self.command {
            Command::Resolve { targets } => targets,
            Command::Ping { targets, .. } => targets,
        }
    }

    fn targets_mut(&mut self) -> &mut Vec<String> {
        match &mut self.command {
            Command::Resolve { targets } => targets,
            Command::Ping { targets, .. } => targets,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
/// Outcome of resolving one target
struct ResolveEntry {
    ip: Ipv4Addr,
    mac: Option<String>,
    vendor: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
/// Outcome of pinging one target
struct PingEntry {
    ip: Ipv4Addr,
    seq: u16,
    alive: bool,
    rtt_ms: f64,
}

#[doc(hidden)]
fn initialize_logger(args: &Args) -> Result<()> {
    let filter = if args.quiet {
        simplelog::LevelFilter::Error
    } else if args.debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    simplelog::TermLogger::init(
        filter,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

#[doc(hidden)]
fn print_args(args: &Args, interface: &NetworkInterface) {
    let command = match &args.command {
        Command::Resolve { .. } => "resolve",
        Command::Ping { .. } => "ping",
    };

    info!("configuration:");
    info!("command:         {}", command);
    info!("targets:         {}", args.targets().iter().join(", "));
    if let Command::Ping { payload, .. } = &args.command {
        info!("payload:         {:?}", payload);
    }
    info!("json:            {}", args.json);
    info!("vendor:          {}", args.vendor);
    info!("quiet:           {}", args.quiet);
    info!("timeout:         {}", humantime::format_duration(args.timeout));
    info!(
        "interface:       {}",
        args.interface.as_deref().unwrap_or(&interface.name)
    );
    info!("cidr:            {}", interface.cidr().unwrap_or_default());
    info!(
        "user_ip:         {}",
        interface
            .ipv4()
            .map(|ip| ip.to_string())
            .unwrap_or_default()
    );
    info!("mac:             {}", interface.mac);
}

#[doc(hidden)]
fn lookup_vendor(mac: &MacAddr) -> String {
    oui_data::lookup(&mac.to_string())
        .map(|v| v.organization().to_owned())
        .unwrap_or_default()
}

#[doc(hidden)]
fn process_resolve(
    client: &mut Client,
    targets: &IPTargets,
    timeout: Duration,
    include_vendor: bool,
) -> LibResult<Vec<ResolveEntry>> {
    let mut results: Vec<ResolveEntry> = Vec::new();

    info!("resolving {} target(s)...", targets.len());

    targets.lazy_loop(|ip| {
        client.set_deadline(Some(Instant::now() + timeout))?;

        let mac = match client.resolve_mac(ip) {
            Ok(mac) => Some(mac),
            Err(RLanProbeError::Timeout) => {
                debug!("no ARP reply from {}", ip);
                None
            }
            Err(e) => return Err(e),
        };

        let vendor = match (&mac, include_vendor) {
            (Some(mac), true) => lookup_vendor(mac),
            _ => String::new(),
        };

        results.push(ResolveEntry {
            ip,
            mac: mac.map(|m| m.to_string()),
            vendor,
        });

        Ok(())
    })?;

    Ok(results)
}

#[doc(hidden)]
fn print_resolve(args: &Args, entries: &Vec<ResolveEntry>) -> Result<()> {
    info!("resolve results:");

    if args.json {
        let j: String = serde_json::to_string(&entries)?;
        println!("{}", j);
    } else {
        let mut table = prettytable::Table::new();

        table.add_row(prettytable::row!["IP", "MAC", "VENDOR"]);

        for e in entries.iter() {
            let mac = e.mac.as_deref().unwrap_or("unresolved");
            table.add_row(prettytable::row![e.ip, mac, e.vendor]);
        }

        table.printstd();
    }

    Ok(())
}

#[doc(hidden)]
fn process_ping(
    client: &mut Client,
    targets: &IPTargets,
    timeout: Duration,
    payload: &[u8],
) -> LibResult<Vec<PingEntry>> {
    let mut results: Vec<PingEntry> = Vec::new();

    info!("pinging {} target(s)...", targets.len());

    targets.lazy_loop(|ip| {
        client.set_deadline(Some(Instant::now() + timeout))?;

        let seq = client.icmp_seq();

        let (alive, rtt) = match client.ping(ip, payload) {
            Ok(result) => (result.alive, result.rtt),
            // raw ICMP sockets see every ICMP datagram on the host
            Err(e) if e.is_discardable() => {
                warn!("unexpected answer while pinging {}: {}", ip, e);
                (false, Duration::ZERO)
            }
            Err(e) => return Err(e),
        };

        results.push(PingEntry {
            ip,
            seq,
            alive,
            rtt_ms: if alive { rtt.as_secs_f64() * 1000.0 } else { 0.0 },
        });

        Ok(())
    })?;

    Ok(results)
}

#[doc(hidden)]
fn print_ping(args: &Args, entries: &Vec<PingEntry>) -> Result<()> {
    info!("ping results:");

    if args.json {
        let j: String = serde_json::to_string(entries)?;
        println!("{}", j);
    } else {
        let mut table: prettytable::Table = prettytable::Table::new();

        table.add_row(prettytable::row!["IP", "SEQ", "ALIVE", "RTT"]);

        for e in entries {
            let rtt = if e.alive {
                format!("{:.3}ms", e.rtt_ms)
            } else {
                "-".to_string()
            };
            table.add_row(prettytable::row![e.ip, e.seq, e.alive, rtt]);
        }

        table.printstd();
    }

    Ok(())
}

#[doc(hidden)]
fn close_client<T>(client: &Client, results: LibResult<T>) -> LibResult<T> {
    match (results, client.close()) {
        (Ok(results), closed) => closed.map(|_| results),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            warn!("failed to close client: {}", close_err);
            Err(e)
        }
    }
}

#[doc(hidden)]
fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[doc(hidden)]
fn main() -> Result<()> {
    color_eyre::install()?;

    let mut args = Args::parse();

    initialize_logger(&args)?;

    if !is_root() {
        return Err(eyre!("permission denied: must run with root privileges"));
    }

    let interface = match &args.interface {
        Some(name) => network::get_interface(name)
            .map_err(|e| eyre!("Could not find network interface: {}", e))?,
        None => network::get_default_interface().map_err(|e| {
            eyre!("Could not detect default network interface: {}", e)
        })?,
    };

    args.interface = Some(interface.name.clone());

    if args.targets().is_empty() {
        let cidr = interface.cidr().ok_or_else(|| {
            eyre!("No targets given and {} has no IPv4 network", interface.name)
        })?;
        *args.targets_mut() = vec![cidr];
    }

    print_args(&args, &interface);

    let targets = IPTargets::new(args.targets().clone())
        .map_err(|e| eyre!("Invalid IP targets: {}", e))?;

    match &args.command {
        Command::Resolve { .. } => {
            let mut client = Client::open_arp(interface)?;
            let results = process_resolve(
                &mut client,
                &targets,
                args.timeout,
                args.vendor,
            );
            let results = close_client(&client, results)?;
            print_resolve(&args, &results)?;
        }
        Command::Ping { payload, .. } => {
            let mut client = Client::open_icmp(interface)?;
            let results = process_ping(
                &mut client,
                &targets,
                args.timeout,
                payload.as_bytes(),
            );
            let results = close_client(&client, results)?;
            print_ping(&args, &results)?;
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "./main_tests.rs"]
mod tests;
