use std::{
    env,
    net::Ipv4Addr,
    time::{Duration, Instant},
};

use r_lanprobe::{client::Client, network};

fn is_root() -> bool {
    match env::var("USER") {
        Ok(val) => val == "root",
        Err(_e) => false,
    }
}

fn main() {
    if !is_root() {
        panic!("permission denied: must run with root privileges");
    }

    let target: Ipv4Addr = env::args()
        .nth(1)
        .expect("usage: resolve-mac <ipv4>")
        .parse()
        .expect("invalid IPv4 address");

    let interface =
        network::get_default_interface().expect("cannot find interface");
    let mut client =
        Client::open_arp(interface).expect("failed to open ARP client");

    client
        .set_deadline(Some(Instant::now() + Duration::from_secs(2)))
        .expect("failed to set deadline");

    match client.resolve_mac(target) {
        Ok(mac) => println!("{} is at {}", target, mac),
        Err(e) => println!("failed to resolve {}: {}", target, e),
    }

    client.close().expect("failed to close client");
}
