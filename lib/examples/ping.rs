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
        .expect("usage: ping <ipv4>")
        .parse()
        .expect("invalid IPv4 address");

    let interface =
        network::get_default_interface().expect("cannot find interface");
    let mut client =
        Client::open_icmp(interface).expect("failed to open ICMP client");

    for _ in 0..4 {
        client
            .set_deadline(Some(Instant::now() + Duration::from_secs(1)))
            .expect("failed to set deadline");

        let seq = client.icmp_seq();

        match client.ping(target, b"Hello world!") {
            Ok(result) if result.alive => println!(
                "reply from {}: seq={} time={:?}",
                target, seq, result.rtt
            ),
            Ok(_) => println!("request timeout for seq={}", seq),
            Err(e) => println!("error: {}", e),
        }
    }
}
