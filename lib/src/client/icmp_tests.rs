use std::{
    net::Ipv4Addr,
    time::{Duration, Instant},
};

use pnet::ipnetwork::{IpNetwork, Ipv4Network};

use super::*;
use crate::{
    network::NetworkInterface,
    packet::{
        icmp::ICMP_TYPE_ECHO_REQUEST,
        ipv4::IPV4_HEADER_LEN,
        MacAddr,
    },
    transport::{memory::MemoryConn, MockPacketConn},
};

fn source_ip() -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 1, 10)
}

fn dest_ip() -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 1, 1)
}

fn interface(with_ip: bool) -> NetworkInterface {
    let ips = if with_ip {
        vec![IpNetwork::V4(Ipv4Network::new(source_ip(), 24).unwrap())]
    } else {
        vec![]
    };

    NetworkInterface {
        name: "test0".to_string(),
        description: String::new(),
        index: 2,
        mac: MacAddr::new(0x00, 0x11, 0x22, 0x33, 0x44, 0x55),
        ips,
        flags: 0,
    }
}

fn datagram(
    from: Ipv4Addr,
    to: Ipv4Addr,
    protocol: u8,
    icmp: &IcmpPacket,
) -> Vec<u8> {
    let body = icmp.marshal();
    let mut out = ipv4::build(from, to, protocol, body.len()).unwrap();
    out.extend_from_slice(&body);
    out
}

// Echoes every request back like a live host
fn echo_responder(buf: &[u8], addr: &Addr) -> Vec<(Vec<u8>, Addr)> {
    let Ok((header, payload)) = ipv4::split(buf) else {
        return vec![];
    };
    let Ok(request) = IcmpPacket::unmarshal(payload) else {
        return vec![];
    };

    let reply = IcmpPacket::build_echo_reply(&request);
    vec![(
        datagram(header.destination, header.source, IP_PROTOCOL_ICMP, &reply),
        *addr,
    )]
}

fn client_with(conn: MemoryConn, with_ip: bool) -> Client {
    let client = Client::new(interface(with_ip), Box::new(conn));
    client
        .set_deadline(Some(Instant::now() + Duration::from_millis(200)))
        .unwrap();
    client
}

#[test]
fn send_icmp_writes_ipv4_wrapped_echo_request() {
    let conn = MemoryConn::new(Addr::Ip(source_ip()));
    let mut client = client_with(conn.clone(), true);
    let id = client.icmp_id();

    client.send_icmp(dest_ip(), b"Hello world!").unwrap();

    let written = conn.written();
    assert_eq!(written.len(), 1);

    let (buf, addr) = &written[0];
    assert_eq!(*addr, Addr::Ip(dest_ip()));
    assert_eq!(buf.len(), IPV4_HEADER_LEN + 8 + 12);

    let (header, payload) = ipv4::split(buf).unwrap();
    assert_eq!(header.source, source_ip());
    assert_eq!(header.destination, dest_ip());
    assert_eq!(header.protocol, IP_PROTOCOL_ICMP);
    assert_eq!(header.total_len as usize, buf.len());

    let icmp = IcmpPacket::unmarshal(payload).unwrap();
    assert_eq!(icmp.icmp_type, ICMP_TYPE_ECHO_REQUEST);
    assert_eq!(icmp.id, id);
    assert_eq!(icmp.seq, 1);
    assert_eq!(icmp.payload, b"Hello world!");
    assert!(icmp.verify_checksum());
}

#[test]
fn send_icmp_advances_sequence() {
    let conn = MemoryConn::new(Addr::Ip(source_ip()));
    let mut client = client_with(conn.clone(), true);

    client.send_icmp(dest_ip(), &[]).unwrap();
    client.send_icmp(dest_ip(), &[]).unwrap();

    assert_eq!(client.icmp_seq(), 3);

    let seqs: Vec<u16> = conn
        .written()
        .iter()
        .map(|(buf, _)| {
            let (_, payload) = ipv4::split(buf).unwrap();
            IcmpPacket::unmarshal(payload).unwrap().seq
        })
        .collect();
    assert_eq!(seqs, vec![1, 2]);
}

#[test]
fn send_icmp_sequence_wraps() {
    let conn = MemoryConn::new(Addr::Ip(source_ip()));
    let mut client = client_with(conn, true);
    client.icmp_seq = u16::MAX;

    client.send_icmp(dest_ip(), &[]).unwrap();

    assert_eq!(client.icmp_seq(), 0);
}

#[test]
fn send_icmp_requires_source_ip() {
    let conn = MemoryConn::new(Addr::Ip(source_ip()));
    let mut client = client_with(conn.clone(), false);

    let err = client.send_icmp(dest_ip(), &[]).unwrap_err();

    assert!(matches!(err, RLanProbeError::InvalidClient(_)));
    assert!(conn.written().is_empty());
    assert!(matches!(
        client.ping(dest_ip(), &[]),
        Err(RLanProbeError::InvalidClient(_))
    ));
}

#[test]
fn receive_icmp_returns_echo_reply() {
    let conn =
        MemoryConn::with_responder(Addr::Ip(source_ip()), echo_responder);
    let mut client = client_with(conn, true);

    client.send_icmp(dest_ip(), b"abc").unwrap();
    let (reply, _) = client.receive_icmp().unwrap();

    assert!(reply.is_echo_reply());
    assert_eq!(reply.id, client.icmp_id());
    assert_eq!(reply.seq, 1);
    assert_eq!(reply.payload, b"abc");
}

#[test]
fn receive_icmp_rejects_other_session() {
    let conn = MemoryConn::new(Addr::Ip(source_ip()));
    let mut client = client_with(conn.clone(), true);

    let foreign_id = client.icmp_id().wrapping_add(1);
    let request = IcmpPacket::build_echo_request(1, foreign_id, &[]);
    let reply = IcmpPacket::build_echo_reply(&request);
    conn.push_inbound(
        datagram(dest_ip(), source_ip(), IP_PROTOCOL_ICMP, &reply),
        Addr::Ip(dest_ip()),
    );

    assert!(matches!(
        client.receive_icmp(),
        Err(RLanProbeError::UnexpectedReply(_))
    ));
}

#[test]
fn receive_icmp_rejects_echo_request() {
    let conn = MemoryConn::new(Addr::Ip(source_ip()));
    let mut client = client_with(conn.clone(), true);

    let request = IcmpPacket::build_echo_request(1, client.icmp_id(), &[]);
    conn.push_inbound(
        datagram(dest_ip(), source_ip(), IP_PROTOCOL_ICMP, &request),
        Addr::Ip(dest_ip()),
    );

    assert!(matches!(
        client.receive_icmp(),
        Err(RLanProbeError::UnexpectedReply(_))
    ));
}

#[test]
fn receive_icmp_rejects_other_protocol() {
    let conn = MemoryConn::new(Addr::Ip(source_ip()));
    let mut client = client_with(conn.clone(), true);

    let request = IcmpPacket::build_echo_request(1, client.icmp_id(), &[]);
    let reply = IcmpPacket::build_echo_reply(&request);
    conn.push_inbound(
        datagram(dest_ip(), source_ip(), 17, &reply),
        Addr::Ip(dest_ip()),
    );

    assert!(matches!(
        client.receive_icmp(),
        Err(RLanProbeError::UnexpectedReply(_))
    ));
}

#[test]
fn receive_icmp_rejects_truncated_datagram() {
    let conn = MemoryConn::new(Addr::Ip(source_ip()));
    let mut client = client_with(conn.clone(), true);

    conn.push_inbound(vec![0x45, 0, 0], Addr::Ip(dest_ip()));

    assert!(matches!(
        client.receive_icmp(),
        Err(RLanProbeError::Truncated { packet: "ipv4", .. })
    ));
}

#[test]
fn ping_reports_alive_host() {
    let conn =
        MemoryConn::with_responder(Addr::Ip(source_ip()), echo_responder);
    let mut client = client_with(conn, true);

    let result = client.ping(dest_ip(), b"Hello world!").unwrap();

    assert!(result.alive);
    assert!(result.rtt < Duration::from_millis(200));
}

#[test]
fn ping_reports_silent_host_as_not_alive() {
    let conn = MemoryConn::new(Addr::Ip(source_ip()));
    let mut client = client_with(conn.clone(), true);

    let result = client.ping(dest_ip(), b"Hello world!").unwrap();

    assert!(!result.alive);
    assert!(result.rtt >= Duration::from_millis(150));
    assert_eq!(conn.written().len(), 1);
}

#[test]
fn ping_propagates_non_timeout_errors() {
    let mut conn = MockPacketConn::new();
    conn.expect_write_to().returning(|buf, _| Ok(buf.len()));
    conn.expect_read_from()
        .returning(|_| Err(RLanProbeError::Closed));

    let mut client = Client::new(interface(true), Box::new(conn));

    assert!(matches!(
        client.ping(dest_ip(), &[]),
        Err(RLanProbeError::Closed)
    ));
}

#[test]
fn ping_rejects_late_reply_from_previous_target() {
    let conn = MemoryConn::new(Addr::Ip(source_ip()));
    let mut client = client_with(conn.clone(), true);
    let first = Ipv4Addr::new(10, 0, 0, 5);
    let silent = Ipv4Addr::new(10, 0, 0, 77);

    let result = client.ping(first, b"abc").unwrap();
    assert!(!result.alive);

    // the first target answers after its deadline
    let request = IcmpPacket::build_echo_request(1, client.icmp_id(), b"abc");
    let reply = IcmpPacket::build_echo_reply(&request);
    conn.push_inbound(
        datagram(first, source_ip(), IP_PROTOCOL_ICMP, &reply),
        Addr::Ip(first),
    );

    client
        .set_deadline(Some(Instant::now() + Duration::from_millis(200)))
        .unwrap();

    assert!(matches!(
        client.ping(silent, b"abc"),
        Err(RLanProbeError::UnexpectedReply(_))
    ));
}

#[test]
fn ping_rejects_reply_to_other_sequence() {
    let conn = MemoryConn::new(Addr::Ip(source_ip()));
    let mut client = client_with(conn.clone(), true);

    let request = IcmpPacket::build_echo_request(99, client.icmp_id(), &[]);
    let reply = IcmpPacket::build_echo_reply(&request);
    conn.push_inbound(
        datagram(dest_ip(), source_ip(), IP_PROTOCOL_ICMP, &reply),
        Addr::Ip(dest_ip()),
    );

    assert!(matches!(
        client.ping(dest_ip(), &[]),
        Err(RLanProbeError::UnexpectedReply(_))
    ));
}
