use super::*;
use crate::packet::IP_PROTOCOL_ICMP;

#[test]
fn builds_twenty_byte_header() {
    let source = Ipv4Addr::new(192, 168, 1, 10);
    let dest = Ipv4Addr::new(192, 168, 1, 1);

    let header = build(source, dest, IP_PROTOCOL_ICMP, 20).unwrap();

    assert_eq!(header.len(), IPV4_HEADER_LEN);
    assert_eq!(header[0], 0x45);
    assert_eq!(header[1], 0);
    assert_eq!(&header[2..4], &40u16.to_be_bytes());
    assert_eq!(&header[6..8], &[0, 0]);
    assert_eq!(header[8], 64);
    assert_eq!(header[9], IP_PROTOCOL_ICMP);
    assert_eq!(&header[12..16], &source.octets());
    assert_eq!(&header[16..20], &dest.octets());
    assert!(checksum::verify(&header));
}

#[test]
fn matches_known_checksum() {
    let header = Ipv4Header::builder()
        .total_len(0x73u16)
        .id(0u16)
        .flags_fragment_offset(0x4000u16)
        .protocol(0x11u8)
        .source(Ipv4Addr::new(192, 168, 0, 1))
        .destination(Ipv4Addr::new(192, 168, 0, 199))
        .build()
        .unwrap();

    let raw = header.to_raw();
    assert_eq!(&raw[10..12], &[0xb8, 0x61]);
}

#[test]
fn requires_addresses_and_protocol() {
    let result = Ipv4Header::builder().total_len(20u16).build();
    assert!(result.is_err());
}

#[test]
fn rejects_oversized_payload() {
    let result = build(
        Ipv4Addr::LOCALHOST,
        Ipv4Addr::LOCALHOST,
        IP_PROTOCOL_ICMP,
        u16::MAX as usize,
    );
    assert!(matches!(result, Err(RLanProbeError::InvalidLength(_))));
}

#[test]
fn splits_header_from_payload() {
    let source = Ipv4Addr::new(10, 0, 0, 5);
    let dest = Ipv4Addr::new(10, 0, 0, 1);
    let mut datagram = build(source, dest, IP_PROTOCOL_ICMP, 4).unwrap();
    datagram.extend_from_slice(&[1, 2, 3, 4]);
    // trailing bytes past total_len are not payload
    datagram.extend_from_slice(&[0, 0]);

    let (header, payload) = split(&datagram).unwrap();

    assert_eq!(header.source, source);
    assert_eq!(header.destination, dest);
    assert_eq!(header.protocol, IP_PROTOCOL_ICMP);
    assert_eq!(header.total_len, 24);
    assert_eq!(payload, &[1, 2, 3, 4]);
}

#[test]
fn honours_header_options() {
    let mut datagram = build(
        Ipv4Addr::LOCALHOST,
        Ipv4Addr::LOCALHOST,
        IP_PROTOCOL_ICMP,
        4 + 2,
    )
    .unwrap();
    datagram[0] = 0x46;
    datagram.extend_from_slice(&[0xaa; 4]);
    datagram.extend_from_slice(&[9, 9]);

    let (header, payload) = split(&datagram).unwrap();
    assert_eq!(header.ihl, 6);
    assert_eq!(payload, &[9, 9]);
}

#[test]
fn encoded_ihl_matches_built_header() {
    let header = Ipv4Header::builder()
        .source(Ipv4Addr::LOCALHOST)
        .destination(Ipv4Addr::LOCALHOST)
        .protocol(IP_PROTOCOL_ICMP)
        .total_len(28u16)
        .build()
        .unwrap();

    assert_eq!(header.ihl, 5);
    assert_eq!(header.to_raw()[0], 0x45);

    let (decoded, _) = split(&header.to_raw()).unwrap();
    assert_eq!(decoded.ihl, header.ihl);
}

#[test]
fn reencodes_decoded_options_header_without_options() {
    let mut datagram = [0u8; 24];
    datagram[0] = 0x46;
    datagram[3] = 24;

    let (header, _) = split(&datagram).unwrap();
    assert_eq!(header.ihl, 6);
    assert_eq!(header.to_raw()[0], 0x45);
}

#[test]
fn split_rejects_bad_input() {
    assert!(matches!(
        split(&[0x45; 19]),
        Err(RLanProbeError::Truncated { expected: 20, .. })
    ));

    let mut v6 = [0u8; 20];
    v6[0] = 0x60;
    assert!(matches!(split(&v6), Err(RLanProbeError::InvalidLength(_))));

    let mut short_ihl = [0u8; 20];
    short_ihl[0] = 0x44;
    assert!(matches!(
        split(&short_ihl),
        Err(RLanProbeError::InvalidLength(_))
    ));

    let mut long_ihl = [0u8; 20];
    long_ihl[0] = 0x4f;
    assert!(matches!(
        split(&long_ihl),
        Err(RLanProbeError::Truncated { expected: 60, .. })
    ));
}
