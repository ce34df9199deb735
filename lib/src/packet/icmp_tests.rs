use super::*;

#[test]
fn builds_echo_request_with_valid_checksum() {
    let packet = IcmpPacket::build_echo_request(1, 0x1234, b"Hello world!");

    assert_eq!(packet.icmp_type, ICMP_TYPE_ECHO_REQUEST);
    assert_eq!(packet.code, 0);
    assert_eq!(packet.id, 0x1234);
    assert_eq!(packet.seq, 1);
    assert_ne!(packet.checksum, 0);
    assert!(packet.verify_checksum());
}

#[test]
fn checksum_covers_payload() {
    let a = IcmpPacket::build_echo_request(1, 1, b"abcd");
    let b = IcmpPacket::build_echo_request(1, 1, b"abce");
    assert_ne!(a.checksum, b.checksum);
}

#[test]
fn known_echo_request_checksum() {
    // type 8, code 0, id 1, seq 1, no payload:
    // 0x0800 + 0x0001 + 0x0001 = 0x0802 -> !0x0802 = 0xf7fd
    let packet = IcmpPacket::build_echo_request(1, 1, &[]);
    assert_eq!(packet.checksum, 0xf7fd);
    assert_eq!(
        packet.marshal(),
        vec![0x08, 0x00, 0xf7, 0xfd, 0x00, 0x01, 0x00, 0x01]
    );
}

#[test]
fn round_trips_with_payload() {
    let packet = IcmpPacket::build_echo_request(42, 7, b"payload bytes");
    let decoded = IcmpPacket::unmarshal(&packet.marshal()).unwrap();
    assert_eq!(decoded, packet);
    assert_eq!(decoded.payload, b"payload bytes".to_vec());
}

#[test]
fn round_trips_without_payload() {
    let packet = IcmpPacket::build_echo_request(3, 9, &[]);
    assert_eq!(IcmpPacket::unmarshal(&packet.marshal()).unwrap(), packet);
}

#[test]
fn builds_matching_echo_reply() {
    let request = IcmpPacket::build_echo_request(5, 77, b"ping");
    let reply = IcmpPacket::build_echo_reply(&request);

    assert!(reply.is_echo_reply());
    assert_eq!(reply.id, request.id);
    assert_eq!(reply.seq, request.seq);
    assert_eq!(reply.payload, request.payload);
    assert!(reply.verify_checksum());
}

#[test]
fn detects_corrupted_checksum() {
    let mut packet = IcmpPacket::build_echo_request(1, 1, b"data");
    packet.payload[0] ^= 0xff;
    assert!(!packet.verify_checksum());
}

#[test]
fn returns_truncated_for_short_input() {
    for len in 0..ICMP_HEADER_LEN {
        assert!(matches!(
            IcmpPacket::unmarshal(&vec![0u8; len]),
            Err(RLanProbeError::Truncated { expected: 8, .. })
        ));
    }
}
