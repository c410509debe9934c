//! Integration tests for the Art-Net codec.

use artnet_strip_core::artnet::{
    ARTNET_PORT, ArtNetError, ArtPacket, OP_POLL_REPLY, POLL_REPLY_LEN, PollReply, encode_dmx,
    parse_packet,
};
use artnet_strip_core::settings::truncated;
use artnet_strip_core::{Frame, NetworkIdentity};

fn dmx_packet(universe: u16, channels: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0u8; 18 + channels.len()];
    let len = encode_dmx(&Frame::new(universe, channels), 1, &mut buffer).expect("encode");
    buffer.truncate(len);
    buffer
}

// -----------------------------------------------------------------------------
// ArtDmx
// -----------------------------------------------------------------------------

#[test]
fn dmx_packet_yields_a_frame() {
    let packet = dmx_packet(3, &[1, 2, 3, 4, 5, 6]);

    let parsed = parse_packet(&packet).expect("parse");

    assert_eq!(parsed, ArtPacket::Dmx(Frame::new(3, &[1, 2, 3, 4, 5, 6])));
}

#[test]
fn universe_uses_net_and_sub_uni() {
    let mut packet = dmx_packet(0, &[0; 6]);
    packet[14] = 0x21;
    packet[15] = 0x81;

    let Ok(ArtPacket::Dmx(frame)) = parse_packet(&packet) else {
        panic!("expected dmx");
    };

    assert_eq!(frame.universe, 0x0121);
}

#[test]
fn declared_length_is_clamped_to_the_payload() {
    let mut packet = dmx_packet(0, &[9; 12]);
    packet[16..18].copy_from_slice(&512u16.to_be_bytes());

    let Ok(ArtPacket::Dmx(frame)) = parse_packet(&packet) else {
        panic!("expected dmx");
    };

    assert_eq!(frame.channels.len(), 12);
}

#[test]
fn short_length_limits_the_channels() {
    let mut packet = dmx_packet(0, &[9; 12]);
    packet[16..18].copy_from_slice(&6u16.to_be_bytes());

    let Ok(ArtPacket::Dmx(frame)) = parse_packet(&packet) else {
        panic!("expected dmx");
    };

    assert_eq!(frame.channels, &[9u8; 6]);
}

#[test]
fn foreign_and_truncated_packets_are_rejected() {
    assert_eq!(parse_packet(b"Art-Net"), Err(ArtNetError::TooShort));
    assert_eq!(
        parse_packet(b"NotArtNt\x00\x50\x00\x0e"),
        Err(ArtNetError::InvalidId)
    );

    let packet = dmx_packet(0, &[1, 2, 3]);
    assert_eq!(parse_packet(&packet[..12]), Err(ArtNetError::TooShort));
}

#[test]
fn other_opcodes_are_reported() {
    let mut packet = b"Art-Net\0\x00\x20\x00\x0e\x00\x00".to_vec();
    assert_eq!(parse_packet(&packet), Ok(ArtPacket::Poll));

    packet[8..10].copy_from_slice(&0x9700u16.to_le_bytes());
    assert_eq!(parse_packet(&packet), Ok(ArtPacket::Other(0x9700)));
}

#[test]
fn encode_needs_room_for_the_whole_packet() {
    let mut buffer = [0u8; 20];

    assert_eq!(encode_dmx(&Frame::new(0, &[1, 2, 3]), 0, &mut buffer), None);
}

// -----------------------------------------------------------------------------
// ArtPollReply
// -----------------------------------------------------------------------------

#[test]
fn poll_reply_carries_identity_and_address() {
    let identity = NetworkIdentity {
        short_name: truncated("Truss A"),
        ..NetworkIdentity::default()
    };
    let reply = PollReply {
        ip: [192, 168, 1, 201],
        mac: [0x24, 0x0A, 0xC4, 1, 2, 3],
        identity: &identity,
        dhcp: true,
    };
    let mut buffer = [0xAAu8; POLL_REPLY_LEN];

    reply.encode(&mut buffer);

    assert_eq!(&buffer[0..8], b"Art-Net\0");
    assert_eq!(u16::from_le_bytes([buffer[8], buffer[9]]), OP_POLL_REPLY);
    assert_eq!(&buffer[10..14], &[192, 168, 1, 201]);
    assert_eq!(u16::from_le_bytes([buffer[14], buffer[15]]), ARTNET_PORT);
    assert_eq!(&buffer[26..34], b"Truss A\0");
    assert_eq!(&buffer[44..64], b"ESP_ArtNet2NeoPixel\0");
    assert_eq!(&buffer[108..119], b"ESP_ArtNet\0");
    assert_eq!(buffer[173], 1);
    assert_eq!(&buffer[201..207], &[0x24, 0x0A, 0xC4, 1, 2, 3]);
    assert_eq!(buffer[212] & 0x02, 0x02);
    assert_eq!(buffer[238], 0);
}

#[test]
fn poll_reply_names_are_terminated() {
    let identity = NetworkIdentity {
        short_name: truncated("abcdefghijklmnopq"),
        ..NetworkIdentity::default()
    };
    let reply = PollReply {
        ip: [10, 0, 0, 2],
        mac: [0; 6],
        identity: &identity,
        dhcp: false,
    };
    let mut buffer = [0u8; POLL_REPLY_LEN];

    reply.encode(&mut buffer);

    assert_eq!(&buffer[26..43], b"abcdefghijklmnopq");
    assert_eq!(buffer[43], 0);
    assert_eq!(buffer[212] & 0x02, 0);
}
