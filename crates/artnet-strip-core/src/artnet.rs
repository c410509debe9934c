//! Minimal Art-Net codec
//!
//! Decodes `ArtDmx` into [`Frame`]s and encodes the `ArtPollReply` that makes
//! the node discoverable by controllers. Everything else is reported as
//! [`ArtPacket::Other`] and ignored by the node.

use crate::mapper::{Frame, UNIVERSE_CHANNELS};
use crate::settings::NetworkIdentity;

/// UDP port of the protocol
pub const ARTNET_PORT: u16 = 6454;

pub const OP_POLL: u16 = 0x2000;
pub const OP_POLL_REPLY: u16 = 0x2100;
pub const OP_DMX: u16 = 0x5000;

pub const PROTOCOL_VERSION: u16 = 14;
pub const POLL_REPLY_LEN: usize = 239;

const ID: &[u8; 8] = b"Art-Net\0";
const OPCODE_LEN: usize = ID.len() + 2;
const DMX_HEADER_LEN: usize = 18;

const SHORT_NAME_FIELD: usize = 18;
const LONG_NAME_FIELD: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtNetError {
    TooShort,
    InvalidId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtPacket<'a> {
    Dmx(Frame<'a>),
    Poll,
    Other(u16),
}

/// Parses one UDP payload.
///
/// The DMX channels are clamped to the bytes actually received, so a
/// truncated packet yields a shorter frame instead of an error.
pub fn parse_packet(data: &[u8]) -> Result<ArtPacket<'_>, ArtNetError> {
    if data.len() < OPCODE_LEN {
        return Err(ArtNetError::TooShort);
    }
    if &data[..ID.len()] != ID {
        return Err(ArtNetError::InvalidId);
    }

    let opcode = u16::from_le_bytes([data[8], data[9]]);
    match opcode {
        OP_DMX => {
            if data.len() < DMX_HEADER_LEN {
                return Err(ArtNetError::TooShort);
            }
            // 15-bit port address: SubUni in byte 14, Net in the low 7 bits of byte 15
            let universe = u16::from(data[14]) | (u16::from(data[15] & 0x7F) << 8);
            let length = usize::from(u16::from_be_bytes([data[16], data[17]]));
            let payload = &data[DMX_HEADER_LEN..];
            let length = length.min(payload.len()).min(UNIVERSE_CHANNELS);
            Ok(ArtPacket::Dmx(Frame::new(universe, &payload[..length])))
        }
        OP_POLL => Ok(ArtPacket::Poll),
        other => Ok(ArtPacket::Other(other)),
    }
}

/// Encodes an `ArtDmx` packet, returning its length.
pub fn encode_dmx(frame: &Frame<'_>, sequence: u8, buffer: &mut [u8]) -> Option<usize> {
    let length = frame.channels.len().min(UNIVERSE_CHANNELS);
    let total = DMX_HEADER_LEN + length;
    let packet = buffer.get_mut(..total)?;

    packet[0..8].copy_from_slice(ID);
    packet[8..10].copy_from_slice(&OP_DMX.to_le_bytes());
    packet[10..12].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    packet[12] = sequence;
    packet[13] = 0;
    packet[14..16].copy_from_slice(&frame.universe.to_le_bytes());
    #[allow(clippy::cast_possible_truncation)]
    packet[16..18].copy_from_slice(&(length as u16).to_be_bytes());
    packet[18..].copy_from_slice(&frame.channels[..length]);
    Some(total)
}

/// Node description answered to `ArtPoll`.
#[derive(Debug, Clone, Copy)]
pub struct PollReply<'a> {
    pub ip: [u8; 4],
    pub mac: [u8; 6],
    pub identity: &'a NetworkIdentity,
    /// The address was obtained by DHCP
    pub dhcp: bool,
}

impl PollReply<'_> {
    pub fn encode(&self, buffer: &mut [u8; POLL_REPLY_LEN]) {
        buffer.fill(0);
        buffer[0..8].copy_from_slice(ID);
        buffer[8..10].copy_from_slice(&OP_POLL_REPLY.to_le_bytes());
        buffer[10..14].copy_from_slice(&self.ip);
        buffer[14..16].copy_from_slice(&ARTNET_PORT.to_le_bytes());
        buffer[16..18].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());

        put_name(&mut buffer[26..26 + SHORT_NAME_FIELD], &self.identity.short_name);
        put_name(&mut buffer[44..44 + LONG_NAME_FIELD], &self.identity.long_name);
        put_name(&mut buffer[108..108 + LONG_NAME_FIELD], &self.identity.node_report);

        // One DMX output port that is transmitting
        buffer[172..174].copy_from_slice(&1u16.to_be_bytes());
        buffer[174] = 0x80;
        buffer[182] = 0x80;

        buffer[201..207].copy_from_slice(&self.mac);
        buffer[207..211].copy_from_slice(&self.ip);
        buffer[211] = 1;

        // Web configuration, DHCP capable, 15-bit port addresses
        let mut status2 = 0x01 | 0x04 | 0x08;
        if self.dhcp {
            status2 |= 0x02;
        }
        buffer[212] = status2;
    }
}

/// Copies `name` into a NUL-terminated fixed field.
fn put_name(field: &mut [u8], name: &str) {
    let len = name.len().min(field.len() - 1);
    field[..len].copy_from_slice(&name.as_bytes()[..len]);
    field[len..].fill(0);
}
