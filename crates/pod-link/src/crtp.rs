//! CRTP packet codec.
//!
//! Every packet starts with one header byte addressing a port and channel
//! on the flight controller:
//!
//! ```text
//!   bit  7 6 5 4   3 2   1 0
//!        port      (0)   channel
//! ```
//!
//! `0xFF` is reserved as the NULL packet and never addresses a port.
//! Numeric payload fields are little-endian.

use serde::Serialize;
use thiserror::Error;

/// Reserved header byte for the NULL / invalid packet.
pub const NULL_HEADER: u8 = 0xFF;

/// `type` byte selecting the hover setpoint in the generic commander.
pub const HOVER_TYPE: u8 = 5;

/// Commander payload: roll, pitch, yaw (f32) + thrust (u16).
pub const COMMANDER_PAYLOAD_LEN: usize = 3 * 4 + 2;
/// Hover payload: type byte + vx, vy, vyaw, height (f32).
pub const HOVER_PAYLOAD_LEN: usize = 1 + 4 * 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("empty packet")]
    Empty,
    #[error("payload length {actual} does not match {expected} for {kind}")]
    PayloadLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("unknown generic commander type {0}")]
    UnknownType(u8),
    #[error("port {0:?} carries no decodable commander payload")]
    UnsupportedPort(CrtpPort),
}

/// Logical port on the flight controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CrtpPort {
    Console,
    Parameters,
    Commander,
    Memory,
    Logging,
    CommanderGeneric,
    CommanderHighLevel,
    DebugDriver,
    LinkControl,
    /// NULL header, or a port nibble with no assigned meaning.
    Unknown,
}

impl CrtpPort {
    /// Wire code, or `None` for [`CrtpPort::Unknown`].
    pub fn code(self) -> Option<u8> {
        match self {
            Self::Console => Some(0),
            Self::Parameters => Some(2),
            Self::Commander => Some(3),
            Self::Memory => Some(4),
            Self::Logging => Some(5),
            Self::CommanderGeneric => Some(7),
            Self::CommanderHighLevel => Some(8),
            Self::DebugDriver => Some(14),
            Self::LinkControl => Some(15),
            Self::Unknown => None,
        }
    }

    /// Port for a 4-bit code. Unassigned codes map to `Unknown`.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Console,
            2 => Self::Parameters,
            3 => Self::Commander,
            4 => Self::Memory,
            5 => Self::Logging,
            7 => Self::CommanderGeneric,
            8 => Self::CommanderHighLevel,
            14 => Self::DebugDriver,
            15 => Self::LinkControl,
            _ => Self::Unknown,
        }
    }
}

/// Decoded header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrtpHeader {
    /// 2-bit channel.
    pub channel: u8,
    pub port: CrtpPort,
}

impl CrtpHeader {
    pub fn new(port: CrtpPort, channel: u8) -> Self {
        Self {
            channel: channel & 0x03,
            port,
        }
    }

    /// Pack into one byte. An `Unknown` port packs as the NULL header.
    pub fn to_byte(self) -> u8 {
        match self.port.code() {
            Some(code) => ((code & 0x0F) << 4) | (self.channel & 0x03),
            None => NULL_HEADER,
        }
    }

    /// Decode any byte. Never fails: the NULL header and unassigned port
    /// nibbles yield `CrtpPort::Unknown`.
    pub fn decode(byte: u8) -> Self {
        let port = if byte == NULL_HEADER {
            CrtpPort::Unknown
        } else {
            CrtpPort::from_code(byte >> 4)
        };
        Self {
            channel: byte & 0x03,
            port,
        }
    }

    pub fn is_null(self) -> bool {
        self.port == CrtpPort::Unknown
    }
}

/// Legacy attitude setpoint (port 3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CommanderSetpoint {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub thrust: u16,
}

/// Body-frame velocity + absolute height setpoint (port 7, type 5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HoverSetpoint {
    pub vx: f32,
    pub vy: f32,
    pub vyaw: f32,
    pub target_height: f32,
}

/// Closed set of payloads this link sends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum CrtpPayload {
    Commander(CommanderSetpoint),
    CommanderHover(HoverSetpoint),
}

impl CrtpPayload {
    /// Header every payload of this kind is addressed with.
    pub fn header(&self) -> CrtpHeader {
        match self {
            Self::Commander(_) => CrtpHeader::new(CrtpPort::Commander, 0),
            Self::CommanderHover(_) => CrtpHeader::new(CrtpPort::CommanderGeneric, 0),
        }
    }

    /// Fixed payload length in bytes, excluding the header.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Commander(_) => COMMANDER_PAYLOAD_LEN,
            Self::CommanderHover(_) => HOVER_PAYLOAD_LEN,
        }
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Commander(c) => {
                buf.extend_from_slice(&c.roll.to_le_bytes());
                buf.extend_from_slice(&c.pitch.to_le_bytes());
                buf.extend_from_slice(&c.yaw.to_le_bytes());
                buf.extend_from_slice(&c.thrust.to_le_bytes());
            }
            Self::CommanderHover(h) => {
                buf.push(HOVER_TYPE);
                buf.extend_from_slice(&h.vx.to_le_bytes());
                buf.extend_from_slice(&h.vy.to_le_bytes());
                buf.extend_from_slice(&h.vyaw.to_le_bytes());
                buf.extend_from_slice(&h.target_height.to_le_bytes());
            }
        }
    }

    /// Interpret `payload` according to the port in `header`.
    pub fn decode(header: CrtpHeader, payload: &[u8]) -> Result<Self, CodecError> {
        match header.port {
            CrtpPort::Commander => {
                expect_len("commander", COMMANDER_PAYLOAD_LEN, payload)?;
                Ok(Self::Commander(CommanderSetpoint {
                    roll: f32_at(payload, 0),
                    pitch: f32_at(payload, 4),
                    yaw: f32_at(payload, 8),
                    thrust: u16::from_le_bytes([payload[12], payload[13]]),
                }))
            }
            CrtpPort::CommanderGeneric => {
                let kind = *payload.first().ok_or(CodecError::PayloadLength {
                    kind: "generic commander",
                    expected: HOVER_PAYLOAD_LEN,
                    actual: 0,
                })?;
                if kind != HOVER_TYPE {
                    return Err(CodecError::UnknownType(kind));
                }
                expect_len("hover", HOVER_PAYLOAD_LEN, payload)?;
                Ok(Self::CommanderHover(HoverSetpoint {
                    vx: f32_at(payload, 1),
                    vy: f32_at(payload, 5),
                    vyaw: f32_at(payload, 9),
                    target_height: f32_at(payload, 13),
                }))
            }
            other => Err(CodecError::UnsupportedPort(other)),
        }
    }
}

fn expect_len(kind: &'static str, expected: usize, payload: &[u8]) -> Result<(), CodecError> {
    if payload.len() == expected {
        Ok(())
    } else {
        Err(CodecError::PayloadLength {
            kind,
            expected,
            actual: payload.len(),
        })
    }
}

/// Caller has checked the length.
fn f32_at(buf: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// A packet ready for the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrtpPacket {
    payload: CrtpPayload,
}

impl CrtpPacket {
    pub fn new(payload: CrtpPayload) -> Self {
        Self { payload }
    }

    pub fn hover(vx: f32, vy: f32, vyaw: f32, target_height: f32) -> Self {
        Self::new(CrtpPayload::CommanderHover(HoverSetpoint {
            vx,
            vy,
            vyaw,
            target_height,
        }))
    }

    pub fn commander(roll: f32, pitch: f32, yaw: f32, thrust: u16) -> Self {
        Self::new(CrtpPayload::Commander(CommanderSetpoint {
            roll,
            pitch,
            yaw,
            thrust,
        }))
    }

    pub fn header(&self) -> CrtpHeader {
        self.payload.header()
    }

    pub fn payload(&self) -> &CrtpPayload {
        &self.payload
    }

    /// Serialize: header byte followed by the fixed-length payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + self.payload.encoded_len());
        buf.push(self.header().to_byte());
        self.payload.write_to(&mut buf);
        buf
    }
}

/// Any received frame split into header and undecoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawPacket {
    pub header: CrtpHeader,
    pub payload: Vec<u8>,
}

impl RawPacket {
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        let (&first, rest) = bytes.split_first().ok_or(CodecError::Empty)?;
        Ok(Self {
            header: CrtpHeader::decode(first),
            payload: rest.to_vec(),
        })
    }

    /// Decode the payload as one of the commander setpoints.
    pub fn decode_payload(&self) -> Result<CrtpPayload, CodecError> {
        CrtpPayload::decode(self.header, &self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hover_exact_bytes() {
        let bytes = CrtpPacket::hover(1.0, 0.0, -2.5, 0.5).encode();
        let mut expected = vec![0x70, 0x05];
        expected.extend_from_slice(&1.0f32.to_le_bytes());
        expected.extend_from_slice(&0.0f32.to_le_bytes());
        expected.extend_from_slice(&(-2.5f32).to_le_bytes());
        expected.extend_from_slice(&0.5f32.to_le_bytes());
        assert_eq!(bytes, expected);
        assert_eq!(bytes.len(), 18);
        // 1.0f32 LE
        assert_eq!(&bytes[2..6], &[0x00, 0x00, 0x80, 0x3F]);
        // -2.5f32 LE
        assert_eq!(&bytes[10..14], &[0x00, 0x00, 0x20, 0xC0]);
    }

    #[test]
    fn test_commander_exact_bytes() {
        let bytes = CrtpPacket::commander(0.0, 1.0, 0.0, 0xABCD).encode();
        assert_eq!(bytes.len(), 15);
        assert_eq!(bytes[0], 0x30);
        assert_eq!(&bytes[5..9], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[13..15], &[0xCD, 0xAB]);
    }

    #[test]
    fn test_header_round_trip() {
        for packet in [
            CrtpPacket::hover(0.1, 0.2, 0.3, 0.4),
            CrtpPacket::commander(1.0, 2.0, 3.0, 4),
        ] {
            let bytes = packet.encode();
            assert_eq!(CrtpHeader::decode(bytes[0]), packet.header());
        }
    }

    #[test]
    fn test_decode_null_header() {
        let h = CrtpHeader::decode(0xFF);
        assert_eq!(h.port, CrtpPort::Unknown);
        assert_eq!(h.channel, 3);
        assert!(h.is_null());
    }

    #[test]
    fn test_decode_unassigned_port() {
        // port nibble 6 is unassigned
        let h = CrtpHeader::decode(0x62);
        assert_eq!(h.port, CrtpPort::Unknown);
        assert_eq!(h.channel, 2);
    }

    #[test]
    fn test_decode_all_bytes_is_total() {
        for b in 0..=u8::MAX {
            let h = CrtpHeader::decode(b);
            assert_eq!(h.channel, b & 0x03);
        }
    }

    #[test]
    fn test_link_control_header() {
        let h = CrtpHeader::decode(0xF3);
        assert_eq!(h.port, CrtpPort::LinkControl);
        assert_eq!(h.channel, 3);
        assert_eq!(h.to_byte(), 0xF3);
    }

    #[test]
    fn test_unknown_port_encodes_as_null() {
        assert_eq!(CrtpHeader::new(CrtpPort::Unknown, 1).to_byte(), NULL_HEADER);
    }

    #[test]
    fn test_raw_packet_decodes_hover() {
        let bytes = CrtpPacket::hover(0.15, 0.0, 10.0, 0.5).encode();
        let raw = RawPacket::parse(&bytes).unwrap();
        assert_eq!(raw.header.port, CrtpPort::CommanderGeneric);
        assert_eq!(raw.payload.len(), HOVER_PAYLOAD_LEN);
        assert_eq!(
            raw.decode_payload().unwrap(),
            CrtpPayload::CommanderHover(HoverSetpoint {
                vx: 0.15,
                vy: 0.0,
                vyaw: 10.0,
                target_height: 0.5,
            })
        );
    }

    #[test]
    fn test_raw_packet_empty() {
        assert_eq!(RawPacket::parse(&[]), Err(CodecError::Empty));
    }

    #[test]
    fn test_decode_payload_errors() {
        let raw = RawPacket::parse(&[0x30, 0x00]).unwrap();
        assert!(matches!(
            raw.decode_payload(),
            Err(CodecError::PayloadLength { expected: 14, actual: 1, .. })
        ));

        let raw = RawPacket::parse(&[0x70, 0x02]).unwrap();
        assert_eq!(raw.decode_payload(), Err(CodecError::UnknownType(2)));

        let raw = RawPacket::parse(&[0x00, b'h', b'i']).unwrap();
        assert_eq!(
            raw.decode_payload(),
            Err(CodecError::UnsupportedPort(CrtpPort::Console))
        );
    }
}
