//! pod-link — Command link to the flight controller.
//!
//! Encodes setpoints as CRTP packets and pushes them over a raw serial
//! tty, dropping anything that cannot be sent immediately.

pub mod crtp;
pub mod transport;

pub use crtp::{CodecError, CrtpHeader, CrtpPacket, CrtpPayload, CrtpPort, RawPacket};
pub use transport::{CommandLink, LinkState, LinkStats, SerialTransport, Transport, TransportError};
