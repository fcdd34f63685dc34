//! Pirit serial protocol
//!
//! Implements the framed binary command protocol spoken by Pirit fiscal terminals.
//!
//! Outbound frame:
//! - 1 byte: STX
//! - 4 bytes: password (ASCII)
//! - 1 byte: packet id
//! - 2 bytes: command code (ASCII)
//! - N fields: ASCII text, each followed by FS
//! - 1 byte: ETX
//! - 2 bytes: XOR checksum of password..ETX, uppercase hex
//!
//! Inbound frame:
//! - 1 byte: STX
//! - 1 byte: packet id
//! - 2 bytes: command code (ASCII)
//! - 2 bytes: error code (ASCII)
//! - N fields: CP866 text separated by FS
//! - 1 byte: ETX
//! - 2 bytes: checksum, uppercase hex

pub mod checksum;
pub mod commands;
pub mod cp866;
mod error;
pub mod packet;
pub mod probe;
pub mod serial;
mod session;
pub mod status;
pub mod transport;

pub use commands::Command;
pub use error::{DecodeError, ProtocolError, StatusError};
pub use packet::{Packet, PacketCodec};
pub use probe::probe;
pub use serial::{list_ports, LineSettings, PortInfo, SerialTransport};
pub use session::{Session, SessionReport, StatusFlags};
pub use transport::Transport;

/// Start of frame
pub const STX: u8 = 0x02;

/// End of frame
pub const ETX: u8 = 0x03;

/// Liveness check request
pub const ENQ: u8 = 0x05;

/// Acknowledgement ("terminal is online" / "ready for payload")
pub const ACK: u8 = 0x06;

/// Field separator inside the data region
pub const FS: u8 = 0x1C;

/// Prefix byte of a logo payload
pub const LOGO_START: u8 = 0x1B;

/// Default baud rate for the terminal link
pub const DEFAULT_BAUD_RATE: u32 = 57600;

/// Error code meaning "no error"
pub const SUCCESS_CODE: &str = "00";

/// Inbound header: STX + packet id + command code + error code
pub const RESPONSE_HEADER_LEN: usize = 6;

/// Inbound trailer: ETX + 2 checksum characters
pub const RESPONSE_TRAILER_LEN: usize = 3;

/// Smallest well-formed inbound frame
pub const MIN_RESPONSE_LEN: usize = RESPONSE_HEADER_LEN + RESPONSE_TRAILER_LEN;
