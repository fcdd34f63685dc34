//! # Pirit Core Library
//!
//! Core functionality for uploading receipt designs to Pirit fiscal terminals.

#![warn(missing_docs)]

//!
//! This library provides:
//! - The framed Pirit command protocol (encoding, decoding, XOR checksum)
//! - Serial transport with the terminal's fixed line settings
//! - The upload session: liveness probe, status and settings queries,
//!   design and logo uploads
//! - A simulated terminal for running sessions without hardware
//!
//! ## Example
//!
//! ```rust,ignore
//! use pirit_core::config::ProtocolConfig;
//! use pirit_core::protocol::{LineSettings, SerialTransport, Session};
//!
//! let transport = SerialTransport::open("/dev/ttyS0", &LineSettings::default())?;
//! let mut session = Session::new(transport, ProtocolConfig::default());
//! let design = std::fs::read("new.DPirit_SD")?;
//! let report = session.run(&design, None)?;
//! println!("Shift open: {}", report.shift_open);
//! ```

pub mod config;
pub mod demo;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConfigError, ProtocolConfig};
    pub use crate::demo::SimulatedTerminal;
    pub use crate::protocol::{
        Command, DecodeError, LineSettings, Packet, PacketCodec, ProtocolError, SerialTransport,
        Session, SessionReport, Transport,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
