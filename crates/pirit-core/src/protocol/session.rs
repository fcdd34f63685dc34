//! Upload session
//!
//! Drives the fixed exchange with the terminal:
//! liveness probe → status flags → settings read → design upload (→ logo upload).
//!
//! The first failure ends the session. Responses are matched to requests purely by
//! order; there is never more than one request in flight.

use tracing::{debug, info, warn};

use super::commands::{ORGANIZATION_NAME_ROW, ORGANIZATION_TABLE};
use super::packet::describe;
use super::status::{bit_at, SHIFT_OPEN_BIT};
use super::{
    probe, Command, Packet, PacketCodec, ProtocolError, Transport, ACK, ETX, LOGO_START,
    MIN_RESPONSE_LEN,
};
use crate::config::ProtocolConfig;

/// Decoded status flags response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFlags {
    /// Raw status fields as reported
    pub parameters: Vec<String>,
    /// Whether a shift is currently open
    pub shift_open: bool,
}

/// Summary of a completed session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// Shift state reported before the upload
    pub shift_open: bool,
    /// First organization name line, untrimmed
    pub organization_name: String,
    /// Whether the name is padded with leading spaces for centering
    pub name_is_centered: bool,
    /// Bytes of design payload sent
    pub design_len: usize,
    /// Bytes of logo payload sent, including the start byte
    pub logo_len: Option<usize>,
}

/// Exclusive conversation with one terminal.
///
/// The session owns the transport; dropping the session closes it, whichever
/// way the session ended.
pub struct Session<T: Transport> {
    transport: T,
    codec: PacketCodec,
    config: ProtocolConfig,
}

impl<T: Transport> Session<T> {
    /// Create a session over an opened transport
    pub fn new(transport: T, config: ProtocolConfig) -> Self {
        Self {
            transport,
            codec: PacketCodec::new(&config),
            config,
        }
    }

    /// Borrow the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// End the session and hand back the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run the whole upload sequence
    pub fn run(
        &mut self,
        design: &[u8],
        logo: Option<&[u8]>,
    ) -> Result<SessionReport, ProtocolError> {
        self.check_connection()?;
        let status = self.query_status()?;
        let (organization_name, name_is_centered) = self.read_organization_name()?;

        self.upload_design(design)?;
        let logo_len = match logo {
            Some(bitmap) => Some(self.upload_logo(bitmap)?),
            None => None,
        };

        Ok(SessionReport {
            shift_open: status.shift_open,
            organization_name,
            name_is_centered,
            design_len: design.len(),
            logo_len,
        })
    }

    /// Liveness probe; fails with [`ProtocolError::NoConnection`]
    pub fn check_connection(&mut self) -> Result<(), ProtocolError> {
        if probe(&mut self.transport, self.config.probe_wait())? {
            Ok(())
        } else {
            Err(ProtocolError::NoConnection)
        }
    }

    /// Query status flags and extract the shift state
    pub fn query_status(&mut self) -> Result<StatusFlags, ProtocolError> {
        let command = Command::StatusFlags;
        let packet = self.exchange(command, &[])?;

        let flags = packet
            .parameter(1)
            .ok_or_else(|| missing_parameter(command, 1))?;
        let shift_open = bit_at(flags, SHIFT_OPEN_BIT)?;
        info!("Shift open: {}", shift_open);

        Ok(StatusFlags {
            parameters: packet.parameters().to_vec(),
            shift_open,
        })
    }

    /// Read one row of a settings table
    pub fn read_settings(&mut self, table: &str, row: &str) -> Result<Packet, ProtocolError> {
        self.exchange(Command::ReadSettings, &[table, row])
    }

    /// Read the first organization name line and check it for centering spaces
    pub fn read_organization_name(&mut self) -> Result<(String, bool), ProtocolError> {
        let packet = self.read_settings(ORGANIZATION_TABLE, ORGANIZATION_NAME_ROW)?;
        let name = packet
            .parameter(0)
            .ok_or_else(|| missing_parameter(Command::ReadSettings, 0))?
            .to_string();

        let centered = name.trim_start().len() < name.len();
        if centered {
            info!("Organization name contains centering spaces");
        } else {
            warn!("Organization name has no centering spaces, manual re-registration is required");
        }
        Ok((name, centered))
    }

    /// Upload a receipt design
    pub fn upload_design(&mut self, design: &[u8]) -> Result<(), ProtocolError> {
        self.upload(Command::LoadDesign, design)?;
        info!("Receipt design loaded");
        Ok(())
    }

    /// Upload a logo bitmap; returns the payload length sent
    pub fn upload_logo(&mut self, bitmap: &[u8]) -> Result<usize, ProtocolError> {
        let payload = logo_payload(bitmap);
        self.upload(Command::LoadLogo, &payload)?;
        info!("Logo loaded");
        Ok(payload.len())
    }

    /// Two-phase payload transfer: framed size announcement, one readiness byte,
    /// the raw payload, then a framed confirmation
    fn upload(&mut self, command: Command, payload: &[u8]) -> Result<(), ProtocolError> {
        let size = payload.len().to_string();
        let announcement = self.codec.encode(command, &[size.as_str()]);
        self.send(command, &announcement)?;

        match self.transport.read_byte(self.config.ack_timeout())? {
            Some(ACK) => debug!("Terminal ready for {} byte payload", payload.len()),
            received => {
                warn!("Expected ACK after {} announcement, got {:02X?}", command, received);
                return Err(ProtocolError::UploadRejected { received });
            }
        }

        info!("Sending {} payload ({} bytes)", command, payload.len());
        self.transport.write_all(payload)?;

        let packet = self.receive(command)?;
        if !packet.is_success() {
            return Err(ProtocolError::UploadFailed {
                code: packet.error_code,
            });
        }
        Ok(())
    }

    /// Send a request and require a successful response
    fn exchange(&mut self, command: Command, params: &[&str]) -> Result<Packet, ProtocolError> {
        let frame = self.codec.encode(command, params);
        self.send(command, &frame)?;

        let packet = self.receive(command)?;
        if !packet.is_success() {
            return Err(ProtocolError::DeviceError {
                command: command.code().to_string(),
                code: packet.error_code,
            });
        }
        Ok(packet)
    }

    fn send(&mut self, command: Command, frame: &[u8]) -> Result<(), ProtocolError> {
        debug!("Sending {}: {}", command, describe(frame));
        self.transport.write_all(frame)
    }

    fn receive(&mut self, command: Command) -> Result<Packet, ProtocolError> {
        let bytes = self.await_response()?;
        let packet = self.codec.decode(&bytes)?;
        debug!(
            "Response: command={} error={} id={:#04x} parameters={:?}",
            packet.command_code,
            packet.error_code,
            packet.packet_id,
            packet.parameters()
        );
        if packet.command_code != command.code() {
            warn!(
                "Response carries command code '{}' for request {}",
                packet.command_code, command
            );
        }
        Ok(packet)
    }

    /// Poll for a response until a complete frame arrives or the deadline passes.
    ///
    /// Whatever arrived by the deadline is returned for decoding; nothing at all
    /// is a [`ProtocolError::ResponseTimeout`].
    fn await_response(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let timeout = self.config.response_timeout();
        let poll = self.config.poll_interval();
        let mut waited = std::time::Duration::ZERO;
        let mut response = Vec::new();

        loop {
            let available = self.transport.bytes_available()?;
            if available > 0 {
                response.extend(self.transport.read_available(available)?);
                if frame_complete(&response) {
                    break;
                }
            }
            if waited >= timeout {
                break;
            }
            self.transport.sleep(poll);
            waited += poll;
        }

        debug!("Received {} bytes: {}", response.len(), describe(&response));
        if response.is_empty() {
            warn!("No response within {} ms", timeout.as_millis());
            return Err(ProtocolError::ResponseTimeout {
                timeout_ms: self.config.response_timeout_ms,
            });
        }
        Ok(response)
    }
}

/// ETX followed by the two checksum characters ends a frame
fn frame_complete(bytes: &[u8]) -> bool {
    bytes.len() >= MIN_RESPONSE_LEN && bytes[bytes.len() - 3] == ETX
}

/// Logo payloads are the bitmap prefixed with [`LOGO_START`]
fn logo_payload(bitmap: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(bitmap.len() + 1);
    payload.push(LOGO_START);
    payload.extend_from_slice(bitmap);
    payload
}

fn missing_parameter(command: Command, index: usize) -> ProtocolError {
    ProtocolError::MissingParameter {
        command: command.code().to_string(),
        index,
    }
}
