//! Protocol errors

use thiserror::Error;

/// Errors produced while decoding an inbound frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Empty response")]
    EmptyInput,

    #[error("Truncated response: {len} bytes, need at least {min}", min = super::MIN_RESPONSE_LEN)]
    Truncated { len: usize },

    #[error("Bad start byte: expected 0x02, got {0:#04x}")]
    BadStartByte(u8),

    #[error("Bad end byte: expected 0x03, got {0:#04x}")]
    BadEndByte(u8),

    #[error("Checksum mismatch: expected {expected:02X}, got '{actual}'")]
    ChecksumMismatch { expected: u8, actual: String },
}

/// Errors produced while interpreting a status field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("Invalid status byte: '{0}'")]
    InvalidStatusByte(String),

    #[error("Bit index {0} is outside a status byte")]
    BitOutOfRange(u8),
}

/// Errors that end an upload session
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("No connection with the terminal")]
    NoConnection,

    #[error("No response within {timeout_ms} ms")]
    ResponseTimeout { timeout_ms: u64 },

    #[error("Terminal returned error code '{code}' for command {command}")]
    DeviceError { command: String, code: String },

    #[error("Terminal is not ready to receive the payload (got {})", describe_byte(.received))]
    UploadRejected { received: Option<u8> },

    #[error("Payload upload failed with error code '{code}'")]
    UploadFailed { code: String },

    #[error("Response to command {command} has no parameter #{index}")]
    MissingParameter { command: String, index: usize },

    #[error("Malformed response: {0}")]
    Decode(#[from] DecodeError),

    #[error("Malformed status: {0}")]
    Status(#[from] StatusError),

    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// Process exit code for this failure kind
    pub fn exit_code(&self) -> u8 {
        match self {
            ProtocolError::NoConnection => 2,
            ProtocolError::ResponseTimeout { .. } => 3,
            ProtocolError::DeviceError { .. } => 4,
            ProtocolError::UploadRejected { .. } => 5,
            ProtocolError::UploadFailed { .. } => 6,
            ProtocolError::MissingParameter { .. }
            | ProtocolError::Decode(_)
            | ProtocolError::Status(_) => 7,
            ProtocolError::SerialError(_) | ProtocolError::IoError(_) => 8,
        }
    }
}

impl From<serialport::Error> for ProtocolError {
    fn from(e: serialport::Error) -> Self {
        ProtocolError::SerialError(e.to_string())
    }
}

fn describe_byte(byte: &Option<u8>) -> String {
    match byte {
        Some(b) => format!("{:#04x}", b),
        None => "nothing".to_string(),
    }
}
