//! Packet encoding/decoding
//!
//! Requests carry the password and are checksummed from the password through ETX.
//! Responses carry the command and error codes instead of the password.
//!
//! The codec is pure: it never touches the transport and never logs.

use super::checksum::{from_hex, to_hex_upper, xor8};
use super::cp866::{self, encode_ascii};
use super::{
    Command, DecodeError, ETX, FS, MIN_RESPONSE_LEN, RESPONSE_HEADER_LEN, STX, SUCCESS_CODE,
};
use crate::config::ProtocolConfig;

/// A decoded terminal response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet id echoed by the terminal
    pub packet_id: u8,
    /// Two-character command code
    pub command_code: String,
    /// Two-character error code, [`SUCCESS_CODE`] on success
    pub error_code: String,
    /// Non-empty data fields, `None` when the frame has no data region
    pub parameters: Option<Vec<String>>,
}

impl Packet {
    /// Whether the terminal reported "no error"
    pub fn is_success(&self) -> bool {
        self.error_code == SUCCESS_CODE
    }

    /// Data fields, empty when the frame had none
    pub fn parameters(&self) -> &[String] {
        self.parameters.as_deref().unwrap_or(&[])
    }

    /// Get a data field by position
    pub fn parameter(&self, index: usize) -> Option<&str> {
        self.parameters().get(index).map(String::as_str)
    }
}

/// Frame codec configured with the session password and packet id
#[derive(Debug, Clone)]
pub struct PacketCodec {
    password: Vec<u8>,
    packet_id: u8,
    verify_frames: bool,
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new(&ProtocolConfig::default())
    }
}

impl PacketCodec {
    /// Create a codec from protocol settings
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            password: config.password.as_bytes().to_vec(),
            packet_id: config.packet_id,
            verify_frames: config.verify_frames,
        }
    }

    /// Packet id stamped on outbound frames
    pub fn packet_id(&self) -> u8 {
        self.packet_id
    }

    /// Encode a request frame.
    ///
    /// Each parameter is written as ASCII followed by FS, in order.
    pub fn encode(&self, command: Command, params: &[&str]) -> Vec<u8> {
        let params_len: usize = params.iter().map(|p| p.len() + 1).sum();
        let mut content = Vec::with_capacity(self.password.len() + 3 + params_len + 1);

        content.extend_from_slice(&self.password);
        content.push(self.packet_id);
        content.extend_from_slice(command.code().as_bytes());
        for param in params {
            content.extend_from_slice(&encode_ascii(param));
            content.push(FS);
        }
        content.push(ETX);

        let crc = to_hex_upper(xor8(&content));

        let mut bytes = Vec::with_capacity(1 + content.len() + 2);
        bytes.push(STX);
        bytes.extend_from_slice(&content);
        bytes.extend_from_slice(&crc);
        bytes
    }

    /// Decode a response frame.
    ///
    /// Start byte, end byte and checksum are only checked when frame
    /// verification is enabled.
    pub fn decode(&self, bytes: &[u8]) -> Result<Packet, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::EmptyInput);
        }
        if bytes.len() < MIN_RESPONSE_LEN {
            return Err(DecodeError::Truncated { len: bytes.len() });
        }
        if self.verify_frames {
            verify_frame(bytes)?;
        }

        let data_len = bytes.len() - MIN_RESPONSE_LEN;
        let parameters: Option<Vec<String>> = (data_len > 0).then(|| {
            bytes[RESPONSE_HEADER_LEN..RESPONSE_HEADER_LEN + data_len]
                .split(|&b| b == FS)
                .filter(|field| !field.is_empty())
                .map(cp866::decode)
                .collect()
        });

        Ok(Packet {
            packet_id: bytes[1],
            command_code: ascii_lossy(&bytes[2..4]),
            error_code: ascii_lossy(&bytes[4..6]),
            parameters,
        })
    }
}

/// Encode a response frame the way the terminal does.
///
/// The checksum covers everything after STX through ETX.
pub fn encode_response(
    packet_id: u8,
    command_code: &str,
    error_code: &str,
    params: &[&str],
) -> Vec<u8> {
    let mut bytes = vec![STX, packet_id];
    bytes.extend_from_slice(&encode_ascii(command_code));
    bytes.extend_from_slice(&encode_ascii(error_code));
    for param in params {
        bytes.extend_from_slice(&encode_ascii(param));
        bytes.push(FS);
    }
    bytes.push(ETX);
    let crc = to_hex_upper(xor8(&bytes[1..]));
    bytes.extend_from_slice(&crc);
    bytes
}

/// Format a frame as dash-separated hex followed by its printable ASCII
pub fn describe(bytes: &[u8]) -> String {
    let hex: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
    let text: String = bytes
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
        .collect();
    format!("{} |{}|", hex.join("-"), text)
}

fn verify_frame(bytes: &[u8]) -> Result<(), DecodeError> {
    let len = bytes.len();
    if bytes[0] != STX {
        return Err(DecodeError::BadStartByte(bytes[0]));
    }
    if bytes[len - 3] != ETX {
        return Err(DecodeError::BadEndByte(bytes[len - 3]));
    }
    let expected = xor8(&bytes[1..len - 2]);
    let trailer = [bytes[len - 2], bytes[len - 1]];
    if from_hex(trailer) != Some(expected) {
        return Err(DecodeError::ChecksumMismatch {
            expected,
            actual: ascii_lossy(&trailer),
        });
    }
    Ok(())
}

fn ascii_lossy(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Status response captured from a terminal: three "0" fields
    const SAMPLE_RESPONSE: [u8; 15] = [
        0x02, 0x20, 0x30, 0x30, 0x30, 0x30, 0x30, 0x1C, 0x30, 0x1C, 0x30, 0x1C, 0x03, 0x30, 0x46,
    ];

    fn strict_codec() -> PacketCodec {
        PacketCodec::new(&ProtocolConfig {
            verify_frames: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_decode_sample_response() {
        let packet = PacketCodec::default().decode(&SAMPLE_RESPONSE).unwrap();
        assert_eq!(packet.command_code, "00");
        assert_eq!(packet.error_code, "00");
        assert_eq!(packet.packet_id, 0x20);
        assert_eq!(packet.parameters(), &["0", "0", "0"]);
        assert!(packet.is_success());
    }

    #[test]
    fn test_sample_response_passes_verification() {
        assert!(strict_codec().decode(&SAMPLE_RESPONSE).is_ok());
    }

    #[test]
    fn test_encode_status_query() {
        let bytes = PacketCodec::default().encode(Command::StatusFlags, &[]);
        let expected = vec![
            STX, b'P', b'I', b'R', b'I', 0x20, b'0', b'0', ETX, b'2', b'1',
        ];
        assert_eq!(bytes, expected);

        let crc = xor8(&bytes[1..bytes.len() - 2]);
        assert_eq!(&bytes[bytes.len() - 2..], &to_hex_upper(crc));
    }

    #[test]
    fn test_encode_with_two_params() {
        let bytes = PacketCodec::default().encode(Command::ReadSettings, &["30", "0"]);
        let expected = vec![
            STX, b'P', b'I', b'R', b'I', 0x20, b'1', b'1', b'3', b'0', FS, b'0', FS, ETX, b'1',
            b'2',
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_encode_uses_configured_password_and_id() {
        let codec = PacketCodec::new(&ProtocolConfig {
            password: "ABCD".into(),
            packet_id: 0x31,
            ..Default::default()
        });
        let bytes = codec.encode(Command::LoadDesign, &["1024"]);
        assert_eq!(&bytes[1..5], b"ABCD");
        assert_eq!(bytes[5], 0x31);
        assert_eq!(&bytes[6..8], b"17");
        assert_eq!(&bytes[8..13], b"1024\x1c");
    }

    #[test]
    fn test_decode_empty_input() {
        assert_eq!(PacketCodec::default().decode(&[]), Err(DecodeError::EmptyInput));
    }

    #[test]
    fn test_decode_truncated() {
        let result = PacketCodec::default().decode(&SAMPLE_RESPONSE[..8]);
        assert_eq!(result, Err(DecodeError::Truncated { len: 8 }));
    }

    #[test]
    fn test_decode_without_data_region() {
        let frame = encode_response(0x20, "17", "00", &[]);
        assert_eq!(frame.len(), MIN_RESPONSE_LEN);
        let packet = PacketCodec::default().decode(&frame).unwrap();
        assert_eq!(packet.command_code, "17");
        assert_eq!(packet.parameters, None);
        assert!(packet.parameters().is_empty());
    }

    #[test]
    fn test_decode_drops_empty_fields() {
        let mut frame = vec![STX, 0x20, b'1', b'1', b'0', b'0'];
        frame.extend_from_slice(&[FS, b'a', FS, FS, b'b', FS]);
        frame.push(ETX);
        let crc = to_hex_upper(xor8(&frame[1..]));
        frame.extend_from_slice(&crc);

        let packet = PacketCodec::default().decode(&frame).unwrap();
        assert_eq!(packet.parameters(), &["a", "b"]);
    }

    #[test]
    fn test_decode_only_separators_yields_empty_list() {
        let mut frame = vec![STX, 0x20, b'0', b'0', b'0', b'0', FS, FS, ETX];
        let crc = to_hex_upper(xor8(&frame[1..]));
        frame.extend_from_slice(&crc);

        let packet = PacketCodec::default().decode(&frame).unwrap();
        assert_eq!(packet.parameters, Some(vec![]));
    }

    #[test]
    fn test_decode_cyrillic_field() {
        let mut frame = vec![STX, 0x20, b'1', b'1', b'0', b'0'];
        // "  ООО"
        frame.extend_from_slice(&[b' ', b' ', 0x8E, 0x8E, 0x8E, FS, ETX]);
        let crc = to_hex_upper(xor8(&frame[1..]));
        frame.extend_from_slice(&crc);

        let packet = PacketCodec::default().decode(&frame).unwrap();
        assert_eq!(packet.parameter(0), Some("  ООО"));
    }

    #[test]
    fn test_decode_error_code() {
        let frame = encode_response(0x20, "11", "0B", &[]);
        let packet = PacketCodec::default().decode(&frame).unwrap();
        assert_eq!(packet.error_code, "0B");
        assert!(!packet.is_success());
    }

    #[test]
    fn test_corrupt_checksum_accepted_without_verification() {
        let mut frame = SAMPLE_RESPONSE;
        frame[14] = b'0';
        assert!(PacketCodec::default().decode(&frame).is_ok());
    }

    #[test]
    fn test_corrupt_checksum_rejected_with_verification() {
        let mut frame = SAMPLE_RESPONSE;
        frame[14] = b'0';
        assert_eq!(
            strict_codec().decode(&frame),
            Err(DecodeError::ChecksumMismatch {
                expected: 0x0F,
                actual: "00".into(),
            })
        );
    }

    #[test]
    fn test_bad_framing_rejected_with_verification() {
        let mut frame = SAMPLE_RESPONSE;
        frame[0] = 0x00;
        assert_eq!(strict_codec().decode(&frame), Err(DecodeError::BadStartByte(0x00)));

        let mut frame = SAMPLE_RESPONSE;
        frame[12] = FS;
        assert_eq!(strict_codec().decode(&frame), Err(DecodeError::BadEndByte(FS)));
    }

    #[test]
    fn test_encode_response_matches_sample() {
        assert_eq!(
            encode_response(0x20, "00", "00", &["0", "0", "0"]),
            SAMPLE_RESPONSE.to_vec()
        );
    }

    #[test]
    fn test_request_fields_recoverable() {
        // Requests and responses differ in header layout, so check the
        // request's command and parameters directly at their offsets.
        let bytes = PacketCodec::default().encode(Command::ReadSettings, &["30", "0"]);
        assert_eq!(&bytes[6..8], b"11");
        let fields: Vec<&[u8]> = bytes[8..bytes.len() - 3]
            .split(|&b| b == FS)
            .filter(|f| !f.is_empty())
            .collect();
        assert_eq!(fields, vec![&b"30"[..], &b"0"[..]]);
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&[STX, b'0', b'A', ETX]), "02-30-41-03 |.0A.|");
    }
}
