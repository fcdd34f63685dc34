//! XOR checksum used by both frame directions

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Fold all bytes with XOR. Empty input yields 0.
pub fn xor8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Render a checksum as two zero-padded uppercase hex characters
pub fn to_hex_upper(value: u8) -> [u8; 2] {
    [
        HEX_DIGITS[(value >> 4) as usize],
        HEX_DIGITS[(value & 0x0F) as usize],
    ]
}

/// Parse two hex characters back into a checksum value.
///
/// Lowercase digits are accepted even though the terminal only sends uppercase.
pub fn from_hex(pair: [u8; 2]) -> Option<u8> {
    let hi = (pair[0] as char).to_digit(16)?;
    let lo = (pair[1] as char).to_digit(16)?;
    Some(((hi << 4) | lo) as u8)
}
