//! Status field decoding
//!
//! Status responses report bit sets as decimal ASCII numbers, e.g. `"4"` for `0b0000_0100`.

use super::StatusError;

/// Bit of the "current flags" field that is set while a shift is open
pub const SHIFT_OPEN_BIT: u8 = 2;

/// Parse a decimal ASCII status field into a byte
pub fn parse_status_byte(value: &str) -> Result<u8, StatusError> {
    value
        .trim()
        .parse::<u8>()
        .map_err(|_| StatusError::InvalidStatusByte(value.to_string()))
}

/// Test bit `index` (0 = least significant) of a decimal ASCII status field
pub fn bit_at(value: &str, index: u8) -> Result<bool, StatusError> {
    if index >= 8 {
        return Err(StatusError::BitOutOfRange(index));
    }
    let byte = parse_status_byte(value)?;
    Ok(byte & (1 << index) != 0)
}
