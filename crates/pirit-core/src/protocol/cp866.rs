//! # Code Page 866 Decoding
//!
//! The terminal reports text fields (organization name, settings values) in the
//! DOS Cyrillic code page. ASCII (0x00–0x7F) passes through unchanged; the upper
//! half maps to Cyrillic letters, box drawing and a few symbols.
//!
//! Outbound parameters are plain ASCII, see [`encode_ascii`].

/// 0xB0–0xDF: shade blocks and box drawing (shared with CP437)
const BOX_DRAWING: [char; 48] = [
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐', // 0xB0
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧', // 0xC0
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀', // 0xD0
];

/// 0xF0–0xFF: Ukrainian/Belarusian letters and symbols
const TAIL: [char; 16] = [
    'Ё', 'ё', 'Є', 'є', 'Ї', 'ї', 'Ў', 'ў', '°', '∙', '·', '√', '№', '¤', '■', '\u{00A0}',
];

/// Decode a single CP866 byte
pub fn decode_byte(byte: u8) -> char {
    let code_point = match byte {
        0x00..=0x7F => byte as u32,
        // А..Я, а..п
        0x80..=0xAF => 0x0410 + (byte - 0x80) as u32,
        0xB0..=0xDF => return BOX_DRAWING[(byte - 0xB0) as usize],
        // р..я
        0xE0..=0xEF => 0x0440 + (byte - 0xE0) as u32,
        0xF0..=0xFF => return TAIL[(byte - 0xF0) as usize],
    };
    char::from_u32(code_point).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Decode a CP866 byte string
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().copied().map(decode_byte).collect()
}

/// Encode text as ASCII, replacing anything outside 0x00–0x7F with `?`
pub fn encode_ascii(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| if ch.is_ascii() { ch as u8 } else { b'?' })
        .collect()
}
