//! Byte-level remapping between raw bytes and printable Unicode characters.
//!
//! The GPT-2 vocabulary is keyed by strings, not byte sequences. To let arbitrary
//! UTF-8 (or binary) input flow through string tables, every byte value is given a
//! printable stand-in character:
//!
//! - Bytes 33-126 (`!` to `~`): map to themselves
//! - Bytes 161-172 (`¡` to `¬`): map to themselves
//! - Bytes 174-255 (`®` to `ÿ`): map to themselves
//! - Other bytes (0-32, 127-160, 173): map to U+0100 onwards, in ascending byte order
//!
//! Both tables are computed at compile time, so the mapping is identical across runs
//! and carries no runtime state.
//!
//! # Example
//!
//! ```
//! use gptok::byte_level::{byte_level_decode, byte_level_encode};
//!
//! // Space (0x20) becomes 'Ġ' (U+0120)
//! assert_eq!(byte_level_encode(b" hello"), "\u{120}hello");
//! assert_eq!(byte_level_decode("\u{120}hello").unwrap(), b" hello");
//! ```

/// First code point handed out to bytes without a printable self-mapping.
const SHIFT_BASE: u32 = 0x100;

/// Number of bytes that are not mapped to themselves.
const SHIFTED_BYTES: usize = 68;

/// Size of the reverse table: every remapped character is below this code point.
const CHAR_TABLE_LEN: usize = SHIFT_BASE as usize + SHIFTED_BYTES;

#[inline]
const fn is_printable(b: u8) -> bool {
    matches!(b, 33..=126 | 161..=172 | 174..=255)
}

const fn build_byte_to_char() -> [char; 256] {
    let mut table = ['\0'; 256];
    let mut shifted = 0u32;
    let mut b = 0usize;
    while b < 256 {
        let code = if is_printable(b as u8) {
            b as u32
        } else {
            let code = SHIFT_BASE + shifted;
            shifted += 1;
            code
        };
        table[b] = match char::from_u32(code) {
            Some(ch) => ch,
            None => panic!("byte-level code point out of range"),
        };
        b += 1;
    }
    assert!(shifted as usize == SHIFTED_BYTES);
    table
}

const fn build_char_to_byte() -> [Option<u8>; CHAR_TABLE_LEN] {
    let mut table = [None; CHAR_TABLE_LEN];
    let mut b = 0usize;
    while b < 256 {
        table[BYTE_TO_CHAR[b] as usize] = Some(b as u8);
        b += 1;
    }
    table
}

/// Byte to character table (256 entries).
pub const BYTE_TO_CHAR: [char; 256] = build_byte_to_char();

/// Reverse of [`BYTE_TO_CHAR`], indexed by code point.
const CHAR_TO_BYTE: [Option<u8>; CHAR_TABLE_LEN] = build_char_to_byte();

/// Remap a byte slice into its byte-level string form, one character per byte.
#[inline]
pub fn byte_level_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| BYTE_TO_CHAR[b as usize]).collect()
}

/// Map a byte-level string back to raw bytes.
///
/// Returns the first character that has no byte mapping as the error value.
pub fn byte_level_decode(text: &str) -> Result<Vec<u8>, char> {
    let mut bytes = Vec::with_capacity(text.len());
    for ch in text.chars() {
        bytes.push(get_byte_level_byte(ch).ok_or(ch)?);
    }
    Ok(bytes)
}

/// Check if a character is part of the byte-level alphabet.
#[inline]
pub fn is_byte_level_char(ch: char) -> bool {
    get_byte_level_byte(ch).is_some()
}

/// Get the byte-level character for a specific byte value.
#[inline]
pub fn get_byte_level_char(byte: u8) -> char {
    BYTE_TO_CHAR[byte as usize]
}

/// Get the byte value for a byte-level character.
#[inline]
pub fn get_byte_level_byte(ch: char) -> Option<u8> {
    CHAR_TO_BYTE.get(ch as usize).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_mapping_is_bijective() {
        let seen: HashSet<char> = BYTE_TO_CHAR.iter().copied().collect();
        assert_eq!(seen.len(), 256);
        for b in 0u8..=255 {
            assert_eq!(get_byte_level_byte(get_byte_level_char(b)), Some(b));
        }
    }

    #[test]
    fn test_printable_ranges_preserved() {
        for b in (33u8..=126).chain(161..=172).chain(174..=255) {
            assert_eq!(BYTE_TO_CHAR[b as usize] as u32, b as u32, "byte {b}");
        }
    }

    #[test]
    fn test_shifted_bytes_are_contiguous_from_u0100() {
        let shifted: Vec<u32> = (0u8..=255)
            .filter(|&b| !is_printable(b))
            .map(|b| BYTE_TO_CHAR[b as usize] as u32)
            .collect();
        let expected: Vec<u32> = (0x100..0x100 + SHIFTED_BYTES as u32).collect();
        assert_eq!(shifted, expected);
    }

    #[test]
    fn test_well_known_characters() {
        assert_eq!(get_byte_level_char(b' '), 'Ġ');
        assert_eq!(get_byte_level_char(b'\n'), 'Ċ');
        assert_eq!(get_byte_level_char(0), 'Ā');
        assert_eq!(get_byte_level_char(0xAD), 'Ń');
    }

    #[test]
    fn test_encode_chinese() {
        // "世" is E4 B8 96
        assert_eq!(byte_level_encode("世".as_bytes()), "ä¸ĸ");
    }

    #[test]
    fn test_decode_rejects_foreign_character() {
        assert_eq!(byte_level_decode("ab\u{20}"), Err(' '));
        assert_eq!(byte_level_decode("x€"), Err('€'));
        assert!(!is_byte_level_char('\u{144}'));
    }

    #[test]
    fn test_full_roundtrip_string() {
        let original = "Hello, 世界! 🦀\tend\r\n";
        let encoded = byte_level_encode(original.as_bytes());
        assert!(encoded.chars().all(is_byte_level_char));
        let decoded = byte_level_decode(&encoded).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), original);
    }
}
