//! Shared error enum, hex helpers and character sets for asterix-core.

use thiserror::Error;

/// All errors produced by asterix-core.
#[derive(Debug, Error)]
pub enum AsterixError {
    #[error("buffer underrun at offset {offset}: need {needed} bytes, {remaining} remaining")]
    Underrun {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("invalid value for {item}: {reason}")]
    InvalidValue { item: &'static str, reason: String },
    #[error("extension bit set at offset {offset} beyond the maximum of {max_octets} octets")]
    UnexpectedExtension { offset: usize, max_octets: usize },
    #[error("length {len} exceeds the maximum of {max}")]
    TooLarge { len: usize, max: usize },
    #[error("FRN {frn} is not defined in this UAP")]
    UnknownSlot { frn: u8 },
    #[error("value stored for {item} does not belong to that item")]
    ValueMismatch { item: &'static str },
    #[error("record decoded {consumed} of {len} bytes")]
    TrailingBytes { consumed: usize, len: usize },
    #[error("{item}: {source}")]
    Item {
        item: &'static str,
        #[source]
        source: Box<AsterixError>,
    },
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

impl AsterixError {
    /// Shorthand for an [`AsterixError::InvalidValue`].
    pub fn invalid(item: &'static str, reason: impl Into<String>) -> Self {
        AsterixError::InvalidValue {
            item,
            reason: reason.into(),
        }
    }

    /// Attach the data item the error occurred in. Already-wrapped errors are
    /// left alone so the innermost item wins.
    pub fn in_item(self, item: &'static str) -> Self {
        match self {
            AsterixError::Item { .. } => self,
            other => AsterixError::Item {
                item,
                source: Box::new(other),
            },
        }
    }

    /// The error with any [`AsterixError::Item`] wrappers removed.
    pub fn root(&self) -> &AsterixError {
        match self {
            AsterixError::Item { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, AsterixError>;

// ---------------------------------------------------------------------------
// Hex utilities
// ---------------------------------------------------------------------------

/// Decode a hex string into bytes. Case-insensitive, whitespace between byte
/// pairs is ignored, must contain an even number of digits.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = hex
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for chunk in digits.chunks(2) {
        let high = hex_digit(chunk[0])?;
        let low = hex_digit(chunk[1])?;
        bytes.push((high << 4) | low);
    }
    Some(bytes)
}

/// Encode bytes as uppercase hex string.
pub fn hex_encode(data: &[u8]) -> String {
    data.iter()
        .flat_map(|&b| [b >> 4, b & 0x0F])
        .map(|nibble| HEX_CHARS[nibble as usize] as char)
        .collect()
}

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Serde adapter storing byte vectors as uppercase hex strings.
pub mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::hex_encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::hex_decode(&s).ok_or_else(|| de::Error::custom(format!("invalid hex: {s}")))
    }
}

// ---------------------------------------------------------------------------
// ICAO 6-bit character set
// ---------------------------------------------------------------------------

/// ICAO character set used for target identification (6 bits per character).
/// `#` marks code points with no assigned character.
pub const ICAO_CHARSET: &[u8; 64] =
    b"#ABCDEFGHIJKLMNOPQRSTUVWXYZ##### ###############0123456789######";

/// Map a 6-bit code to its character, `None` for unassigned codes.
pub fn icao_char(code: u8) -> Option<char> {
    match ICAO_CHARSET.get(code as usize) {
        Some(b'#') | None => None,
        Some(&c) => Some(c as char),
    }
}

/// Map a character to its 6-bit code, `None` if it is not in the set.
pub fn icao_code(c: char) -> Option<u8> {
    if c == '#' || !c.is_ascii() {
        return None;
    }
    ICAO_CHARSET
        .iter()
        .position(|&b| b == c as u8)
        .map(|p| p as u8)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_decode() {
        assert_eq!(hex_decode("4840D6"), Some(vec![0x48, 0x40, 0xD6]));
        assert_eq!(hex_decode("48 40 d6"), Some(vec![0x48, 0x40, 0xD6]));
        assert_eq!(hex_decode("odd"), None);
        assert_eq!(hex_decode("ZZZZ"), None);
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0x48, 0x40, 0xD6]), "4840D6");
    }

    #[test]
    fn test_icao_charset_mapping() {
        assert_eq!(icao_char(1), Some('A'));
        assert_eq!(icao_char(32), Some(' '));
        assert_eq!(icao_char(48), Some('0'));
        assert_eq!(icao_char(0), None);
        assert_eq!(icao_code('Z'), Some(26));
        assert_eq!(icao_code('9'), Some(57));
        assert_eq!(icao_code('#'), None);
        assert_eq!(icao_code('a'), None);
    }

    #[test]
    fn test_error_item_wrapping() {
        let err = AsterixError::invalid("I062/105", "latitude out of range")
            .in_item("I062/105")
            .in_item("outer");
        match &err {
            AsterixError::Item { item, .. } => assert_eq!(*item, "I062/105"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(err.root(), AsterixError::InvalidValue { .. }));
    }
}
