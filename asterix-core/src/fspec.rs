//! FX-chained octet sequences: the field specification (FSPEC) presence
//! bitmask and the "extended" data item layout built on the same chain.
//!
//! Each octet carries seven payload bits (8..2) and the FX bit (bit 1) which
//! says another octet follows. Chains are stored in a fixed array of `MAX`
//! octets so worst-case size is known at compile time.
//!
//! Presence positions are 1-based: bit 8 of the first octet is position 1,
//! bit 2 of the first octet is position 7, bit 8 of the second is 8, ...

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cursor::{Cursor, Writer};
use crate::types::{AsterixError, Result};

/// Continuation bit of every chained octet.
pub const FX: u8 = 0x01;

/// Presence bits per FSPEC octet.
pub const BITS_PER_OCTET: usize = 7;

/// How a chain reader reacts to an FX bit at the maximum length or to a
/// buffer that runs out mid-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecodeMode {
    /// Fail with `UnexpectedExtension` / `Underrun`.
    #[default]
    Strict,
    /// Stop at the last complete octet and keep what was read.
    BestEffort,
}

// ---------------------------------------------------------------------------
// ExtendedOctets
// ---------------------------------------------------------------------------

/// Up to `MAX` octets linked by their FX bits, kept verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedOctets<const MAX: usize> {
    octets: [u8; MAX],
    len: usize,
}

impl<const MAX: usize> ExtendedOctets<MAX> {
    /// Read a chain using the type's own maximum.
    pub fn read(cursor: &mut Cursor<'_>, mode: DecodeMode) -> Result<Self> {
        Self::read_limited(cursor, MAX, mode)
    }

    /// Read a chain of at most `min(limit, MAX)` octets.
    pub fn read_limited(cursor: &mut Cursor<'_>, limit: usize, mode: DecodeMode) -> Result<Self> {
        let limit = limit.clamp(1, MAX);
        let mut octets = [0u8; MAX];
        let mut len = 0;

        loop {
            let offset = cursor.position();
            let b = match cursor.read_u8() {
                Ok(b) => b,
                Err(_) if mode == DecodeMode::BestEffort && len > 0 => {
                    debug!(offset, "chain truncated by end of buffer");
                    octets[len - 1] &= !FX;
                    break;
                }
                Err(e) => return Err(e),
            };
            octets[len] = b;
            len += 1;

            if b & FX == 0 {
                break;
            }
            if len == limit {
                match mode {
                    DecodeMode::Strict => {
                        return Err(AsterixError::UnexpectedExtension {
                            offset,
                            max_octets: limit,
                        });
                    }
                    DecodeMode::BestEffort => {
                        debug!(offset, max_octets = limit, "ignoring extension past maximum");
                        octets[len - 1] &= !FX;
                        break;
                    }
                }
            }
        }

        Ok(ExtendedOctets { octets, len })
    }

    /// Build from raw octets, checking that FX bits form a proper chain.
    pub fn from_slice(item: &'static str, raw: &[u8]) -> Result<Self> {
        if raw.is_empty() || raw.len() > MAX {
            return Err(AsterixError::invalid(
                item,
                format!("extended item needs 1..={MAX} octets, got {}", raw.len()),
            ));
        }
        let last = raw.len() - 1;
        for (i, &b) in raw.iter().enumerate() {
            let fx = b & FX != 0;
            if fx != (i < last) {
                return Err(AsterixError::invalid(
                    item,
                    format!("FX bit of octet {} does not match the chain length", i + 1),
                ));
            }
        }
        let mut octets = [0u8; MAX];
        octets[..raw.len()].copy_from_slice(raw);
        Ok(ExtendedOctets {
            octets,
            len: raw.len(),
        })
    }

    /// Build from payload octets (FX bits ignored), trimming trailing octets
    /// that carry no set bits. The first octet is always kept.
    pub fn from_payload(payload: [u8; MAX]) -> Self {
        let mut len = MAX;
        while len > 1 && payload[len - 1] & !FX == 0 {
            len -= 1;
        }
        let mut octets = [0u8; MAX];
        for i in 0..len {
            octets[i] = payload[i] & !FX;
            if i + 1 < len {
                octets[i] |= FX;
            }
        }
        ExtendedOctets { octets, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.octets[..self.len]
    }

    /// Octet `index` (0-based), or 0 when the chain is shorter.
    pub fn octet(&self, index: usize) -> u8 {
        if index < self.len { self.octets[index] } else { 0 }
    }

    pub fn write(&self, out: &mut Writer) -> Result<()> {
        out.write_bytes(self.as_slice())
    }
}

// ---------------------------------------------------------------------------
// Fspec
// ---------------------------------------------------------------------------

/// Presence bitmask of up to `MAX` octets (`7 * MAX` positions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fspec<const MAX: usize> {
    chain: ExtendedOctets<MAX>,
}

impl<const MAX: usize> Fspec<MAX> {
    /// Highest position this bitmask can represent.
    pub const CAPACITY: usize = MAX * BITS_PER_OCTET;

    pub fn read(cursor: &mut Cursor<'_>, mode: DecodeMode) -> Result<Self> {
        Self::read_limited(cursor, MAX, mode)
    }

    pub fn read_limited(cursor: &mut Cursor<'_>, limit: usize, mode: DecodeMode) -> Result<Self> {
        Ok(Fspec {
            chain: ExtendedOctets::read_limited(cursor, limit, mode)?,
        })
    }

    /// Minimal chain marking exactly `positions` as present.
    pub fn from_positions<I>(item: &'static str, positions: I) -> Result<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut payload = [0u8; MAX];
        for pos in positions {
            if pos == 0 || pos > Self::CAPACITY {
                return Err(AsterixError::invalid(
                    item,
                    format!("presence position {pos} outside 1..={}", Self::CAPACITY),
                ));
            }
            let (octet, mask) = locate(pos);
            payload[octet] |= mask;
        }
        Ok(Fspec {
            chain: ExtendedOctets::from_payload(payload),
        })
    }

    pub fn is_set(&self, pos: usize) -> bool {
        if pos == 0 || pos > Self::CAPACITY {
            return false;
        }
        let (octet, mask) = locate(pos);
        self.chain.octet(octet) & mask != 0
    }

    /// Present positions in ascending order.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        (1..=self.chain.len() * BITS_PER_OCTET).filter(|&p| self.is_set(p))
    }

    pub fn octet_count(&self) -> usize {
        self.chain.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.chain.as_slice()
    }

    pub fn write(&self, out: &mut Writer) -> Result<()> {
        self.chain.write(out)
    }
}

/// Octet index and bit mask of a 1-based presence position.
fn locate(pos: usize) -> (usize, u8) {
    let idx = pos - 1;
    (idx / BITS_PER_OCTET, 0x80 >> (idx % BITS_PER_OCTET))
}

/// Read a presence chain and report the set positions and octets consumed.
pub fn decode_presence<const MAX: usize>(
    cursor: &mut Cursor<'_>,
    mode: DecodeMode,
) -> Result<(Vec<usize>, usize)> {
    let fspec = Fspec::<MAX>::read(cursor, mode)?;
    Ok((fspec.positions().collect(), fspec.octet_count()))
}

/// Encode a set of present positions as a minimal presence chain.
pub fn encode_presence<const MAX: usize>(positions: &[usize]) -> Result<Vec<u8>> {
    let fspec = Fspec::<MAX>::from_positions("FSPEC", positions.iter().copied())?;
    Ok(fspec.as_bytes().to_vec())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_one_with_continuation() {
        // 0x81: slot 1 present + FX; 0x00 ends the chain
        let data = [0x81, 0x00, 0xAA];
        let mut c = Cursor::new(&data);
        let (positions, octets) = decode_presence::<5>(&mut c, DecodeMode::Strict).unwrap();
        assert_eq!(positions, vec![1]);
        assert_eq!(octets, 2);
        assert_eq!(c.position(), 2);
    }

    #[test]
    fn test_position_numbering() {
        let data = [0x03, 0x80];
        let mut c = Cursor::new(&data);
        let fspec = Fspec::<2>::read(&mut c, DecodeMode::Strict).unwrap();
        assert_eq!(fspec.positions().collect::<Vec<_>>(), vec![7, 8]);
        assert!(fspec.is_set(7));
        assert!(!fspec.is_set(1));
        assert!(!fspec.is_set(99));
    }

    #[test]
    fn test_extension_past_maximum_is_error() {
        let data = [0x81, 0x01, 0x80];
        let mut c = Cursor::new(&data);
        let err = Fspec::<2>::read(&mut c, DecodeMode::Strict).unwrap_err();
        assert!(matches!(
            err,
            AsterixError::UnexpectedExtension {
                offset: 1,
                max_octets: 2
            }
        ));
    }

    #[test]
    fn test_extension_past_maximum_best_effort() {
        let data = [0x81, 0x41, 0x80];
        let mut c = Cursor::new(&data);
        let fspec = Fspec::<2>::read(&mut c, DecodeMode::BestEffort).unwrap();
        assert_eq!(fspec.positions().collect::<Vec<_>>(), vec![1, 9]);
        assert_eq!(c.position(), 2);
    }

    #[test]
    fn test_truncated_chain() {
        let data = [0x81];
        let mut c = Cursor::new(&data);
        assert!(matches!(
            Fspec::<3>::read(&mut c, DecodeMode::Strict),
            Err(AsterixError::Underrun { .. })
        ));

        let mut c = Cursor::new(&data);
        let fspec = Fspec::<3>::read(&mut c, DecodeMode::BestEffort).unwrap();
        assert_eq!(fspec.positions().collect::<Vec<_>>(), vec![1]);
        assert_eq!(fspec.as_bytes(), &[0x80]);

        let mut c = Cursor::new(&[]);
        assert!(Fspec::<3>::read(&mut c, DecodeMode::BestEffort).is_err());
    }

    #[test]
    fn test_read_limited() {
        let data = [0x01, 0x01, 0x00];
        let mut c = Cursor::new(&data);
        assert!(Fspec::<8>::read_limited(&mut c, 2, DecodeMode::Strict).is_err());
        let mut c = Cursor::new(&data);
        assert_eq!(
            Fspec::<8>::read_limited(&mut c, 3, DecodeMode::Strict)
                .unwrap()
                .octet_count(),
            3
        );
    }

    #[test]
    fn test_encode_presence_minimal_length() {
        assert_eq!(encode_presence::<5>(&[]).unwrap(), vec![0x00]);
        assert_eq!(encode_presence::<5>(&[1]).unwrap(), vec![0x80]);
        assert_eq!(encode_presence::<5>(&[7]).unwrap(), vec![0x02]);
        assert_eq!(encode_presence::<5>(&[1, 8]).unwrap(), vec![0x81, 0x80]);
        assert_eq!(
            encode_presence::<5>(&[35]).unwrap(),
            vec![0x01, 0x01, 0x01, 0x01, 0x02]
        );
        assert!(encode_presence::<5>(&[36]).is_err());
        assert!(encode_presence::<5>(&[0]).is_err());
    }

    #[test]
    fn test_presence_law() {
        let sets: &[&[usize]] = &[
            &[],
            &[1],
            &[2, 3, 4],
            &[7, 8],
            &[14],
            &[1, 12, 13, 20, 28],
            &[34, 35],
        ];
        for &set in sets {
            let bytes = encode_presence::<5>(set).unwrap();
            let expected_octets = set.iter().max().map(|&h| (h - 1) / 7 + 1).unwrap_or(1);
            assert_eq!(bytes.len(), expected_octets, "set {set:?}");

            let mut c = Cursor::new(&bytes);
            let (decoded, octets) = decode_presence::<5>(&mut c, DecodeMode::Strict).unwrap();
            assert_eq!(decoded, set.to_vec());
            assert_eq!(octets, bytes.len());
        }
    }

    #[test]
    fn test_extended_octets_from_slice() {
        let chain = ExtendedOctets::<3>::from_slice("t", &[0x41, 0x20]).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.octet(1), 0x20);
        assert_eq!(chain.octet(2), 0);
        assert!(ExtendedOctets::<3>::from_slice("t", &[0x40, 0x20]).is_err());
        assert!(ExtendedOctets::<3>::from_slice("t", &[0x41]).is_err());
        assert!(ExtendedOctets::<1>::from_slice("t", &[0x40, 0x20]).is_err());
        assert!(ExtendedOctets::<1>::from_slice("t", &[]).is_err());
    }

    #[test]
    fn test_extended_octets_from_payload_trims() {
        let chain = ExtendedOctets::<4>::from_payload([0x40, 0x00, 0x00, 0x00]);
        assert_eq!(chain.as_slice(), &[0x40]);
        let chain = ExtendedOctets::<4>::from_payload([0x00, 0x00, 0x80, 0x00]);
        assert_eq!(chain.as_slice(), &[0x01, 0x01, 0x80]);
    }
}
