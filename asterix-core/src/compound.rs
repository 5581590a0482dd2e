//! Compound data items and repetition groups.
//!
//! A compound item is its own FSPEC followed by one subfield per set bit.
//! Each subfield has a layout fixed by the item definition:
//!
//! - `Fixed(n)`: exactly `n` bytes
//! - `Repetitive(n)`: a count octet `k`, then `k` records of `n` bytes
//! - `Extended(max)`: an FX chain of at most `max` octets
//!
//! [`CompoundLayout::read`] splits a body into verbatim subfield slices;
//! typed items interpret the slices, raw items keep them as they are.

use tracing::debug;

use crate::cursor::{Cursor, Writer};
use crate::fspec::{DecodeMode, ExtendedOctets, Fspec};
use crate::types::{AsterixError, Result};

/// Longest FX chain accepted inside a subfield.
pub const MAX_SUBFIELD_EXTENSION: usize = 8;

/// Largest count a repetition octet can carry.
pub const MAX_REPETITIONS: usize = u8::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subfield {
    Fixed(usize),
    Repetitive(usize),
    Extended(usize),
    Spare,
}

#[derive(Debug, Clone, Copy)]
pub struct SubfieldSpec {
    pub name: &'static str,
    pub layout: Subfield,
}

impl SubfieldSpec {
    pub const fn fixed(name: &'static str, width: usize) -> Self {
        SubfieldSpec {
            name,
            layout: Subfield::Fixed(width),
        }
    }

    pub const fn repetitive(name: &'static str, width: usize) -> Self {
        SubfieldSpec {
            name,
            layout: Subfield::Repetitive(width),
        }
    }

    pub const fn extended(name: &'static str, max_octets: usize) -> Self {
        SubfieldSpec {
            name,
            layout: Subfield::Extended(max_octets),
        }
    }

    pub const fn spare() -> Self {
        SubfieldSpec {
            name: "spare",
            layout: Subfield::Spare,
        }
    }
}

/// Subfield table of a compound item with an FSPEC of at most `MAX` octets.
/// `subfields[i]` is the subfield announced by presence position `i + 1`.
#[derive(Debug, Clone, Copy)]
pub struct CompoundLayout<const MAX: usize> {
    pub item: &'static str,
    pub subfields: &'static [SubfieldSpec],
    pub mode: DecodeMode,
}

/// Subfields of one compound body, in ascending position order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundBody<'a> {
    pub parts: Vec<(usize, &'a [u8])>,
    /// False when best-effort decoding stopped before the last announced
    /// subfield.
    pub complete: bool,
}

impl<'a> CompoundBody<'a> {
    pub fn get(&self, position: usize) -> Option<&'a [u8]> {
        self.parts
            .iter()
            .find(|(p, _)| *p == position)
            .map(|(_, bytes)| *bytes)
    }
}

impl<const MAX: usize> CompoundLayout<MAX> {
    /// Definition of the subfield at a 1-based presence position.
    pub fn spec(&self, position: usize) -> Option<&SubfieldSpec> {
        position
            .checked_sub(1)
            .and_then(|i| self.subfields.get(i))
            .filter(|s| s.layout != Subfield::Spare)
    }

    pub fn name_of(&self, position: usize) -> &'static str {
        self.spec(position).map(|s| s.name).unwrap_or("?")
    }

    fn undefined(&self, position: usize) -> AsterixError {
        AsterixError::invalid(self.item, format!("subfield {position} is not defined"))
    }

    /// Split a compound body into its subfields.
    ///
    /// In best-effort mode a subfield that cannot be read ends decoding: the
    /// cursor is left after the last complete subfield.
    pub fn read<'a>(&self, cursor: &mut Cursor<'a>) -> Result<CompoundBody<'a>> {
        let fspec = Fspec::<MAX>::read(cursor, self.mode)?;
        let mut parts = Vec::new();
        let mut complete = true;

        for position in fspec.positions() {
            let spec = self.spec(position).ok_or_else(|| self.undefined(position))?;
            let mut probe = cursor.clone();
            match read_subfield(&mut probe, spec.layout) {
                Ok(bytes) => {
                    *cursor = probe;
                    parts.push((position, bytes));
                }
                Err(e @ AsterixError::Underrun { .. }) if self.mode == DecodeMode::BestEffort => {
                    debug!(
                        item = self.item,
                        subfield = spec.name,
                        error = %e,
                        "stopping early, keeping {} subfields",
                        parts.len()
                    );
                    complete = false;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(CompoundBody { parts, complete })
    }

    /// Check one subfield's bytes against its layout.
    pub fn check_part(&self, position: usize, bytes: &[u8]) -> Result<()> {
        let spec = self.spec(position).ok_or_else(|| self.undefined(position))?;
        let bad = |reason: String| {
            AsterixError::invalid(self.item, format!("subfield {}: {reason}", spec.name))
        };
        match spec.layout {
            Subfield::Fixed(n) if bytes.len() != n => {
                Err(bad(format!("expected {n} bytes, got {}", bytes.len())))
            }
            Subfield::Fixed(_) => Ok(()),
            Subfield::Repetitive(n) => match bytes.split_first() {
                Some((&k, rest)) if rest.len() == k as usize * n => Ok(()),
                Some((&k, rest)) => Err(bad(format!(
                    "count {k} needs {} bytes, got {}",
                    k as usize * n,
                    rest.len()
                ))),
                None => Err(bad("missing repetition count".into())),
            },
            Subfield::Extended(max) => {
                if bytes.len() > max {
                    return Err(bad(format!("more than {max} octets")));
                }
                ExtendedOctets::<MAX_SUBFIELD_EXTENSION>::from_slice(self.item, bytes).map(|_| ())
            }
            Subfield::Spare => Err(self.undefined(position)),
        }
    }

    /// Write the FSPEC and the given subfields. Positions must be unique;
    /// they are emitted in ascending order whatever order they arrive in.
    pub fn write<B: AsRef<[u8]>>(&self, parts: &[(usize, B)], out: &mut Writer) -> Result<()> {
        let mut sorted: Vec<(usize, &[u8])> =
            parts.iter().map(|(p, b)| (*p, b.as_ref())).collect();
        sorted.sort_by_key(|(p, _)| *p);
        if sorted.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(AsterixError::invalid(self.item, "duplicate subfield"));
        }
        for (position, bytes) in &sorted {
            self.check_part(*position, bytes)?;
        }

        let fspec = Fspec::<MAX>::from_positions(self.item, sorted.iter().map(|(p, _)| *p))?;
        let mut local = Writer::new();
        fspec.write(&mut local)?;
        for (_, bytes) in &sorted {
            local.write_bytes(bytes)?;
        }
        out.write_bytes(local.as_slice())
    }
}

fn read_subfield<'a>(cursor: &mut Cursor<'a>, layout: Subfield) -> Result<&'a [u8]> {
    let start = cursor.position();
    match layout {
        Subfield::Fixed(n) => cursor.read(n),
        Subfield::Repetitive(n) => {
            read_repetition(cursor, n, |_| Ok(()))?;
            Ok(cursor.consumed_since(start))
        }
        Subfield::Extended(max) => {
            ExtendedOctets::<MAX_SUBFIELD_EXTENSION>::read_limited(
                cursor,
                max,
                DecodeMode::Strict,
            )?;
            Ok(cursor.consumed_since(start))
        }
        Subfield::Spare => Err(AsterixError::invalid("compound", "spare subfield announced")),
    }
}

// ---------------------------------------------------------------------------
// Repetition groups
// ---------------------------------------------------------------------------

/// Read a count octet and that many `width`-byte records.
///
/// The whole group is bounds-checked before the first record is parsed, so a
/// count larger than the remaining buffer fails without partial output.
pub fn read_repetition<'a, T, F>(cursor: &mut Cursor<'a>, width: usize, mut parse: F) -> Result<Vec<T>>
where
    F: FnMut(&'a [u8]) -> Result<T>,
{
    let count = cursor.read_u8()? as usize;
    cursor.require(count * width)?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(parse(cursor.read(width)?)?);
    }
    Ok(out)
}

/// Write a count octet followed by each record, which must be exactly
/// `width` bytes long.
pub fn write_repetition<T, F>(
    item: &'static str,
    records: &[T],
    width: usize,
    out: &mut Writer,
    mut emit: F,
) -> Result<()>
where
    F: FnMut(&T, &mut Writer) -> Result<()>,
{
    if records.len() > MAX_REPETITIONS {
        return Err(AsterixError::TooLarge {
            len: records.len(),
            max: MAX_REPETITIONS,
        });
    }
    let mut local = Writer::new();
    local.write_u8(records.len() as u8)?;
    for record in records {
        let before = local.len();
        emit(record, &mut local)?;
        let written = local.len() - before;
        if written != width {
            return Err(AsterixError::invalid(
                item,
                format!("repetition record of {written} bytes, expected {width}"),
            ));
        }
    }
    out.write_bytes(local.as_slice())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
