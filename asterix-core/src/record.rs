//! Record assembler: walks a UAP against one record FSPEC.
//!
//! Decode reads the FSPEC, then hands the cursor to the codec of every
//! present FRN in ascending order. Encode is the reverse: the FSPEC is
//! recomputed from the FRNs present in the [`Record`] and each value is
//! written through the same codecs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::codec::ItemCodec;
use crate::cursor::{Cursor, Writer};
use crate::fspec::{DecodeMode, Fspec};
use crate::items::ItemValue;
use crate::types::{AsterixError, Result};
use crate::uap::{Uap, MAX_RECORD_FSPEC};

/// One decoded or caller-built record: FRN → value.
///
/// With raw replay enabled, decoding also keeps the verbatim bytes of every
/// item; encoding re-emits those instead of the re-encoded value. Replacing a
/// value through [`Record::insert`] or [`Record::remove`] drops its bytes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    items: BTreeMap<u8, ItemValue>,
    #[serde(skip)]
    raw: BTreeMap<u8, Vec<u8>>,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    /// Set the value of `frn`, returning the previous one.
    pub fn insert(&mut self, frn: u8, value: ItemValue) -> Option<ItemValue> {
        self.raw.remove(&frn);
        self.items.insert(frn, value)
    }

    pub fn remove(&mut self, frn: u8) -> Option<ItemValue> {
        self.raw.remove(&frn);
        self.items.remove(&frn)
    }

    pub fn get(&self, frn: u8) -> Option<&ItemValue> {
        self.items.get(&frn)
    }

    /// Bytes captured for `frn` at decode time, if any.
    pub fn raw(&self, frn: u8) -> Option<&[u8]> {
        self.raw.get(&frn).map(Vec::as_slice)
    }

    /// Forget every captured byte sequence.
    pub fn clear_raw(&mut self) {
        self.raw.clear();
    }

    /// Values in ascending FRN order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &ItemValue)> {
        self.items.iter().map(|(frn, v)| (*frn, v))
    }

    pub fn frns(&self) -> impl Iterator<Item = u8> + '_ {
        self.items.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<(u8, ItemValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (u8, ItemValue)>>(iter: I) -> Self {
        Record {
            items: iter.into_iter().collect(),
            raw: BTreeMap::new(),
        }
    }
}

/// Result of decoding a byte span that may hold more than one record.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub record: Record,
    /// Bytes taken by this record, FSPEC included.
    pub consumed: usize,
}

fn slot_codec(uap: &Uap, frn: u8) -> Result<&dyn ItemCodec> {
    uap.slot(frn)
        .map(|slot| slot.codec.as_ref())
        .ok_or(AsterixError::UnknownSlot { frn })
}

/// Decode one record from the start of `data`.
///
/// Bytes after the record are left alone; compare `consumed` with the span
/// length, or use [`decode_record_exact`], to detect them.
pub fn decode_record(uap: &Uap, data: &[u8]) -> Result<DecodedRecord> {
    let mut cursor = Cursor::new(data);
    let fspec = Fspec::<MAX_RECORD_FSPEC>::read_limited(
        &mut cursor,
        uap.fspec_octets(),
        DecodeMode::Strict,
    )?;
    trace!(fspec = ?fspec.as_bytes(), "record FSPEC");

    let keep_raw = uap.config().raw_replay;
    let mut record = Record::new();

    for position in fspec.positions() {
        let frn = position as u8;
        let codec = slot_codec(uap, frn)?;
        let start = cursor.position();
        let (value, consumed) = codec.decode_item(&mut cursor)?;
        trace!(frn, item = codec.id(), consumed, "decoded item");

        if keep_raw {
            record.raw.insert(frn, cursor.consumed_since(start).to_vec());
        }
        record.items.insert(frn, value);
    }

    Ok(DecodedRecord {
        record,
        consumed: cursor.position(),
    })
}

/// Decode a span that must hold exactly one record.
pub fn decode_record_exact(uap: &Uap, data: &[u8]) -> Result<Record> {
    let decoded = decode_record(uap, data)?;
    if decoded.consumed != data.len() {
        return Err(AsterixError::TrailingBytes {
            consumed: decoded.consumed,
            len: data.len(),
        });
    }
    Ok(decoded.record)
}

/// Decode consecutive records until `data` is exhausted.
pub fn decode_records(uap: &Uap, data: &[u8]) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let decoded = decode_record(uap, &data[offset..]).map_err(|e| shift_offset(e, offset))?;
        offset += decoded.consumed;
        records.push(decoded.record);
    }
    Ok(records)
}

/// Make an underrun offset relative to the whole block.
fn shift_offset(err: AsterixError, by: usize) -> AsterixError {
    match err {
        AsterixError::Underrun {
            offset,
            needed,
            remaining,
        } => AsterixError::Underrun {
            offset: offset + by,
            needed,
            remaining,
        },
        AsterixError::Item { item, source } => AsterixError::Item {
            item,
            source: Box::new(shift_offset(*source, by)),
        },
        other => other,
    }
}

/// Encode a record into a fresh buffer.
pub fn encode_record(uap: &Uap, record: &Record) -> Result<Vec<u8>> {
    let mut out = Writer::new();
    encode_record_into(uap, record, &mut out)?;
    Ok(out.into_inner())
}

/// Append one encoded record to `out`. Nothing is appended on failure.
pub fn encode_record_into(uap: &Uap, record: &Record, out: &mut Writer) -> Result<()> {
    let codecs = record
        .frns()
        .map(|frn| slot_codec(uap, frn).map(|codec| (frn, codec)))
        .collect::<Result<Vec<_>>>()?;

    let fspec = Fspec::<MAX_RECORD_FSPEC>::from_positions(
        "FSPEC",
        record.frns().map(usize::from),
    )?;

    let replay = uap.config().raw_replay;
    let mut local = Writer::new();
    fspec.write(&mut local)?;

    for ((frn, value), (_, codec)) in record.iter().zip(codecs) {
        match record.raw(frn) {
            Some(bytes) if replay => {
                debug!(frn, item = codec.id(), len = bytes.len(), "replaying raw bytes");
                local.write_bytes(bytes)?;
            }
            _ => {
                let written = codec.encode_item(value, &mut local)?;
                trace!(frn, item = codec.id(), written, "encoded item");
            }
        }
    }

    out.write_bytes(local.as_slice())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
