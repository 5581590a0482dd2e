//! FX-extended CAT062 data items: track status, target size and the composed
//! track number.

use serde::{Deserialize, Serialize};

use crate::codec::DataItem;
use crate::cursor::{Cursor, Writer};
use crate::fspec::{DecodeMode, ExtendedOctets, FX};
use crate::items::ItemValue;
use crate::numeric::{check_bits, dequantize, quantize_wrapping};
use crate::types::{hex_bytes, AsterixError, Result};

// ---------------------------------------------------------------------------
// I062/080 Track Status
// ---------------------------------------------------------------------------

/// Longest track status chain in edition 1.18.
pub const TRACK_STATUS_OCTETS: usize = 6;

/// Single-bit flags of I062/080: (name, octet index, mask).
pub const TRACK_STATUS_FLAGS: &[(&str, usize, u8)] = &[
    ("MON", 0, 0x80),
    ("SPI", 0, 0x40),
    ("MRH", 0, 0x20),
    ("CNF", 0, 0x02),
    ("SIM", 1, 0x80),
    ("TSE", 1, 0x40),
    ("TSB", 1, 0x20),
    ("FPC", 1, 0x10),
    ("AFF", 1, 0x08),
    ("STP", 1, 0x04),
    ("KOS", 1, 0x02),
    ("AMA", 2, 0x80),
    ("ME", 2, 0x10),
    ("MI", 2, 0x08),
    ("CST", 3, 0x80),
    ("PSR", 3, 0x40),
    ("SSR", 3, 0x20),
    ("MDS", 3, 0x10),
    ("ADS", 3, 0x08),
    ("SUC", 3, 0x04),
    ("AAC", 3, 0x02),
    ("PFT", 4, 0x04),
    ("FPLT", 4, 0x02),
    ("DUPT", 5, 0x80),
    ("DUPF", 5, 0x40),
    ("DUPM", 5, 0x20),
    ("SFC", 5, 0x10),
    ("IDD", 5, 0x08),
    ("IEC", 5, 0x04),
];

/// Track status octets, kept exactly as received so that spare bits and
/// trailing all-zero extensions survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackStatus {
    #[serde(with = "hex_bytes")]
    pub octets: Vec<u8>,
}

impl Default for TrackStatus {
    fn default() -> Self {
        TrackStatus { octets: vec![0x00] }
    }
}

impl TrackStatus {
    fn octet(&self, index: usize) -> u8 {
        self.octets.get(index).copied().unwrap_or(0)
    }

    /// Value of a named single-bit flag; unknown names read as false.
    pub fn flag(&self, name: &str) -> bool {
        TRACK_STATUS_FLAGS
            .iter()
            .find(|(n, _, _)| *n == name)
            .is_some_and(|&(_, i, mask)| self.octet(i) & mask != 0)
    }

    /// Set or clear a named flag, growing or shrinking the chain to the
    /// shortest form that holds every set bit.
    pub fn set_flag(&mut self, name: &str, on: bool) -> Result<()> {
        let &(_, index, mask) = TRACK_STATUS_FLAGS
            .iter()
            .find(|(n, _, _)| *n == name)
            .ok_or_else(|| AsterixError::invalid("I062/080", format!("unknown flag {name}")))?;
        let mut payload = [0u8; TRACK_STATUS_OCTETS];
        for (i, b) in self.octets.iter().take(TRACK_STATUS_OCTETS).enumerate() {
            payload[i] = *b;
        }
        if on {
            payload[index] |= mask;
        } else {
            payload[index] &= !mask;
        }
        self.octets = ExtendedOctets::from_payload(payload).as_slice().to_vec();
        Ok(())
    }

    /// Source of calculated track altitude (SRC), 0..=7.
    pub fn altitude_source(&self) -> u8 {
        (self.octet(0) >> 2) & 0x07
    }

    /// Mode 4 interrogation status (MD4).
    pub fn mode4(&self) -> u8 {
        (self.octet(2) >> 5) & 0x03
    }

    /// Mode 5 interrogation status (MD5).
    pub fn mode5(&self) -> u8 {
        (self.octet(2) >> 1) & 0x03
    }

    /// ADS-B data source indicator (SDS).
    pub fn ads_source(&self) -> u8 {
        (self.octet(4) >> 6) & 0x03
    }

    /// Emergency status (EMS).
    pub fn emergency(&self) -> u8 {
        (self.octet(4) >> 3) & 0x07
    }

    pub fn set_flags(&self) -> impl Iterator<Item = &'static str> + '_ {
        TRACK_STATUS_FLAGS
            .iter()
            .filter(|&&(_, i, mask)| self.octet(i) & mask != 0)
            .map(|(n, _, _)| *n)
    }
}

pub struct TrackStatusItem;

impl DataItem for TrackStatusItem {
    type Value = TrackStatus;

    fn id(&self) -> &'static str {
        "I062/080"
    }

    fn name(&self) -> &'static str {
        "Track Status"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<TrackStatus> {
        let chain = ExtendedOctets::<TRACK_STATUS_OCTETS>::read(cursor, DecodeMode::Strict)?;
        Ok(TrackStatus {
            octets: chain.as_slice().to_vec(),
        })
    }

    fn encode(&self, value: &TrackStatus, out: &mut Writer) -> Result<()> {
        ExtendedOctets::<TRACK_STATUS_OCTETS>::from_slice(self.id(), &value.octets)?.write(out)
    }

    fn validate(&self, value: &TrackStatus) -> Result<()> {
        ExtendedOctets::<TRACK_STATUS_OCTETS>::from_slice(self.id(), &value.octets).map(|_| ())
    }

    fn describe(&self, value: &TrackStatus) -> String {
        let mut parts: Vec<String> = value.set_flags().map(str::to_string).collect();
        parts.push(format!("SRC={}", value.altitude_source()));
        if value.octets.len() > 4 && value.emergency() != 0 {
            parts.push(format!("EMS={}", value.emergency()));
        }
        parts.join(" ")
    }

    fn wrap(value: TrackStatus) -> ItemValue {
        ItemValue::TrackStatus(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&TrackStatus> {
        match value {
            ItemValue::TrackStatus(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/270 Target Size & Orientation
// ---------------------------------------------------------------------------

/// Orientation LSB: 360/128 degrees.
pub const ORIENTATION_LSB: f64 = 360.0 / 128.0;
const ORIENTATION_STEPS: i64 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSizeOrientation {
    /// Metres, 0..=127.
    pub length_m: u8,
    /// Degrees clockwise from true north.
    pub orientation_deg: Option<f64>,
    /// Metres, 0..=127. Needs an orientation, which precedes it on the wire.
    pub width_m: Option<u8>,
}

pub struct TargetSizeItem;

impl DataItem for TargetSizeItem {
    type Value = TargetSizeOrientation;

    fn id(&self) -> &'static str {
        "I062/270"
    }

    fn name(&self) -> &'static str {
        "Target Size & Orientation"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<TargetSizeOrientation> {
        let chain = ExtendedOctets::<3>::read(cursor, DecodeMode::Strict)?;
        let payload = |i: usize| chain.octet(i) >> 1;
        Ok(TargetSizeOrientation {
            length_m: payload(0),
            orientation_deg: (chain.len() > 1)
                .then(|| dequantize(payload(1) as i64, ORIENTATION_LSB)),
            width_m: (chain.len() > 2).then(|| payload(2)),
        })
    }

    fn encode(&self, value: &TargetSizeOrientation, out: &mut Writer) -> Result<()> {
        let mut octets = vec![value.length_m << 1];
        if let Some(deg) = value.orientation_deg {
            let raw = quantize_wrapping(self.id(), deg, ORIENTATION_LSB, ORIENTATION_STEPS)?;
            octets.push((raw as u8) << 1);
        }
        if let Some(width) = value.width_m {
            octets.push(width << 1);
        }
        let last = octets.len() - 1;
        for b in &mut octets[..last] {
            *b |= FX;
        }
        out.write_bytes(&octets)
    }

    fn validate(&self, value: &TargetSizeOrientation) -> Result<()> {
        check_bits(self.id(), value.length_m as u32, 7)?;
        if let Some(deg) = value.orientation_deg {
            if !(0.0..360.0).contains(&deg) {
                return Err(AsterixError::invalid(
                    self.id(),
                    format!("orientation {deg} outside [0, 360)"),
                ));
            }
        }
        if let Some(width) = value.width_m {
            check_bits(self.id(), width as u32, 7)?;
            if value.orientation_deg.is_none() {
                return Err(AsterixError::invalid(
                    self.id(),
                    "width cannot be sent without orientation",
                ));
            }
        }
        Ok(())
    }

    fn describe(&self, value: &TargetSizeOrientation) -> String {
        let mut s = format!("length {} m", value.length_m);
        if let Some(deg) = value.orientation_deg {
            s.push_str(&format!(", orientation {deg:.1}°"));
        }
        if let Some(width) = value.width_m {
            s.push_str(&format!(", width {width} m"));
        }
        s
    }

    fn wrap(value: TargetSizeOrientation) -> ItemValue {
        ItemValue::TargetSize(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&TargetSizeOrientation> {
        match value {
            ItemValue::TargetSize(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/510 Composed Track Number
// ---------------------------------------------------------------------------

/// Longest composed track number accepted, in 3-octet parts.
pub const MAX_TRACK_NUMBER_PARTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackNumberPart {
    pub system_unit: u8,
    /// 15-bit track number.
    pub track_number: u16,
}

pub struct ComposedTrackNumberItem;

impl DataItem for ComposedTrackNumberItem {
    type Value = Vec<TrackNumberPart>;

    fn id(&self) -> &'static str {
        "I062/510"
    }

    fn name(&self) -> &'static str {
        "Composed Track Number"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<Vec<TrackNumberPart>> {
        let mut parts = Vec::new();
        loop {
            let offset = cursor.position();
            let [unit, hi, lo] = cursor.read_array()?;
            let raw = u16::from_be_bytes([hi, lo]);
            parts.push(TrackNumberPart {
                system_unit: unit,
                track_number: raw >> 1,
            });
            if lo & FX == 0 {
                break;
            }
            if parts.len() == MAX_TRACK_NUMBER_PARTS {
                return Err(AsterixError::UnexpectedExtension {
                    offset: offset + 2,
                    max_octets: MAX_TRACK_NUMBER_PARTS * 3,
                });
            }
        }
        Ok(parts)
    }

    fn encode(&self, value: &Vec<TrackNumberPart>, out: &mut Writer) -> Result<()> {
        let last = value.len().saturating_sub(1);
        for (i, part) in value.iter().enumerate() {
            let mut raw = part.track_number << 1;
            if i < last {
                raw |= FX as u16;
            }
            out.write_u8(part.system_unit)?;
            out.write_u16(raw)?;
        }
        Ok(())
    }

    fn validate(&self, value: &Vec<TrackNumberPart>) -> Result<()> {
        if value.is_empty() {
            return Err(AsterixError::invalid(self.id(), "at least one part required"));
        }
        if value.len() > MAX_TRACK_NUMBER_PARTS {
            return Err(AsterixError::invalid(
                self.id(),
                format!("{} parts, at most {MAX_TRACK_NUMBER_PARTS}", value.len()),
            ));
        }
        for part in value {
            check_bits(self.id(), part.track_number as u32, 15)?;
        }
        Ok(())
    }

    fn describe(&self, value: &Vec<TrackNumberPart>) -> String {
        value
            .iter()
            .map(|p| format!("{}:{}", p.system_unit, p.track_number))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn wrap(value: Vec<TrackNumberPart>) -> ItemValue {
        ItemValue::ComposedTrackNumber(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&Vec<TrackNumberPart>> {
        match value {
            ItemValue::ComposedTrackNumber(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
