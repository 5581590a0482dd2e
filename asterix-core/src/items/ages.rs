//! Update-age compounds I062/290 and I062/295.
//!
//! Both are decoded best-effort: some trackers announce more subfields than
//! they send, so a body cut short by the end of the record keeps the ages
//! read so far.

use serde::{Deserialize, Serialize};

use crate::codec::DataItem;
use crate::compound::{CompoundLayout, Subfield, SubfieldSpec};
use crate::cursor::{Cursor, Writer};
use crate::fspec::DecodeMode;
use crate::items::ItemValue;
use crate::numeric::{dequantize, quantize_unsigned, RangePolicy};
use crate::types::{AsterixError, Result};

/// Age LSB: 1/4 s.
pub const AGE_LSB: f64 = 0.25;

pub const SYSTEM_AGES: usize = 10;
pub const DATA_AGES: usize = 31;

const SYSTEM_TRACK_AGES_LAYOUT: CompoundLayout<2> = CompoundLayout {
    item: "I062/290",
    subfields: &[
        SubfieldSpec::fixed("TRK", 1),
        SubfieldSpec::fixed("PSR", 1),
        SubfieldSpec::fixed("SSR", 1),
        SubfieldSpec::fixed("MDS", 1),
        SubfieldSpec::fixed("ADS", 2),
        SubfieldSpec::fixed("ES", 1),
        SubfieldSpec::fixed("VDL", 1),
        SubfieldSpec::fixed("UAT", 1),
        SubfieldSpec::fixed("LOP", 1),
        SubfieldSpec::fixed("MLT", 1),
    ],
    mode: DecodeMode::BestEffort,
};

const TRACK_DATA_AGES_LAYOUT: CompoundLayout<5> = CompoundLayout {
    item: "I062/295",
    subfields: &[
        SubfieldSpec::fixed("MFL", 1),
        SubfieldSpec::fixed("MD1", 1),
        SubfieldSpec::fixed("MD2", 1),
        SubfieldSpec::fixed("MDA", 1),
        SubfieldSpec::fixed("MD4", 1),
        SubfieldSpec::fixed("MD5", 1),
        SubfieldSpec::fixed("MHG", 1),
        SubfieldSpec::fixed("IAS", 1),
        SubfieldSpec::fixed("TAS", 1),
        SubfieldSpec::fixed("SAL", 1),
        SubfieldSpec::fixed("FSS", 1),
        SubfieldSpec::fixed("TID", 1),
        SubfieldSpec::fixed("COM", 1),
        SubfieldSpec::fixed("SAB", 1),
        SubfieldSpec::fixed("ACS", 1),
        SubfieldSpec::fixed("BVR", 1),
        SubfieldSpec::fixed("GVR", 1),
        SubfieldSpec::fixed("RAN", 1),
        SubfieldSpec::fixed("TAR", 1),
        SubfieldSpec::fixed("TAN", 1),
        SubfieldSpec::fixed("GSP", 1),
        SubfieldSpec::fixed("VUN", 1),
        SubfieldSpec::fixed("MET", 1),
        SubfieldSpec::fixed("EMC", 1),
        SubfieldSpec::fixed("POS", 1),
        SubfieldSpec::fixed("GAL", 1),
        SubfieldSpec::fixed("PUN", 1),
        SubfieldSpec::fixed("MB", 1),
        SubfieldSpec::fixed("IAR", 1),
        SubfieldSpec::fixed("MAC", 1),
        SubfieldSpec::fixed("BPS", 1),
    ],
    mode: DecodeMode::BestEffort,
};

/// I062/290: seconds since the last update from each sensor type.
/// `ages[i]` belongs to subfield position `i + 1` (TRK, PSR, SSR, MDS, ADS,
/// ES, VDL, UAT, LOP, MLT).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemTrackAges {
    pub ages: [Option<f64>; SYSTEM_AGES],
}

/// I062/295: seconds since each derived-data element was last refreshed.
/// `ages[i]` belongs to subfield position `i + 1` (MFL, MD1, ... BPS).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackDataAges {
    pub ages: [Option<f64>; DATA_AGES],
}

macro_rules! named_ages {
    ($ty:ty, $layout:expr) => {
        impl $ty {
            /// Age of the subfield with the given mnemonic.
            pub fn get(&self, name: &str) -> Option<f64> {
                index_of(&$layout, name).and_then(|i| self.ages[i])
            }

            pub fn set(&mut self, name: &str, age: Option<f64>) -> Result<()> {
                let i = index_of(&$layout, name).ok_or_else(|| {
                    AsterixError::invalid($layout.item, format!("unknown subfield {name}"))
                })?;
                self.ages[i] = age;
                Ok(())
            }
        }
    };
}

named_ages!(SystemTrackAges, SYSTEM_TRACK_AGES_LAYOUT);
named_ages!(TrackDataAges, TRACK_DATA_AGES_LAYOUT);

fn index_of<const MAX: usize>(layout: &CompoundLayout<MAX>, name: &str) -> Option<usize> {
    layout.subfields.iter().position(|s| s.name == name)
}

fn decode_ages<const MAX: usize>(
    layout: &CompoundLayout<MAX>,
    cursor: &mut Cursor<'_>,
    ages: &mut [Option<f64>],
) -> Result<()> {
    let body = layout.read(cursor)?;
    for (position, bytes) in body.parts {
        let raw = bytes.iter().fold(0i64, |acc, &b| (acc << 8) | b as i64);
        if let Some(slot) = ages.get_mut(position - 1) {
            *slot = Some(dequantize(raw, AGE_LSB));
        }
    }
    Ok(())
}

fn encode_ages<const MAX: usize>(
    layout: &CompoundLayout<MAX>,
    ages: &[Option<f64>],
    policy: RangePolicy,
    out: &mut Writer,
) -> Result<()> {
    let mut parts = Vec::new();
    for (i, age) in ages.iter().enumerate() {
        let Some(age) = *age else { continue };
        let position = i + 1;
        let width = match layout.spec(position).map(|s| s.layout) {
            Some(Subfield::Fixed(n)) => n,
            _ => {
                return Err(AsterixError::invalid(
                    layout.item,
                    format!("no fixed-width age at position {position}"),
                ))
            }
        };
        let raw = quantize_unsigned(layout.item, age, AGE_LSB, (width * 8) as u32, policy)?;
        parts.push((position, raw.to_be_bytes()[4 - width..].to_vec()));
    }
    layout.write(&parts, out)
}

fn describe_ages<const MAX: usize>(layout: &CompoundLayout<MAX>, ages: &[Option<f64>]) -> String {
    ages.iter()
        .enumerate()
        .filter_map(|(i, age)| age.map(|a| format!("{}={a:.2}s", layout.name_of(i + 1))))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

pub struct SystemTrackAgesItem {
    pub policy: RangePolicy,
}

impl DataItem for SystemTrackAgesItem {
    type Value = SystemTrackAges;

    fn id(&self) -> &'static str {
        SYSTEM_TRACK_AGES_LAYOUT.item
    }

    fn name(&self) -> &'static str {
        "System Track Update Ages"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<SystemTrackAges> {
        let mut value = SystemTrackAges::default();
        decode_ages(&SYSTEM_TRACK_AGES_LAYOUT, cursor, &mut value.ages)?;
        Ok(value)
    }

    fn encode(&self, value: &SystemTrackAges, out: &mut Writer) -> Result<()> {
        encode_ages(&SYSTEM_TRACK_AGES_LAYOUT, &value.ages, self.policy, out)
    }

    fn validate(&self, value: &SystemTrackAges) -> Result<()> {
        encode_ages(&SYSTEM_TRACK_AGES_LAYOUT, &value.ages, self.policy, &mut Writer::new())
    }

    fn describe(&self, value: &SystemTrackAges) -> String {
        describe_ages(&SYSTEM_TRACK_AGES_LAYOUT, &value.ages)
    }

    fn wrap(value: SystemTrackAges) -> ItemValue {
        ItemValue::SystemTrackAges(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&SystemTrackAges> {
        match value {
            ItemValue::SystemTrackAges(v) => Some(v),
            _ => None,
        }
    }
}

pub struct TrackDataAgesItem {
    pub policy: RangePolicy,
}

impl DataItem for TrackDataAgesItem {
    type Value = TrackDataAges;

    fn id(&self) -> &'static str {
        TRACK_DATA_AGES_LAYOUT.item
    }

    fn name(&self) -> &'static str {
        "Track Data Ages"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<TrackDataAges> {
        let mut value = TrackDataAges::default();
        decode_ages(&TRACK_DATA_AGES_LAYOUT, cursor, &mut value.ages)?;
        Ok(value)
    }

    fn encode(&self, value: &TrackDataAges, out: &mut Writer) -> Result<()> {
        encode_ages(&TRACK_DATA_AGES_LAYOUT, &value.ages, self.policy, out)
    }

    fn validate(&self, value: &TrackDataAges) -> Result<()> {
        encode_ages(&TRACK_DATA_AGES_LAYOUT, &value.ages, self.policy, &mut Writer::new())
    }

    fn describe(&self, value: &TrackDataAges) -> String {
        describe_ages(&TRACK_DATA_AGES_LAYOUT, &value.ages)
    }

    fn wrap(value: TrackDataAges) -> ItemValue {
        ItemValue::TrackDataAges(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&TrackDataAges> {
        match value {
            ItemValue::TrackDataAges(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ItemCodec;
    use approx::assert_abs_diff_eq;

    const REJECT: SystemTrackAgesItem = SystemTrackAgesItem {
        policy: RangePolicy::Reject,
    };

    #[test]
    fn test_system_ages_decode() {
        // TRK, ADS present; ADS is two bytes
        let data = [0x88, 0x04, 0x01, 0x00];
        let mut c = Cursor::new(&data);
        let v = REJECT.decode(&mut c).unwrap();
        assert_eq!(c.position(), 4);
        assert_abs_diff_eq!(v.get("TRK").unwrap(), 1.0);
        assert_abs_diff_eq!(v.get("ADS").unwrap(), 64.0);
        assert_eq!(v.get("PSR"), None);
        assert_eq!(REJECT.describe(&v), "TRK=1.00s ADS=64.00s");
    }

    #[test]
    fn test_system_ages_best_effort_truncation() {
        // TRK, PSR, SSR announced; only TRK and PSR bytes present
        let data = [0xE0, 0x02, 0x03];
        let mut c = Cursor::new(&data);
        let v = REJECT.decode(&mut c).unwrap();
        assert_eq!(c.position(), 3);
        assert_abs_diff_eq!(v.ages[0].unwrap(), 0.5);
        assert_abs_diff_eq!(v.ages[1].unwrap(), 0.75);
        assert_eq!(v.ages[2], None);
    }

    #[test]
    fn test_system_ages_best_effort_extension() {
        // FX set on the second (last allowed) octet: ignored
        let data = [0x01, 0x81, 0x08];
        let mut c = Cursor::new(&data);
        let v = REJECT.decode(&mut c).unwrap();
        assert_abs_diff_eq!(v.get("UAT").unwrap(), 2.0);
        assert_eq!(c.position(), 3);
    }

    #[test]
    fn test_system_ages_encode_and_policy() {
        let mut v = SystemTrackAges::default();
        v.set("TRK", Some(1.0)).unwrap();
        v.set("MLT", Some(0.25)).unwrap();
        assert!(v.set("XXX", None).is_err());

        let mut out = Writer::new();
        REJECT.encode(&v, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[0x81, 0x20, 0x04, 0x01]);

        v.set("PSR", Some(100.0)).unwrap();
        assert!(REJECT.validate(&v).is_err());
        let saturate = SystemTrackAgesItem {
            policy: RangePolicy::Saturate,
        };
        let mut out = Writer::new();
        saturate.encode(&v, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[0xC1, 0x20, 0x04, 0xFF, 0x01]);
    }

    #[test]
    fn test_data_ages_last_octet() {
        // BPS is position 31: fifth octet, bit 6
        let data = [0x01, 0x01, 0x01, 0x01, 0x20, 0x28];
        let mut c = Cursor::new(&data);
        let item = TrackDataAgesItem {
            policy: RangePolicy::Reject,
        };
        let v = item.decode(&mut c).unwrap();
        assert_abs_diff_eq!(v.get("BPS").unwrap(), 10.0);

        let codec: &dyn ItemCodec = &item;
        let mut out = Writer::new();
        let n = codec
            .encode_item(&ItemValue::TrackDataAges(v), &mut out)
            .unwrap();
        assert_eq!(n, 6);
        assert_eq!(out.as_slice(), &data);
    }

    #[test]
    fn test_data_ages_truncated_keeps_prefix() {
        // MFL and MD1 announced, buffer ends after MFL
        let data = [0xC0, 0x04];
        let mut c = Cursor::new(&data);
        let item = TrackDataAgesItem {
            policy: RangePolicy::Reject,
        };
        let v = item.decode(&mut c).unwrap();
        assert_abs_diff_eq!(v.get("MFL").unwrap(), 1.0);
        assert_eq!(v.get("MD1"), None);
        assert_eq!(c.position(), 2);
    }
}
