//! Items carried as verbatim bytes: the large compounds whose subfields are
//! not interpreted (I062/110, I062/380, I062/390) and the explicit-length
//! RE/SP fields.

use serde::{Deserialize, Serialize};

use crate::codec::DataItem;
use crate::compound::{CompoundLayout, SubfieldSpec};
use crate::cursor::{Cursor, Writer};
use crate::fspec::DecodeMode;
use crate::items::ItemValue;
use crate::types::{hex_bytes, hex_encode, AsterixError, Result};

// ---------------------------------------------------------------------------
// Raw compounds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSubfield {
    /// 1-based presence position inside the compound.
    pub position: u8,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

/// Subfields of a compound item, each kept exactly as it appeared on the
/// wire (repetition counts and FX bits included).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundData {
    pub subfields: Vec<RawSubfield>,
}

impl CompoundData {
    pub fn get(&self, position: u8) -> Option<&[u8]> {
        self.subfields
            .iter()
            .find(|s| s.position == position)
            .map(|s| s.bytes.as_slice())
    }
}

pub const MODE5_LAYOUT: CompoundLayout<1> = CompoundLayout {
    item: "I062/110",
    subfields: &[
        SubfieldSpec::fixed("SUM", 1),
        SubfieldSpec::fixed("PMN", 4),
        SubfieldSpec::fixed("POS", 6),
        SubfieldSpec::fixed("GA", 2),
        SubfieldSpec::fixed("EM1", 2),
        SubfieldSpec::fixed("TOS", 1),
        SubfieldSpec::fixed("XP", 1),
    ],
    mode: DecodeMode::Strict,
};

pub const AIRCRAFT_DERIVED_LAYOUT: CompoundLayout<4> = CompoundLayout {
    item: "I062/380",
    subfields: &[
        SubfieldSpec::fixed("ADR", 3),
        SubfieldSpec::fixed("ID", 6),
        SubfieldSpec::fixed("MHG", 2),
        SubfieldSpec::fixed("IAS", 2),
        SubfieldSpec::fixed("TAS", 2),
        SubfieldSpec::fixed("SAL", 2),
        SubfieldSpec::fixed("FSS", 2),
        SubfieldSpec::extended("TIS", 4),
        SubfieldSpec::repetitive("TID", 15),
        SubfieldSpec::fixed("COM", 2),
        SubfieldSpec::fixed("SAB", 2),
        SubfieldSpec::fixed("ACS", 7),
        SubfieldSpec::fixed("BVR", 2),
        SubfieldSpec::fixed("GVR", 2),
        SubfieldSpec::fixed("RAN", 2),
        SubfieldSpec::fixed("TAR", 2),
        SubfieldSpec::fixed("TAN", 2),
        SubfieldSpec::fixed("GSP", 2),
        SubfieldSpec::fixed("VUN", 1),
        SubfieldSpec::fixed("MET", 8),
        SubfieldSpec::fixed("EMC", 1),
        SubfieldSpec::fixed("POS", 6),
        SubfieldSpec::fixed("GAL", 2),
        SubfieldSpec::fixed("PUN", 1),
        SubfieldSpec::repetitive("MB", 8),
        SubfieldSpec::fixed("IAR", 2),
        SubfieldSpec::fixed("MAC", 2),
        SubfieldSpec::fixed("BPS", 2),
    ],
    mode: DecodeMode::Strict,
};

pub const FLIGHT_PLAN_LAYOUT: CompoundLayout<3> = CompoundLayout {
    item: "I062/390",
    subfields: &[
        SubfieldSpec::fixed("TAG", 2),
        SubfieldSpec::fixed("CSN", 7),
        SubfieldSpec::fixed("IFI", 4),
        SubfieldSpec::fixed("FCT", 1),
        SubfieldSpec::fixed("TAC", 4),
        SubfieldSpec::fixed("WTC", 1),
        SubfieldSpec::fixed("DEP", 4),
        SubfieldSpec::fixed("DST", 4),
        SubfieldSpec::fixed("RDS", 3),
        SubfieldSpec::fixed("CFL", 2),
        SubfieldSpec::fixed("CTL", 2),
        SubfieldSpec::repetitive("TOD", 4),
        SubfieldSpec::fixed("AST", 6),
        SubfieldSpec::fixed("STS", 1),
        SubfieldSpec::fixed("STD", 7),
        SubfieldSpec::fixed("STA", 7),
        SubfieldSpec::fixed("PEM", 2),
        SubfieldSpec::fixed("PEC", 7),
        SubfieldSpec::spare(),
        SubfieldSpec::spare(),
        SubfieldSpec::spare(),
    ],
    mode: DecodeMode::Strict,
};

/// Compound item decoded into verbatim subfields.
pub struct RawCompoundItem<const MAX: usize> {
    pub name: &'static str,
    pub layout: CompoundLayout<MAX>,
}

impl<const MAX: usize> RawCompoundItem<MAX> {
    fn parts<'v>(&self, value: &'v CompoundData) -> Vec<(usize, &'v [u8])> {
        value
            .subfields
            .iter()
            .map(|s| (s.position as usize, s.bytes.as_slice()))
            .collect()
    }
}

pub const MODE5_ITEM: RawCompoundItem<1> = RawCompoundItem {
    name: "Mode 5 Data reports & Extended Mode 1 Code",
    layout: MODE5_LAYOUT,
};

pub const AIRCRAFT_DERIVED_ITEM: RawCompoundItem<4> = RawCompoundItem {
    name: "Aircraft Derived Data",
    layout: AIRCRAFT_DERIVED_LAYOUT,
};

pub const FLIGHT_PLAN_ITEM: RawCompoundItem<3> = RawCompoundItem {
    name: "Flight Plan Related Data",
    layout: FLIGHT_PLAN_LAYOUT,
};

impl<const MAX: usize> DataItem for RawCompoundItem<MAX> {
    type Value = CompoundData;

    fn id(&self) -> &'static str {
        self.layout.item
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<CompoundData> {
        let body = self.layout.read(cursor)?;
        Ok(CompoundData {
            subfields: body
                .parts
                .into_iter()
                .map(|(position, bytes)| RawSubfield {
                    position: position as u8,
                    bytes: bytes.to_vec(),
                })
                .collect(),
        })
    }

    fn encode(&self, value: &CompoundData, out: &mut Writer) -> Result<()> {
        self.layout.write(&self.parts(value), out)
    }

    fn validate(&self, value: &CompoundData) -> Result<()> {
        self.layout.write(&self.parts(value), &mut Writer::new())
    }

    fn describe(&self, value: &CompoundData) -> String {
        value
            .subfields
            .iter()
            .map(|s| {
                format!(
                    "{}={}",
                    self.layout.name_of(s.position as usize),
                    hex_encode(&s.bytes)
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn wrap(value: CompoundData) -> ItemValue {
        ItemValue::Compound(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&CompoundData> {
        match value {
            ItemValue::Compound(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Explicit-length items (RE, SP)
// ---------------------------------------------------------------------------

/// Largest payload an explicit item can carry: the length octet counts
/// itself.
pub const MAX_EXPLICIT_PAYLOAD: usize = u8::MAX as usize - 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitData {
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
}

pub struct ExplicitItem {
    pub id: &'static str,
    pub name: &'static str,
}

pub const RESERVED_EXPANSION_ITEM: ExplicitItem = ExplicitItem {
    id: "I062/RE",
    name: "Reserved Expansion Field",
};

pub const SPECIAL_PURPOSE_ITEM: ExplicitItem = ExplicitItem {
    id: "I062/SP",
    name: "Special Purpose Field",
};

impl DataItem for ExplicitItem {
    type Value = ExplicitData;

    fn id(&self) -> &'static str {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<ExplicitData> {
        let len = cursor.peek_u8()? as usize;
        if len == 0 {
            return Err(AsterixError::invalid(self.id, "length octet is zero"));
        }
        let bytes = cursor.read(len)?;
        Ok(ExplicitData {
            payload: bytes[1..].to_vec(),
        })
    }

    fn encode(&self, value: &ExplicitData, out: &mut Writer) -> Result<()> {
        self.validate(value)?;
        out.write_u8(value.payload.len() as u8 + 1)?;
        out.write_bytes(&value.payload)
    }

    fn validate(&self, value: &ExplicitData) -> Result<()> {
        if value.payload.len() > MAX_EXPLICIT_PAYLOAD {
            return Err(AsterixError::TooLarge {
                len: value.payload.len(),
                max: MAX_EXPLICIT_PAYLOAD,
            });
        }
        Ok(())
    }

    fn describe(&self, value: &ExplicitData) -> String {
        format!("{} bytes: {}", value.payload.len(), hex_encode(&value.payload))
    }

    fn wrap(value: ExplicitData) -> ItemValue {
        ItemValue::Explicit(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&ExplicitData> {
        match value {
            ItemValue::Explicit(v) => Some(v),
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
    use crate::types::hex_decode;

    #[test]
    fn test_aircraft_derived_with_repetitions() {
        // ADR present, TID with one 15-byte record, MB with zero records
        let mut data = vec![0x81, 0x41, 0x01, 0x10];
        data.extend_from_slice(&[0x4C, 0xA1, 0xF3]);
        data.push(0x01);
        data.extend_from_slice(&[0xAB; 15]);
        data.push(0x00);

        let mut c = Cursor::new(&data);
        let v = AIRCRAFT_DERIVED_ITEM.decode(&mut c).unwrap();
        assert_eq!(c.position(), data.len());
        assert_eq!(v.subfields.len(), 3);
        assert_eq!(v.get(1), Some(&[0x4C, 0xA1, 0xF3][..]));
        assert_eq!(v.get(9).map(<[u8]>::len), Some(16));
        assert_eq!(v.get(25), Some(&[0x00][..]));

        let mut out = Writer::new();
        AIRCRAFT_DERIVED_ITEM.encode(&v, &mut out).unwrap();
        assert_eq!(out.as_slice(), &data[..]);
    }

    #[test]
    fn test_raw_compound_rejects_bad_part() {
        let v = CompoundData {
            subfields: vec![RawSubfield {
                position: 1,
                bytes: vec![0x4C, 0xA1],
            }],
        };
        assert!(AIRCRAFT_DERIVED_ITEM.validate(&v).is_err());

        let v = CompoundData {
            subfields: vec![RawSubfield {
                position: 20,
                bytes: vec![0x00],
            }],
        };
        assert!(FLIGHT_PLAN_ITEM.validate(&v).is_err());
    }

    #[test]
    fn test_flight_plan_callsign() {
        let data = hex_decode("40 4B4C4D31303233").unwrap();
        let mut c = Cursor::new(&data);
        let v = FLIGHT_PLAN_ITEM.decode(&mut c).unwrap();
        assert_eq!(v.get(2), Some(&b"KLM1023"[..]));
        assert_eq!(FLIGHT_PLAN_ITEM.describe(&v), "CSN=4B4C4D31303233");
    }

    #[test]
    fn test_mode5_truncated() {
        let data = [0x40, 0x01, 0x02];
        let mut c = Cursor::new(&data);
        assert!(matches!(
            MODE5_ITEM.decode(&mut c),
            Err(AsterixError::Underrun { .. })
        ));
    }

    #[test]
    fn test_explicit_item() {
        let data = [0x04, 0xDE, 0xAD, 0xBE, 0xEF];
        let mut c = Cursor::new(&data);
        let v = SPECIAL_PURPOSE_ITEM.decode(&mut c).unwrap();
        assert_eq!(v.payload, vec![0xDE, 0xAD, 0xBE]);
        assert_eq!(c.position(), 4);

        let mut out = Writer::new();
        SPECIAL_PURPOSE_ITEM.encode(&v, &mut out).unwrap();
        assert_eq!(out.as_slice(), &data[..4]);

        let mut c = Cursor::new(&[0x01]);
        let empty = RESERVED_EXPANSION_ITEM.decode(&mut c).unwrap();
        assert!(empty.payload.is_empty());
    }

    #[test]
    fn test_explicit_item_limits() {
        let mut c = Cursor::new(&[0x00, 0x01]);
        assert!(matches!(
            SPECIAL_PURPOSE_ITEM.decode(&mut c),
            Err(AsterixError::InvalidValue { .. })
        ));

        let mut c = Cursor::new(&[0x05, 0x01]);
        assert!(matches!(
            SPECIAL_PURPOSE_ITEM.decode(&mut c),
            Err(AsterixError::Underrun { .. })
        ));

        let big = ExplicitData {
            payload: vec![0; 255],
        };
        assert!(matches!(
            SPECIAL_PURPOSE_ITEM.validate(&big),
            Err(AsterixError::TooLarge { len: 255, max: 254 })
        ));
        let max = ExplicitData {
            payload: vec![0; 254],
        };
        let mut out = Writer::new();
        SPECIAL_PURPOSE_ITEM.encode(&max, &mut out).unwrap();
        assert_eq!(out.as_slice()[0], 0xFF);
        assert_eq!(out.len(), 255);
    }
}
