//! I062/340 Measured Information: the last sensor plot used to update the
//! track.

use serde::{Deserialize, Serialize};

use crate::codec::DataItem;
use crate::compound::{CompoundLayout, SubfieldSpec};
use crate::cursor::{Cursor, Writer};
use crate::fspec::DecodeMode;
use crate::items::{DataSourceId, ItemValue};
use crate::numeric::{
    check_bits, check_half_open, dequantize, octal_string, quantize_signed, quantize_unsigned,
    quantize_wrapping, sign_extend, RangePolicy,
};
use crate::types::{AsterixError, Result};

const ITEM: &str = "I062/340";

/// Slant range LSB: 1/256 NM.
pub const RHO_LSB: f64 = 1.0 / 256.0;
/// Azimuth LSB: 360/2^16 degrees.
pub const THETA_LSB: f64 = 360.0 / 65_536.0;
const THETA_STEPS: i64 = 1 << 16;
/// Measured 3-D height LSB: 25 ft.
pub const HEIGHT_LSB: f64 = 25.0;
/// Mode C LSB: 1/4 FL.
pub const MODE_C_LSB: f64 = 0.25;

const SID: usize = 1;
const POS: usize = 2;
const HEI: usize = 3;
const MDC: usize = 4;
const MDA: usize = 5;
const TYP: usize = 6;

const LAYOUT: CompoundLayout<1> = CompoundLayout {
    item: ITEM,
    subfields: &[
        SubfieldSpec::fixed("SID", 2),
        SubfieldSpec::fixed("POS", 4),
        SubfieldSpec::fixed("HEI", 2),
        SubfieldSpec::fixed("MDC", 2),
        SubfieldSpec::fixed("MDA", 2),
        SubfieldSpec::fixed("TYP", 1),
        SubfieldSpec::spare(),
    ],
    mode: DecodeMode::Strict,
};

/// Measured position in polar co-ordinates relative to the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasuredPosition {
    pub rho_nm: f64,
    pub theta_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasuredModeC {
    pub not_validated: bool,
    pub garbled: bool,
    pub flight_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasuredMode3A {
    pub not_validated: bool,
    pub garbled: bool,
    /// Code derived from the local reply rather than the track.
    pub local: bool,
    pub code: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportType {
    /// Detection type, 0..=7.
    pub typ: u8,
    pub simulated: bool,
    /// Report from field monitor (fixed transponder).
    pub rab: bool,
    pub test: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasuredInformation {
    pub sensor: Option<DataSourceId>,
    pub position: Option<MeasuredPosition>,
    /// Feet.
    pub height_ft: Option<f64>,
    pub mode_c: Option<MeasuredModeC>,
    pub mode_3a: Option<MeasuredMode3A>,
    pub report_type: Option<ReportType>,
}

fn be16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

pub struct MeasuredInfoItem;

impl DataItem for MeasuredInfoItem {
    type Value = MeasuredInformation;

    fn id(&self) -> &'static str {
        ITEM
    }

    fn name(&self) -> &'static str {
        "Measured Information"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<MeasuredInformation> {
        let body = LAYOUT.read(cursor)?;
        let mut v = MeasuredInformation::default();

        // Fixed subfields: the layout guarantees each slice's length.
        if let Some(b) = body.get(SID) {
            v.sensor = Some(DataSourceId {
                sac: b[0],
                sic: b[1],
            });
        }
        if let Some(b) = body.get(POS) {
            v.position = Some(MeasuredPosition {
                rho_nm: dequantize(be16(b, 0) as i64, RHO_LSB),
                theta_deg: dequantize(be16(b, 2) as i64, THETA_LSB),
            });
        }
        if let Some(b) = body.get(HEI) {
            let raw = sign_extend(be16(b, 0) as u32, 16);
            v.height_ft = Some(dequantize(raw as i64, HEIGHT_LSB));
        }
        if let Some(b) = body.get(MDC) {
            let raw = be16(b, 0);
            v.mode_c = Some(MeasuredModeC {
                not_validated: raw & 0x8000 != 0,
                garbled: raw & 0x4000 != 0,
                flight_level: dequantize(sign_extend(raw as u32, 14) as i64, MODE_C_LSB),
            });
        }
        if let Some(b) = body.get(MDA) {
            let raw = be16(b, 0);
            v.mode_3a = Some(MeasuredMode3A {
                not_validated: raw & 0x8000 != 0,
                garbled: raw & 0x4000 != 0,
                local: raw & 0x2000 != 0,
                code: raw & 0x0FFF,
            });
        }
        if let Some(b) = body.get(TYP) {
            v.report_type = Some(ReportType {
                typ: b[0] >> 5,
                simulated: b[0] & 0x10 != 0,
                rab: b[0] & 0x08 != 0,
                test: b[0] & 0x04 != 0,
            });
        }
        Ok(v)
    }

    fn encode(&self, value: &MeasuredInformation, out: &mut Writer) -> Result<()> {
        let mut parts: Vec<(usize, Vec<u8>)> = Vec::new();

        if let Some(sid) = value.sensor {
            parts.push((SID, vec![sid.sac, sid.sic]));
        }
        if let Some(pos) = value.position {
            let rho = quantize_unsigned(ITEM, pos.rho_nm, RHO_LSB, 16, RangePolicy::Reject)?;
            let theta = quantize_wrapping(ITEM, pos.theta_deg, THETA_LSB, THETA_STEPS)?;
            let mut b = (rho as u16).to_be_bytes().to_vec();
            b.extend_from_slice(&(theta as u16).to_be_bytes());
            parts.push((POS, b));
        }
        if let Some(height) = value.height_ft {
            let raw = quantize_signed(ITEM, height, HEIGHT_LSB, 16)? as u16;
            parts.push((HEI, raw.to_be_bytes().to_vec()));
        }
        if let Some(mdc) = value.mode_c {
            let mut raw = quantize_signed(ITEM, mdc.flight_level, MODE_C_LSB, 14)? as u16;
            if mdc.not_validated {
                raw |= 0x8000;
            }
            if mdc.garbled {
                raw |= 0x4000;
            }
            parts.push((MDC, raw.to_be_bytes().to_vec()));
        }
        if let Some(mda) = value.mode_3a {
            let mut raw = mda.code & 0x0FFF;
            if mda.not_validated {
                raw |= 0x8000;
            }
            if mda.garbled {
                raw |= 0x4000;
            }
            if mda.local {
                raw |= 0x2000;
            }
            parts.push((MDA, raw.to_be_bytes().to_vec()));
        }
        if let Some(typ) = value.report_type {
            let mut b = (typ.typ & 0x07) << 5;
            if typ.simulated {
                b |= 0x10;
            }
            if typ.rab {
                b |= 0x08;
            }
            if typ.test {
                b |= 0x04;
            }
            parts.push((TYP, vec![b]));
        }

        LAYOUT.write(&parts, out)
    }

    fn validate(&self, value: &MeasuredInformation) -> Result<()> {
        if let Some(pos) = value.position {
            check_half_open(ITEM, pos.rho_nm, 0.0, 256.0)?;
            check_half_open(ITEM, pos.theta_deg, 0.0, 360.0)?;
            quantize_unsigned(ITEM, pos.rho_nm, RHO_LSB, 16, RangePolicy::Reject)?;
        }
        if let Some(height) = value.height_ft {
            quantize_signed(ITEM, height, HEIGHT_LSB, 16)?;
        }
        if let Some(mdc) = value.mode_c {
            quantize_signed(ITEM, mdc.flight_level, MODE_C_LSB, 14)?;
        }
        if let Some(mda) = value.mode_3a {
            check_bits(ITEM, mda.code as u32, 12)?;
        }
        if let Some(typ) = value.report_type {
            if typ.typ > 7 {
                return Err(AsterixError::invalid(ITEM, format!("TYP {} > 7", typ.typ)));
            }
        }
        Ok(())
    }

    fn describe(&self, value: &MeasuredInformation) -> String {
        let mut parts = Vec::new();
        if let Some(sid) = value.sensor {
            parts.push(format!("sensor {}/{}", sid.sac, sid.sic));
        }
        if let Some(pos) = value.position {
            parts.push(format!("{:.2} NM @ {:.2}°", pos.rho_nm, pos.theta_deg));
        }
        if let Some(h) = value.height_ft {
            parts.push(format!("height {h:.0} ft"));
        }
        if let Some(mdc) = value.mode_c {
            parts.push(format!("FL{:.2}", mdc.flight_level));
        }
        if let Some(mda) = value.mode_3a {
            parts.push(format!("A{}", octal_string(mda.code)));
        }
        if let Some(typ) = value.report_type {
            parts.push(format!("TYP={}", typ.typ));
        }
        parts.join(", ")
    }

    fn wrap(value: MeasuredInformation) -> ItemValue {
        ItemValue::MeasuredInfo(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&MeasuredInformation> {
        match value {
            ItemValue::MeasuredInfo(v) => Some(v),
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
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_decode_all_subfields() {
        let data = [
            0xFC, // SID POS HEI MDC MDA TYP
            0x19, 0x0A, // SID
            0x0A, 0x00, 0x40, 0x00, // rho 10 NM, theta 90°
            0x01, 0x90, // 400 * 25 ft
            0xC1, 0x90, // not validated, garbled, FL100
            0x2F, 0xC0, // local, 7700
            0x54, // TYP 2, SIM, TST
        ];
        let mut c = Cursor::new(&data);
        let v = MeasuredInfoItem.decode(&mut c).unwrap();
        assert_eq!(c.position(), data.len());

        assert_eq!(v.sensor, Some(DataSourceId { sac: 25, sic: 10 }));
        let pos = v.position.unwrap();
        assert_abs_diff_eq!(pos.rho_nm, 10.0);
        assert_abs_diff_eq!(pos.theta_deg, 90.0);
        assert_abs_diff_eq!(v.height_ft.unwrap(), 10_000.0);
        let mdc = v.mode_c.unwrap();
        assert!(mdc.not_validated && mdc.garbled);
        assert_abs_diff_eq!(mdc.flight_level, 100.0);
        let mda = v.mode_3a.unwrap();
        assert!(mda.local && !mda.garbled);
        assert_eq!(mda.code, 0o7700);
        let typ = v.report_type.unwrap();
        assert_eq!(typ.typ, 2);
        assert!(typ.simulated && typ.test && !typ.rab);

        let mut out = Writer::new();
        MeasuredInfoItem.encode(&v, &mut out).unwrap();
        assert_eq!(out.as_slice(), &data);
    }

    #[test]
    fn test_negative_mode_c() {
        // FL -1.25: 14-bit two's complement of -5
        let data = [0x10, 0x3F, 0xFB];
        let mut c = Cursor::new(&data);
        let v = MeasuredInfoItem.decode(&mut c).unwrap();
        assert_abs_diff_eq!(v.mode_c.unwrap().flight_level, -1.25);
    }

    #[test]
    fn test_truncated_subfield_is_underrun() {
        let data = [0x40, 0x0A, 0x00, 0x40];
        let mut c = Cursor::new(&data);
        assert!(matches!(
            MeasuredInfoItem.decode(&mut c),
            Err(AsterixError::Underrun { .. })
        ));
    }

    #[test]
    fn test_empty_and_validation() {
        let v = MeasuredInformation::default();
        let mut out = Writer::new();
        MeasuredInfoItem.encode(&v, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[0x00]);

        let v = MeasuredInformation {
            position: Some(MeasuredPosition {
                rho_nm: 10.0,
                theta_deg: 360.0,
            }),
            ..Default::default()
        };
        assert!(MeasuredInfoItem.validate(&v).is_err());

        let v = MeasuredInformation {
            mode_c: Some(MeasuredModeC {
                not_validated: false,
                garbled: false,
                flight_level: 2048.0,
            }),
            ..Default::default()
        };
        assert!(MeasuredInfoItem.validate(&v).is_err());
    }

    #[test]
    fn test_azimuth_just_below_north_wraps() {
        let v = MeasuredInformation {
            position: Some(MeasuredPosition {
                rho_nm: 1.0,
                theta_deg: 359.999,
            }),
            ..Default::default()
        };
        MeasuredInfoItem.validate(&v).unwrap();
        let mut out = Writer::new();
        MeasuredInfoItem.encode(&v, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[0x40, 0x01, 0x00, 0x00, 0x00]);

        let mut c = Cursor::new(out.as_slice());
        let back = MeasuredInfoItem.decode(&mut c).unwrap();
        let pos = back.position.unwrap();
        assert_abs_diff_eq!(pos.rho_nm, 1.0);
        assert_abs_diff_eq!(pos.theta_deg, 0.0);
        MeasuredInfoItem.validate(&back).unwrap();
    }
}
