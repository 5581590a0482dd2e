//! I062/500 Estimated Accuracies.

use serde::{Deserialize, Serialize};

use crate::codec::DataItem;
use crate::compound::{CompoundLayout, SubfieldSpec};
use crate::cursor::{Cursor, Writer};
use crate::fspec::DecodeMode;
use crate::items::ItemValue;
use crate::numeric::{dequantize, quantize_signed, quantize_unsigned, sign_extend, RangePolicy};
use crate::types::Result;

const ITEM: &str = "I062/500";

const APC: usize = 1;
const COV: usize = 2;
const APW: usize = 3;
const AGA: usize = 4;
const ABA: usize = 5;
const ATV: usize = 6;
const AA: usize = 7;
const ARC: usize = 8;

const LAYOUT: CompoundLayout<2> = CompoundLayout {
    item: ITEM,
    subfields: &[
        SubfieldSpec::fixed("APC", 4),
        SubfieldSpec::fixed("COV", 2),
        SubfieldSpec::fixed("APW", 4),
        SubfieldSpec::fixed("AGA", 1),
        SubfieldSpec::fixed("ABA", 1),
        SubfieldSpec::fixed("ATV", 2),
        SubfieldSpec::fixed("AA", 2),
        SubfieldSpec::fixed("ARC", 1),
    ],
    mode: DecodeMode::Strict,
};

pub const CARTESIAN_LSB: f64 = 0.5;
pub const WGS84_LSB: f64 = 180.0 / 33_554_432.0;
pub const ALTITUDE_LSB: f64 = 6.25;
pub const FLIGHT_LEVEL_LSB: f64 = 0.25;
pub const VELOCITY_LSB: f64 = 0.25;
pub const ACCELERATION_LSB: f64 = 0.25;
pub const RATE_OF_CLIMB_LSB: f64 = 6.25;

/// Standard deviations of the track estimates. All but the XY covariance are
/// unsigned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimatedAccuracies {
    /// Cartesian position (x, y) in metres.
    pub position_xy: Option<(f64, f64)>,
    /// XY covariance in metres, signed.
    pub covariance_xy: Option<f64>,
    /// WGS-84 position (latitude, longitude) in degrees.
    pub position_wgs84: Option<(f64, f64)>,
    /// Geometric altitude, feet.
    pub geometric_altitude: Option<f64>,
    /// Barometric altitude, flight levels.
    pub barometric_altitude: Option<f64>,
    /// Velocity (x, y) in m/s.
    pub velocity: Option<(f64, f64)>,
    /// Acceleration (x, y) in m/s².
    pub acceleration: Option<(f64, f64)>,
    /// Rate of climb/descent, ft/min.
    pub rate_of_climb: Option<f64>,
}

fn unsigned(bytes: &[u8], lsb: f64) -> f64 {
    let raw = bytes.iter().fold(0i64, |acc, &b| (acc << 8) | b as i64);
    dequantize(raw, lsb)
}

fn pair(bytes: &[u8], lsb: f64) -> (f64, f64) {
    let half = bytes.len() / 2;
    (unsigned(&bytes[..half], lsb), unsigned(&bytes[half..], lsb))
}

pub struct AccuraciesItem {
    pub policy: RangePolicy,
}

impl AccuraciesItem {
    fn field(&self, value: f64, lsb: f64, octets: usize) -> Result<Vec<u8>> {
        let raw = quantize_unsigned(ITEM, value, lsb, (octets * 8) as u32, self.policy)?;
        Ok(raw.to_be_bytes()[4 - octets..].to_vec())
    }

    fn pair(&self, (a, b): (f64, f64), lsb: f64, octets: usize) -> Result<Vec<u8>> {
        let mut out = self.field(a, lsb, octets)?;
        out.extend(self.field(b, lsb, octets)?);
        Ok(out)
    }

    fn parts(&self, value: &EstimatedAccuracies) -> Result<Vec<(usize, Vec<u8>)>> {
        let mut parts = Vec::new();
        if let Some(p) = value.position_xy {
            parts.push((APC, self.pair(p, CARTESIAN_LSB, 2)?));
        }
        if let Some(cov) = value.covariance_xy {
            let raw = quantize_signed(ITEM, cov, CARTESIAN_LSB, 16)? as u16;
            parts.push((COV, raw.to_be_bytes().to_vec()));
        }
        if let Some(p) = value.position_wgs84 {
            parts.push((APW, self.pair(p, WGS84_LSB, 2)?));
        }
        if let Some(a) = value.geometric_altitude {
            parts.push((AGA, self.field(a, ALTITUDE_LSB, 1)?));
        }
        if let Some(a) = value.barometric_altitude {
            parts.push((ABA, self.field(a, FLIGHT_LEVEL_LSB, 1)?));
        }
        if let Some(v) = value.velocity {
            parts.push((ATV, self.pair(v, VELOCITY_LSB, 1)?));
        }
        if let Some(a) = value.acceleration {
            parts.push((AA, self.pair(a, ACCELERATION_LSB, 1)?));
        }
        if let Some(r) = value.rate_of_climb {
            parts.push((ARC, self.field(r, RATE_OF_CLIMB_LSB, 1)?));
        }
        Ok(parts)
    }
}

impl DataItem for AccuraciesItem {
    type Value = EstimatedAccuracies;

    fn id(&self) -> &'static str {
        ITEM
    }

    fn name(&self) -> &'static str {
        "Estimated Accuracies"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<EstimatedAccuracies> {
        let body = LAYOUT.read(cursor)?;
        Ok(EstimatedAccuracies {
            position_xy: body.get(APC).map(|b| pair(b, CARTESIAN_LSB)),
            covariance_xy: body.get(COV).map(|b| {
                let raw = sign_extend(u16::from_be_bytes([b[0], b[1]]) as u32, 16);
                dequantize(raw as i64, CARTESIAN_LSB)
            }),
            position_wgs84: body.get(APW).map(|b| pair(b, WGS84_LSB)),
            geometric_altitude: body.get(AGA).map(|b| unsigned(b, ALTITUDE_LSB)),
            barometric_altitude: body.get(ABA).map(|b| unsigned(b, FLIGHT_LEVEL_LSB)),
            velocity: body.get(ATV).map(|b| pair(b, VELOCITY_LSB)),
            acceleration: body.get(AA).map(|b| pair(b, ACCELERATION_LSB)),
            rate_of_climb: body.get(ARC).map(|b| unsigned(b, RATE_OF_CLIMB_LSB)),
        })
    }

    fn encode(&self, value: &EstimatedAccuracies, out: &mut Writer) -> Result<()> {
        LAYOUT.write(&self.parts(value)?, out)
    }

    fn validate(&self, value: &EstimatedAccuracies) -> Result<()> {
        self.parts(value).map(|_| ())
    }

    fn describe(&self, value: &EstimatedAccuracies) -> String {
        let mut s = Vec::new();
        if let Some((x, y)) = value.position_xy {
            s.push(format!("pos σ {x:.1}/{y:.1} m"));
        }
        if let Some(c) = value.covariance_xy {
            s.push(format!("cov {c:.1} m"));
        }
        if let Some((lat, lon)) = value.position_wgs84 {
            s.push(format!("wgs σ {lat:.6}/{lon:.6}°"));
        }
        if let Some(a) = value.geometric_altitude {
            s.push(format!("alt σ {a:.2} ft"));
        }
        if let Some(a) = value.barometric_altitude {
            s.push(format!("FL σ {a:.2}"));
        }
        if let Some((x, y)) = value.velocity {
            s.push(format!("vel σ {x:.2}/{y:.2} m/s"));
        }
        if let Some((x, y)) = value.acceleration {
            s.push(format!("acc σ {x:.2}/{y:.2} m/s²"));
        }
        if let Some(r) = value.rate_of_climb {
            s.push(format!("roc σ {r:.2} ft/min"));
        }
        s.join(", ")
    }

    fn wrap(value: EstimatedAccuracies) -> ItemValue {
        ItemValue::Accuracies(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&EstimatedAccuracies> {
        match value {
            ItemValue::Accuracies(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
