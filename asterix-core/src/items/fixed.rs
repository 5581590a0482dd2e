//! Fixed-length CAT062 data items.
//!
//! Layout, LSB and range of each item follow CAT062 edition 1.18.

use serde::{Deserialize, Serialize};

use crate::codec::DataItem;
use crate::cursor::{Cursor, Writer};
use crate::items::ItemValue;
use crate::numeric::{
    check_bits, check_half_open, check_range, dequantize, octal_string, quantize_signed,
    quantize_wrapping, sign_extend,
};
use crate::types::{icao_char, icao_code, AsterixError, Result};

/// Latitude/longitude LSB of I062/105: 180 / 2^25 degrees.
pub const WGS84_LSB: f64 = 180.0 / 33_554_432.0;
/// Time of track LSB: 1/128 s.
pub const TIME_LSB: f64 = 1.0 / 128.0;
/// Seconds in a day; time of track wraps at midnight.
pub const SECONDS_PER_DAY: f64 = 86_400.0;
const TIME_STEPS_PER_DAY: i64 = 86_400 * 128;
pub const CARTESIAN_POSITION_LSB: f64 = 0.5;
pub const VELOCITY_LSB: f64 = 0.25;
pub const ACCELERATION_LSB: f64 = 0.25;
pub const FLIGHT_LEVEL_LSB: f64 = 0.25;
pub const ALTITUDE_LSB: f64 = 6.25;
pub const RATE_OF_CLIMB_LSB: f64 = 6.25;

const MIN_FLIGHT_LEVEL: f64 = -15.0;
const MAX_FLIGHT_LEVEL: f64 = 1500.0;

/// Target identification length in characters.
pub const CALLSIGN_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// System Area Code / System Identification Code pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceId {
    pub sac: u8,
    pub sic: u8,
}

/// Calculated position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wgs84Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// Calculated position in metres relative to the system reference point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartesianPosition {
    pub x: f64,
    pub y: f64,
}

/// Velocity components in m/s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartesianVelocity {
    pub vx: f64,
    pub vy: f64,
}

/// Acceleration components in m/s².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartesianAcceleration {
    pub ax: f64,
    pub ay: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mode3ACode {
    /// 12-bit code, conventionally shown as four octal digits.
    pub code: u16,
    /// Code changed since the previous update.
    pub changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mode2Code {
    pub code: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetIdentification {
    /// Source of the identification (STI), 0..=3.
    pub source: u8,
    /// Up to 8 characters, trailing spaces removed. 6-bit codes with no ICAO
    /// character decode as `#`, which does not re-encode; such a value only
    /// round-trips through raw replay.
    pub callsign: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeOfMovement {
    pub transversal: u8,
    pub longitudinal: u8,
    pub vertical: u8,
    pub altitude_discrepancy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarometricAltitude {
    pub qnh_corrected: bool,
    pub flight_level: f64,
}

// ---------------------------------------------------------------------------
// I062/010 Data Source Identifier
// ---------------------------------------------------------------------------

pub struct DataSourceItem;

impl DataItem for DataSourceItem {
    type Value = DataSourceId;

    fn id(&self) -> &'static str {
        "I062/010"
    }

    fn name(&self) -> &'static str {
        "Data Source Identifier"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<DataSourceId> {
        let [sac, sic] = cursor.read_array()?;
        Ok(DataSourceId { sac, sic })
    }

    fn encode(&self, value: &DataSourceId, out: &mut Writer) -> Result<()> {
        out.write_bytes(&[value.sac, value.sic])
    }

    fn describe(&self, value: &DataSourceId) -> String {
        format!("SAC={} SIC={}", value.sac, value.sic)
    }

    fn wrap(value: DataSourceId) -> ItemValue {
        ItemValue::DataSource(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&DataSourceId> {
        match value {
            ItemValue::DataSource(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/015 Service Identification
// ---------------------------------------------------------------------------

pub struct ServiceIdItem;

impl DataItem for ServiceIdItem {
    type Value = u8;

    fn id(&self) -> &'static str {
        "I062/015"
    }

    fn name(&self) -> &'static str {
        "Service Identification"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<u8> {
        cursor.read_u8()
    }

    fn encode(&self, value: &u8, out: &mut Writer) -> Result<()> {
        out.write_u8(*value)
    }

    fn describe(&self, value: &u8) -> String {
        format!("service {value}")
    }

    fn wrap(value: u8) -> ItemValue {
        ItemValue::ServiceId(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&u8> {
        match value {
            ItemValue::ServiceId(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/070 Time Of Track Information
// ---------------------------------------------------------------------------

pub struct TimeOfTrackItem;

impl DataItem for TimeOfTrackItem {
    type Value = f64;

    fn id(&self) -> &'static str {
        "I062/070"
    }

    fn name(&self) -> &'static str {
        "Time Of Track Information"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<f64> {
        Ok(dequantize(cursor.read_u24()? as i64, TIME_LSB))
    }

    fn encode(&self, value: &f64, out: &mut Writer) -> Result<()> {
        let raw = quantize_wrapping(self.id(), *value, TIME_LSB, TIME_STEPS_PER_DAY)?;
        out.write_u24(raw)
    }

    fn validate(&self, value: &f64) -> Result<()> {
        check_half_open(self.id(), *value, 0.0, SECONDS_PER_DAY)
    }

    fn describe(&self, value: &f64) -> String {
        let total = *value;
        let h = (total / 3600.0).floor();
        let m = ((total - h * 3600.0) / 60.0).floor();
        let s = total - h * 3600.0 - m * 60.0;
        format!("{h:02}:{m:02}:{s:06.3}")
    }

    fn wrap(value: f64) -> ItemValue {
        ItemValue::TimeOfTrack(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&f64> {
        match value {
            ItemValue::TimeOfTrack(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/105 Calculated Position In WGS-84 Co-ordinates
// ---------------------------------------------------------------------------

pub struct Wgs84PositionItem;

impl DataItem for Wgs84PositionItem {
    type Value = Wgs84Position;

    fn id(&self) -> &'static str {
        "I062/105"
    }

    fn name(&self) -> &'static str {
        "Calculated Position In WGS-84 Co-ordinates"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<Wgs84Position> {
        let lat = sign_extend(cursor.read_u32()?, 32);
        let lon = sign_extend(cursor.read_u32()?, 32);
        Ok(Wgs84Position {
            latitude: dequantize(lat as i64, WGS84_LSB),
            longitude: dequantize(lon as i64, WGS84_LSB),
        })
    }

    fn encode(&self, value: &Wgs84Position, out: &mut Writer) -> Result<()> {
        out.write_u32(quantize_signed(self.id(), value.latitude, WGS84_LSB, 32)?)?;
        out.write_u32(quantize_signed(self.id(), value.longitude, WGS84_LSB, 32)?)
    }

    fn validate(&self, value: &Wgs84Position) -> Result<()> {
        check_range(self.id(), value.latitude, -90.0, 90.0)?;
        check_half_open(self.id(), value.longitude, -180.0, 180.0)
    }

    fn describe(&self, value: &Wgs84Position) -> String {
        format!("lat={:.5} lon={:.5}", value.latitude, value.longitude)
    }

    fn wrap(value: Wgs84Position) -> ItemValue {
        ItemValue::PositionWgs84(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&Wgs84Position> {
        match value {
            ItemValue::PositionWgs84(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/100 Calculated Track Position (Cartesian)
// ---------------------------------------------------------------------------

pub struct CartesianPositionItem;

impl DataItem for CartesianPositionItem {
    type Value = CartesianPosition;

    fn id(&self) -> &'static str {
        "I062/100"
    }

    fn name(&self) -> &'static str {
        "Calculated Track Position (Cartesian)"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<CartesianPosition> {
        let x = sign_extend(cursor.read_u24()?, 24);
        let y = sign_extend(cursor.read_u24()?, 24);
        Ok(CartesianPosition {
            x: dequantize(x as i64, CARTESIAN_POSITION_LSB),
            y: dequantize(y as i64, CARTESIAN_POSITION_LSB),
        })
    }

    fn encode(&self, value: &CartesianPosition, out: &mut Writer) -> Result<()> {
        out.write_u24(quantize_signed(self.id(), value.x, CARTESIAN_POSITION_LSB, 24)?)?;
        out.write_u24(quantize_signed(self.id(), value.y, CARTESIAN_POSITION_LSB, 24)?)
    }

    fn validate(&self, value: &CartesianPosition) -> Result<()> {
        quantize_signed(self.id(), value.x, CARTESIAN_POSITION_LSB, 24)?;
        quantize_signed(self.id(), value.y, CARTESIAN_POSITION_LSB, 24)?;
        Ok(())
    }

    fn describe(&self, value: &CartesianPosition) -> String {
        format!("x={:.1} m y={:.1} m", value.x, value.y)
    }

    fn wrap(value: CartesianPosition) -> ItemValue {
        ItemValue::PositionCartesian(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&CartesianPosition> {
        match value {
            ItemValue::PositionCartesian(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/185 Calculated Track Velocity (Cartesian)
// ---------------------------------------------------------------------------

pub struct VelocityItem;

impl DataItem for VelocityItem {
    type Value = CartesianVelocity;

    fn id(&self) -> &'static str {
        "I062/185"
    }

    fn name(&self) -> &'static str {
        "Calculated Track Velocity (Cartesian)"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<CartesianVelocity> {
        let vx = sign_extend(cursor.read_u16()? as u32, 16);
        let vy = sign_extend(cursor.read_u16()? as u32, 16);
        Ok(CartesianVelocity {
            vx: dequantize(vx as i64, VELOCITY_LSB),
            vy: dequantize(vy as i64, VELOCITY_LSB),
        })
    }

    fn encode(&self, value: &CartesianVelocity, out: &mut Writer) -> Result<()> {
        out.write_u16(quantize_signed(self.id(), value.vx, VELOCITY_LSB, 16)? as u16)?;
        out.write_u16(quantize_signed(self.id(), value.vy, VELOCITY_LSB, 16)? as u16)
    }

    fn validate(&self, value: &CartesianVelocity) -> Result<()> {
        quantize_signed(self.id(), value.vx, VELOCITY_LSB, 16)?;
        quantize_signed(self.id(), value.vy, VELOCITY_LSB, 16)?;
        Ok(())
    }

    fn describe(&self, value: &CartesianVelocity) -> String {
        let speed = value.vx.hypot(value.vy);
        let track = value.vx.atan2(value.vy).to_degrees().rem_euclid(360.0);
        format!(
            "vx={:.2} vy={:.2} m/s ({speed:.1} m/s, {track:.1}°)",
            value.vx, value.vy
        )
    }

    fn wrap(value: CartesianVelocity) -> ItemValue {
        ItemValue::Velocity(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&CartesianVelocity> {
        match value {
            ItemValue::Velocity(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/210 Calculated Acceleration (Cartesian)
// ---------------------------------------------------------------------------

pub struct AccelerationItem;

impl DataItem for AccelerationItem {
    type Value = CartesianAcceleration;

    fn id(&self) -> &'static str {
        "I062/210"
    }

    fn name(&self) -> &'static str {
        "Calculated Acceleration (Cartesian)"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<CartesianAcceleration> {
        let [ax, ay] = cursor.read_array()?;
        Ok(CartesianAcceleration {
            ax: dequantize(sign_extend(ax as u32, 8) as i64, ACCELERATION_LSB),
            ay: dequantize(sign_extend(ay as u32, 8) as i64, ACCELERATION_LSB),
        })
    }

    fn encode(&self, value: &CartesianAcceleration, out: &mut Writer) -> Result<()> {
        let ax = quantize_signed(self.id(), value.ax, ACCELERATION_LSB, 8)?;
        let ay = quantize_signed(self.id(), value.ay, ACCELERATION_LSB, 8)?;
        out.write_bytes(&[ax as u8, ay as u8])
    }

    fn validate(&self, value: &CartesianAcceleration) -> Result<()> {
        quantize_signed(self.id(), value.ax, ACCELERATION_LSB, 8)?;
        quantize_signed(self.id(), value.ay, ACCELERATION_LSB, 8)?;
        Ok(())
    }

    fn describe(&self, value: &CartesianAcceleration) -> String {
        format!("ax={:.2} ay={:.2} m/s²", value.ax, value.ay)
    }

    fn wrap(value: CartesianAcceleration) -> ItemValue {
        ItemValue::Acceleration(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&CartesianAcceleration> {
        match value {
            ItemValue::Acceleration(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/060 Track Mode 3/A Code
// ---------------------------------------------------------------------------

const MODE_3A_CHANGED: u16 = 0x2000;
const CODE_12_MASK: u16 = 0x0FFF;

pub struct Mode3AItem;

impl DataItem for Mode3AItem {
    type Value = Mode3ACode;

    fn id(&self) -> &'static str {
        "I062/060"
    }

    fn name(&self) -> &'static str {
        "Track Mode 3/A Code"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<Mode3ACode> {
        let raw = cursor.read_u16()?;
        Ok(Mode3ACode {
            code: raw & CODE_12_MASK,
            changed: raw & MODE_3A_CHANGED != 0,
        })
    }

    fn encode(&self, value: &Mode3ACode, out: &mut Writer) -> Result<()> {
        let mut raw = value.code;
        if value.changed {
            raw |= MODE_3A_CHANGED;
        }
        out.write_u16(raw)
    }

    fn validate(&self, value: &Mode3ACode) -> Result<()> {
        check_bits(self.id(), value.code as u32, 12)
    }

    fn describe(&self, value: &Mode3ACode) -> String {
        if value.changed {
            format!("{} (changed)", octal_string(value.code))
        } else {
            octal_string(value.code)
        }
    }

    fn wrap(value: Mode3ACode) -> ItemValue {
        ItemValue::Mode3A(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&Mode3ACode> {
        match value {
            ItemValue::Mode3A(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/120 Track Mode 2 Code
// ---------------------------------------------------------------------------

pub struct Mode2Item;

impl DataItem for Mode2Item {
    type Value = Mode2Code;

    fn id(&self) -> &'static str {
        "I062/120"
    }

    fn name(&self) -> &'static str {
        "Track Mode 2 Code"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<Mode2Code> {
        Ok(Mode2Code {
            code: cursor.read_u16()? & CODE_12_MASK,
        })
    }

    fn encode(&self, value: &Mode2Code, out: &mut Writer) -> Result<()> {
        out.write_u16(value.code)
    }

    fn validate(&self, value: &Mode2Code) -> Result<()> {
        check_bits(self.id(), value.code as u32, 12)
    }

    fn describe(&self, value: &Mode2Code) -> String {
        octal_string(value.code)
    }

    fn wrap(value: Mode2Code) -> ItemValue {
        ItemValue::Mode2(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&Mode2Code> {
        match value {
            ItemValue::Mode2(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/245 Target Identification
// ---------------------------------------------------------------------------

pub struct TargetIdItem;

impl DataItem for TargetIdItem {
    type Value = TargetIdentification;

    fn id(&self) -> &'static str {
        "I062/245"
    }

    fn name(&self) -> &'static str {
        "Target Identification"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<TargetIdentification> {
        let bytes: [u8; 7] = cursor.read_array()?;
        let source = bytes[0] >> 6;

        // 8 characters, 6 bits each, packed into 48 bits
        let bits = u64::from_be_bytes({
            let mut buf = [0u8; 8];
            buf[2..8].copy_from_slice(&bytes[1..]);
            buf
        });

        let mut callsign = String::with_capacity(CALLSIGN_LEN);
        for i in 0..CALLSIGN_LEN {
            let code = ((bits >> (42 - i * 6)) & 0x3F) as u8;
            callsign.push(icao_char(code).unwrap_or('#'));
        }
        let trimmed = callsign.trim_end_matches(' ').len();
        callsign.truncate(trimmed);

        Ok(TargetIdentification { source, callsign })
    }

    fn encode(&self, value: &TargetIdentification, out: &mut Writer) -> Result<()> {
        let mut bits = 0u64;
        let mut chars = value.callsign.chars();
        for _ in 0..CALLSIGN_LEN {
            let c = chars.next().unwrap_or(' ');
            let code = icao_code(c).ok_or_else(|| {
                AsterixError::invalid(self.id(), format!("character {c:?} not encodable"))
            })?;
            bits = (bits << 6) | code as u64;
        }
        out.write_u8(value.source << 6)?;
        out.write_bytes(&bits.to_be_bytes()[2..])
    }

    fn validate(&self, value: &TargetIdentification) -> Result<()> {
        if value.source > 3 {
            return Err(AsterixError::invalid(
                self.id(),
                format!("STI {} > 3", value.source),
            ));
        }
        if value.callsign.chars().count() > CALLSIGN_LEN {
            return Err(AsterixError::invalid(
                self.id(),
                format!("callsign {:?} longer than {CALLSIGN_LEN}", value.callsign),
            ));
        }
        if let Some(c) = value.callsign.chars().find(|&c| icao_code(c).is_none()) {
            return Err(AsterixError::invalid(
                self.id(),
                format!("character {c:?} not in the ICAO set"),
            ));
        }
        Ok(())
    }

    fn describe(&self, value: &TargetIdentification) -> String {
        let source = match value.source {
            0 => "downlinked",
            1 => "not downlinked",
            2 => "registration",
            _ => "invalid",
        };
        format!("{} ({source})", value.callsign)
    }

    fn wrap(value: TargetIdentification) -> ItemValue {
        ItemValue::TargetId(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&TargetIdentification> {
        match value {
            ItemValue::TargetId(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/040 Track Number
// ---------------------------------------------------------------------------

pub struct TrackNumberItem;

impl DataItem for TrackNumberItem {
    type Value = u16;

    fn id(&self) -> &'static str {
        "I062/040"
    }

    fn name(&self) -> &'static str {
        "Track Number"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<u16> {
        cursor.read_u16()
    }

    fn encode(&self, value: &u16, out: &mut Writer) -> Result<()> {
        out.write_u16(*value)
    }

    fn describe(&self, value: &u16) -> String {
        format!("track {value}")
    }

    fn wrap(value: u16) -> ItemValue {
        ItemValue::TrackNumber(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&u16> {
        match value {
            ItemValue::TrackNumber(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/200 Mode of Movement
// ---------------------------------------------------------------------------

pub struct ModeOfMovementItem;

impl DataItem for ModeOfMovementItem {
    type Value = ModeOfMovement;

    fn id(&self) -> &'static str {
        "I062/200"
    }

    fn name(&self) -> &'static str {
        "Mode of Movement"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<ModeOfMovement> {
        let b = cursor.read_u8()?;
        Ok(ModeOfMovement {
            transversal: (b >> 6) & 0x03,
            longitudinal: (b >> 4) & 0x03,
            vertical: (b >> 2) & 0x03,
            altitude_discrepancy: b & 0x02 != 0,
        })
    }

    fn encode(&self, value: &ModeOfMovement, out: &mut Writer) -> Result<()> {
        let mut b = (value.transversal << 6) | (value.longitudinal << 4) | (value.vertical << 2);
        if value.altitude_discrepancy {
            b |= 0x02;
        }
        out.write_u8(b)
    }

    fn validate(&self, value: &ModeOfMovement) -> Result<()> {
        for (name, v) in [
            ("TRANS", value.transversal),
            ("LONG", value.longitudinal),
            ("VERT", value.vertical),
        ] {
            if v > 3 {
                return Err(AsterixError::invalid(self.id(), format!("{name} {v} > 3")));
            }
        }
        Ok(())
    }

    fn describe(&self, value: &ModeOfMovement) -> String {
        let trans = ["constant course", "right turn", "left turn", "undetermined"];
        let long = ["constant speed", "increasing", "decreasing", "undetermined"];
        let vert = ["level", "climb", "descent", "undetermined"];
        let mut s = format!(
            "{}, {}, {}",
            trans[(value.transversal & 3) as usize],
            long[(value.longitudinal & 3) as usize],
            vert[(value.vertical & 3) as usize]
        );
        if value.altitude_discrepancy {
            s.push_str(", altitude discrepancy");
        }
        s
    }

    fn wrap(value: ModeOfMovement) -> ItemValue {
        ItemValue::ModeOfMovement(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&ModeOfMovement> {
        match value {
            ItemValue::ModeOfMovement(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/136 Measured Flight Level
// ---------------------------------------------------------------------------

pub struct MeasuredFlightLevelItem;

impl DataItem for MeasuredFlightLevelItem {
    type Value = f64;

    fn id(&self) -> &'static str {
        "I062/136"
    }

    fn name(&self) -> &'static str {
        "Measured Flight Level"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<f64> {
        let raw = sign_extend(cursor.read_u16()? as u32, 16);
        Ok(dequantize(raw as i64, FLIGHT_LEVEL_LSB))
    }

    fn encode(&self, value: &f64, out: &mut Writer) -> Result<()> {
        out.write_u16(quantize_signed(self.id(), *value, FLIGHT_LEVEL_LSB, 16)? as u16)
    }

    fn validate(&self, value: &f64) -> Result<()> {
        check_range(self.id(), *value, MIN_FLIGHT_LEVEL, MAX_FLIGHT_LEVEL)
    }

    fn describe(&self, value: &f64) -> String {
        format!("FL{value:.2}")
    }

    fn wrap(value: f64) -> ItemValue {
        ItemValue::FlightLevel(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&f64> {
        match value {
            ItemValue::FlightLevel(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/130 Calculated Track Geometric Altitude
// ---------------------------------------------------------------------------

pub struct GeometricAltitudeItem;

impl DataItem for GeometricAltitudeItem {
    type Value = f64;

    fn id(&self) -> &'static str {
        "I062/130"
    }

    fn name(&self) -> &'static str {
        "Calculated Track Geometric Altitude"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<f64> {
        let raw = sign_extend(cursor.read_u16()? as u32, 16);
        Ok(dequantize(raw as i64, ALTITUDE_LSB))
    }

    fn encode(&self, value: &f64, out: &mut Writer) -> Result<()> {
        out.write_u16(quantize_signed(self.id(), *value, ALTITUDE_LSB, 16)? as u16)
    }

    fn validate(&self, value: &f64) -> Result<()> {
        check_range(self.id(), *value, -1500.0, 150_000.0)
    }

    fn describe(&self, value: &f64) -> String {
        format!("{value:.2} ft")
    }

    fn wrap(value: f64) -> ItemValue {
        ItemValue::GeometricAltitude(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&f64> {
        match value {
            ItemValue::GeometricAltitude(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/135 Calculated Track Barometric Altitude
// ---------------------------------------------------------------------------

const QNH_BIT: u16 = 0x8000;

pub struct BarometricAltitudeItem;

impl DataItem for BarometricAltitudeItem {
    type Value = BarometricAltitude;

    fn id(&self) -> &'static str {
        "I062/135"
    }

    fn name(&self) -> &'static str {
        "Calculated Track Barometric Altitude"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<BarometricAltitude> {
        let raw = cursor.read_u16()?;
        let level = sign_extend((raw & !QNH_BIT) as u32, 15);
        Ok(BarometricAltitude {
            qnh_corrected: raw & QNH_BIT != 0,
            flight_level: dequantize(level as i64, FLIGHT_LEVEL_LSB),
        })
    }

    fn encode(&self, value: &BarometricAltitude, out: &mut Writer) -> Result<()> {
        let mut raw = quantize_signed(self.id(), value.flight_level, FLIGHT_LEVEL_LSB, 15)? as u16;
        if value.qnh_corrected {
            raw |= QNH_BIT;
        }
        out.write_u16(raw)
    }

    fn validate(&self, value: &BarometricAltitude) -> Result<()> {
        check_range(
            self.id(),
            value.flight_level,
            MIN_FLIGHT_LEVEL,
            MAX_FLIGHT_LEVEL,
        )
    }

    fn describe(&self, value: &BarometricAltitude) -> String {
        if value.qnh_corrected {
            format!("FL{:.2} (QNH)", value.flight_level)
        } else {
            format!("FL{:.2}", value.flight_level)
        }
    }

    fn wrap(value: BarometricAltitude) -> ItemValue {
        ItemValue::BarometricAltitude(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&BarometricAltitude> {
        match value {
            ItemValue::BarometricAltitude(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/220 Calculated Rate Of Climb/Descent
// ---------------------------------------------------------------------------

pub struct RateOfClimbItem;

impl DataItem for RateOfClimbItem {
    type Value = f64;

    fn id(&self) -> &'static str {
        "I062/220"
    }

    fn name(&self) -> &'static str {
        "Calculated Rate Of Climb/Descent"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<f64> {
        let raw = sign_extend(cursor.read_u16()? as u32, 16);
        Ok(dequantize(raw as i64, RATE_OF_CLIMB_LSB))
    }

    fn encode(&self, value: &f64, out: &mut Writer) -> Result<()> {
        out.write_u16(quantize_signed(self.id(), *value, RATE_OF_CLIMB_LSB, 16)? as u16)
    }

    fn validate(&self, value: &f64) -> Result<()> {
        quantize_signed(self.id(), *value, RATE_OF_CLIMB_LSB, 16).map(|_| ())
    }

    fn describe(&self, value: &f64) -> String {
        format!("{value:+.2} ft/min")
    }

    fn wrap(value: f64) -> ItemValue {
        ItemValue::RateOfClimb(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&f64> {
        match value {
            ItemValue::RateOfClimb(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// I062/300 Vehicle Fleet Identification
// ---------------------------------------------------------------------------

pub struct VehicleFleetItem;

impl DataItem for VehicleFleetItem {
    type Value = u8;

    fn id(&self) -> &'static str {
        "I062/300"
    }

    fn name(&self) -> &'static str {
        "Vehicle Fleet Identification"
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<u8> {
        cursor.read_u8()
    }

    fn encode(&self, value: &u8, out: &mut Writer) -> Result<()> {
        out.write_u8(*value)
    }

    fn describe(&self, value: &u8) -> String {
        format!("VFI {value}")
    }

    fn wrap(value: u8) -> ItemValue {
        ItemValue::VehicleFleetId(value)
    }

    fn unwrap(value: &ItemValue) -> Option<&u8> {
        match value {
            ItemValue::VehicleFleetId(v) => Some(v),
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

    fn encode<T: DataItem>(item: &T, value: &T::Value) -> Vec<u8> {
        item.validate(value).expect("valid value");
        let mut out = Writer::new();
        item.encode(value, &mut out).unwrap();
        out.into_inner()
    }

    fn decode<T: DataItem>(item: &T, data: &[u8]) -> T::Value {
        let mut c = Cursor::new(data);
        let v = item.decode(&mut c).unwrap();
        assert_eq!(c.position(), data.len(), "{} consumed", item.id());
        v
    }

    #[test]
    fn test_wgs84_known_buffer() {
        let data = [0x00, 0x98, 0x96, 0x80, 0xFF, 0x33, 0x33, 0x33];
        let pos = decode(&Wgs84PositionItem, &data);
        assert_abs_diff_eq!(pos.latitude, 53.644, epsilon = 1e-3);
        assert!(pos.longitude < 0.0);
        assert_abs_diff_eq!(pos.longitude, -72.0, epsilon = 1e-5);
        assert_eq!(encode(&Wgs84PositionItem, &pos), data);
    }

    #[test]
    fn test_wgs84_truncated_is_underrun() {
        let mut c = Cursor::new(&[0x00, 0x98, 0x96, 0x80, 0xFF, 0x33, 0x33]);
        assert!(matches!(
            Wgs84PositionItem.decode(&mut c),
            Err(AsterixError::Underrun { .. })
        ));
    }

    #[test]
    fn test_wgs84_validation() {
        let item = Wgs84PositionItem;
        let ok = Wgs84Position {
            latitude: -90.0,
            longitude: -180.0,
        };
        assert!(item.validate(&ok).is_ok());
        assert!(item
            .validate(&Wgs84Position {
                latitude: 0.0,
                longitude: 180.0
            })
            .is_err());
        assert!(item
            .validate(&Wgs84Position {
                latitude: -90.5,
                longitude: 0.0
            })
            .is_err());
    }

    #[test]
    fn test_wgs84_roundtrip_within_half_lsb() {
        for (lat, lon) in [(0.0, 0.0), (45.123456, -120.654321), (-89.99, 179.99)] {
            let v = Wgs84Position {
                latitude: lat,
                longitude: lon,
            };
            let back = decode(&Wgs84PositionItem, &encode(&Wgs84PositionItem, &v));
            assert!((back.latitude - lat).abs() <= WGS84_LSB / 2.0);
            assert!((back.longitude - lon).abs() <= WGS84_LSB / 2.0);
        }
    }

    #[test]
    fn test_data_source() {
        let v = decode(&DataSourceItem, &[0x19, 0x64]);
        assert_eq!(v, DataSourceId { sac: 25, sic: 100 });
        assert_eq!(DataSourceItem.describe(&v), "SAC=25 SIC=100");
    }

    #[test]
    fn test_time_of_track() {
        // 0x2A_3000 = 2764800 / 128 = 21600 s = 06:00:00
        let t = decode(&TimeOfTrackItem, &[0x2A, 0x30, 0x00]);
        assert_abs_diff_eq!(t, 21600.0);
        assert_eq!(TimeOfTrackItem.describe(&t), "06:00:00.000");
        assert_eq!(encode(&TimeOfTrackItem, &(21600.0 + 1.0 / 128.0)), [0x2A, 0x30, 0x01]);
        assert!(TimeOfTrackItem.validate(&86400.0).is_err());
        assert!(TimeOfTrackItem.validate(&-0.5).is_err());
    }

    #[test]
    fn test_time_of_track_wraps_at_midnight() {
        let bytes = encode(&TimeOfTrackItem, &86_399.999);
        assert_eq!(bytes, [0x00, 0x00, 0x00]);
        let t = decode(&TimeOfTrackItem, &bytes);
        assert_abs_diff_eq!(t, 0.0);
        TimeOfTrackItem.validate(&t).unwrap();

        // Last representable instant of the day survives unchanged
        let last = SECONDS_PER_DAY - TIME_LSB;
        let bytes = encode(&TimeOfTrackItem, &last);
        assert_eq!(bytes, [0xA8, 0xBF, 0xFF]);
        assert_abs_diff_eq!(decode(&TimeOfTrackItem, &bytes), last);
    }

    #[test]
    fn test_cartesian_position_negative() {
        let v = decode(&CartesianPositionItem, &[0xFF, 0xFF, 0xFE, 0x00, 0x00, 0x03]);
        assert_abs_diff_eq!(v.x, -1.0);
        assert_abs_diff_eq!(v.y, 1.5);
        assert_eq!(
            encode(&CartesianPositionItem, &v),
            [0xFF, 0xFF, 0xFE, 0x00, 0x00, 0x03]
        );
    }

    #[test]
    fn test_velocity_quarter_metre_resolution() {
        let v = CartesianVelocity {
            vx: -100.25,
            vy: 250.75,
        };
        let bytes = encode(&VelocityItem, &v);
        assert_eq!(bytes, [0xFE, 0x6F, 0x03, 0xEB]);
        assert_eq!(decode(&VelocityItem, &bytes), v);
        assert!(VelocityItem
            .validate(&CartesianVelocity {
                vx: 8192.0,
                vy: 0.0
            })
            .is_err());
    }

    #[test]
    fn test_acceleration() {
        let v = decode(&AccelerationItem, &[0xFC, 0x7F]);
        assert_abs_diff_eq!(v.ax, -1.0);
        assert_abs_diff_eq!(v.ay, 31.75);
        assert!(AccelerationItem
            .validate(&CartesianAcceleration { ax: 32.0, ay: 0.0 })
            .is_err());
    }

    #[test]
    fn test_mode3a() {
        let v = decode(&Mode3AItem, &[0x2F, 0xC0]);
        assert_eq!(
            v,
            Mode3ACode {
                code: 0o7700,
                changed: true
            }
        );
        assert_eq!(Mode3AItem.describe(&v), "7700 (changed)");
        assert_eq!(encode(&Mode3AItem, &v), [0x2F, 0xC0]);
        assert!(Mode3AItem
            .validate(&Mode3ACode {
                code: 0x1000,
                changed: false
            })
            .is_err());
    }

    #[test]
    fn test_mode2() {
        let v = decode(&Mode2Item, &[0xF2, 0x9C]);
        assert_eq!(v.code, 0x29C);
        assert_eq!(Mode2Item.describe(&v), "1234");
    }

    #[test]
    fn test_target_identification() {
        // STI=0, "KLM1023 " as ICAO 6-bit characters
        let data = [0x00, 0x2C, 0xC3, 0x71, 0xC3, 0x2C, 0xE0];
        let v = decode(&TargetIdItem, &data);
        assert_eq!(v.source, 0);
        assert_eq!(v.callsign, "KLM1023");
        assert_eq!(encode(&TargetIdItem, &v), data);
    }

    #[test]
    fn test_target_identification_validation() {
        let long = TargetIdentification {
            source: 0,
            callsign: "ABCDEFGHI".into(),
        };
        assert!(TargetIdItem.validate(&long).is_err());
        let lower = TargetIdentification {
            source: 0,
            callsign: "klm".into(),
        };
        assert!(TargetIdItem.validate(&lower).is_err());
        let sti = TargetIdentification {
            source: 4,
            callsign: "KLM".into(),
        };
        assert!(TargetIdItem.validate(&sti).is_err());
    }

    #[test]
    fn test_target_identification_unassigned_code() {
        // First character is code 0, which has no ICAO character
        let data = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let v = decode(&TargetIdItem, &data);
        assert_eq!(v.callsign, "########");
        assert!(TargetIdItem.validate(&v).is_err());
    }

    #[test]
    fn test_mode_of_movement() {
        let v = decode(&ModeOfMovementItem, &[0b01_10_01_1_0]);
        assert_eq!(v.transversal, 1);
        assert_eq!(v.longitudinal, 2);
        assert_eq!(v.vertical, 1);
        assert!(v.altitude_discrepancy);
        assert_eq!(
            ModeOfMovementItem.describe(&v),
            "right turn, decreasing, climb, altitude discrepancy"
        );
        assert_eq!(encode(&ModeOfMovementItem, &v), [0b01_10_01_1_0]);
    }

    #[test]
    fn test_flight_levels() {
        let fl = decode(&MeasuredFlightLevelItem, &[0x01, 0x2C]);
        assert_abs_diff_eq!(fl, 75.0);
        assert!(MeasuredFlightLevelItem.validate(&1500.25).is_err());

        let baro = decode(&BarometricAltitudeItem, &[0xFF, 0xFC]);
        assert!(baro.qnh_corrected);
        assert_abs_diff_eq!(baro.flight_level, -1.0);
        assert_eq!(encode(&BarometricAltitudeItem, &baro), [0xFF, 0xFC]);

        let baro = decode(&BarometricAltitudeItem, &[0x0F, 0xA0]);
        assert!(!baro.qnh_corrected);
        assert_abs_diff_eq!(baro.flight_level, 1000.0);
    }

    #[test]
    fn test_geometric_altitude_and_rate() {
        let alt = decode(&GeometricAltitudeItem, &[0x0F, 0xA0]);
        assert_abs_diff_eq!(alt, 25000.0);
        assert_eq!(encode(&GeometricAltitudeItem, &25003.0), [0x0F, 0xA0]);

        let rate = decode(&RateOfClimbItem, &[0xFF, 0x60]);
        assert_abs_diff_eq!(rate, -1000.0);
        assert_eq!(RateOfClimbItem.describe(&rate), "-1000.00 ft/min");
    }

    #[test]
    fn test_scalar_items() {
        assert_eq!(decode(&ServiceIdItem, &[0x07]), 7);
        assert_eq!(decode(&TrackNumberItem, &[0x0F, 0xFF]), 4095);
        assert_eq!(decode(&VehicleFleetItem, &[0x03]), 3);
        assert_eq!(encode(&TrackNumberItem, &513), [0x02, 0x01]);
    }
}
