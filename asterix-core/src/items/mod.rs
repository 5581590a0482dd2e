//! CAT062 data item implementations and the value sum type they share.

pub mod accuracy;
pub mod ages;
pub mod extended;
pub mod fixed;
pub mod measured;
pub mod raw;

use serde::{Deserialize, Serialize};

pub use accuracy::EstimatedAccuracies;
pub use ages::{SystemTrackAges, TrackDataAges};
pub use extended::{TargetSizeOrientation, TrackNumberPart, TrackStatus};
pub use fixed::{
    BarometricAltitude, CartesianAcceleration, CartesianPosition, CartesianVelocity,
    DataSourceId, Mode2Code, Mode3ACode, ModeOfMovement, TargetIdentification, Wgs84Position,
};
pub use measured::MeasuredInformation;
pub use raw::{CompoundData, ExplicitData, RawSubfield};

/// Decoded value of any CAT062 data item.
///
/// Serialized with an explicit `type` tag so JSON records can be read back
/// without knowing the UAP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ItemValue {
    DataSource(DataSourceId),
    ServiceId(u8),
    /// Seconds since midnight UTC.
    TimeOfTrack(f64),
    PositionWgs84(Wgs84Position),
    PositionCartesian(CartesianPosition),
    Velocity(CartesianVelocity),
    Acceleration(CartesianAcceleration),
    Mode3A(Mode3ACode),
    TargetId(TargetIdentification),
    TrackNumber(u16),
    TrackStatus(TrackStatus),
    SystemTrackAges(SystemTrackAges),
    ModeOfMovement(ModeOfMovement),
    TrackDataAges(TrackDataAges),
    /// Flight level (hundreds of feet).
    FlightLevel(f64),
    /// Feet.
    GeometricAltitude(f64),
    BarometricAltitude(BarometricAltitude),
    /// Feet per minute.
    RateOfClimb(f64),
    TargetSize(TargetSizeOrientation),
    VehicleFleetId(u8),
    Mode2(Mode2Code),
    ComposedTrackNumber(Vec<TrackNumberPart>),
    Accuracies(EstimatedAccuracies),
    MeasuredInfo(MeasuredInformation),
    Compound(CompoundData),
    Explicit(ExplicitData),
}
