//! User Application Profiles: the FRN → data item tables that drive the
//! record assembler.

use std::fmt;
use std::sync::LazyLock;

use crate::codec::{DataItem, ItemCodec};
use crate::config::CodecConfig;
use crate::fspec::BITS_PER_OCTET;
use crate::items::accuracy::AccuraciesItem;
use crate::items::ages::{SystemTrackAgesItem, TrackDataAgesItem};
use crate::items::extended::{ComposedTrackNumberItem, TargetSizeItem, TrackStatusItem};
use crate::items::fixed::*;
use crate::items::measured::MeasuredInfoItem;
use crate::items::raw::{
    AIRCRAFT_DERIVED_ITEM, FLIGHT_PLAN_ITEM, MODE5_ITEM, RESERVED_EXPANSION_ITEM,
    SPECIAL_PURPOSE_ITEM,
};
use crate::items::ItemValue;
use crate::types::{AsterixError, Result};

/// Longest record FSPEC any UAP may use.
pub const MAX_RECORD_FSPEC: usize = 8;

/// How the length of an item is determined on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthRule {
    Fixed(usize),
    /// FX-extended octets.
    Extended,
    /// Own FSPEC plus subfields.
    Compound,
    /// Leading length octet.
    Explicit,
}

impl fmt::Display for LengthRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthRule::Fixed(n) => write!(f, "fixed {n}"),
            LengthRule::Extended => write!(f, "extended"),
            LengthRule::Compound => write!(f, "compound"),
            LengthRule::Explicit => write!(f, "explicit"),
        }
    }
}

pub struct UapSlot {
    pub frn: u8,
    pub codec: Box<dyn ItemCodec>,
    pub length: LengthRule,
}

impl UapSlot {
    pub fn new<T: DataItem + 'static>(frn: u8, item: T, length: LengthRule) -> Self {
        UapSlot {
            frn,
            codec: Box::new(item),
            length,
        }
    }
}

impl fmt::Debug for UapSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UapSlot")
            .field("frn", &self.frn)
            .field("item", &self.codec.id())
            .field("length", &self.length)
            .finish()
    }
}

/// Ordered slot table of one category edition. Spare FRNs have no slot.
#[derive(Debug)]
pub struct Uap {
    pub category: u8,
    pub edition: &'static str,
    slots: Vec<Option<UapSlot>>,
    config: CodecConfig,
}

/// CAT062 edition 1.18 with the default codec configuration.
pub static CAT062: LazyLock<Uap> = LazyLock::new(|| Uap::cat062(&CodecConfig::default()));

impl Uap {
    /// Build a UAP from its defined slots. FRNs must be unique and fit in a
    /// record FSPEC.
    pub fn new(
        category: u8,
        edition: &'static str,
        slots: Vec<UapSlot>,
        config: CodecConfig,
    ) -> Result<Self> {
        let capacity = MAX_RECORD_FSPEC * BITS_PER_OCTET;
        let max_frn = slots.iter().map(|s| s.frn as usize).max().unwrap_or(0);
        if max_frn > capacity {
            return Err(AsterixError::invalid(
                "UAP",
                format!("FRN {max_frn} beyond the {capacity} an FSPEC can address"),
            ));
        }

        let mut table: Vec<Option<UapSlot>> = (0..max_frn).map(|_| None).collect();
        for slot in slots {
            let frn = slot.frn;
            let entry = frn
                .checked_sub(1)
                .and_then(|i| table.get_mut(i as usize))
                .ok_or_else(|| AsterixError::invalid("UAP", "FRN 0 is not valid"))?;
            if entry.is_some() {
                return Err(AsterixError::invalid("UAP", format!("FRN {frn} defined twice")));
            }
            *entry = Some(slot);
        }

        Ok(Uap {
            category,
            edition,
            slots: table,
            config,
        })
    }

    /// CAT062 edition 1.18. `config` sets the range policy of the saturating
    /// items and whether decoded records keep their raw bytes.
    pub fn cat062(config: &CodecConfig) -> Self {
        use LengthRule::*;
        let policy = config.range_policy;

        let slots = vec![
            Some(UapSlot::new(1, DataSourceItem, Fixed(2))),
            None,
            Some(UapSlot::new(3, ServiceIdItem, Fixed(1))),
            Some(UapSlot::new(4, TimeOfTrackItem, Fixed(3))),
            Some(UapSlot::new(5, Wgs84PositionItem, Fixed(8))),
            Some(UapSlot::new(6, CartesianPositionItem, Fixed(6))),
            Some(UapSlot::new(7, VelocityItem, Fixed(4))),
            Some(UapSlot::new(8, AccelerationItem, Fixed(2))),
            Some(UapSlot::new(9, Mode3AItem, Fixed(2))),
            Some(UapSlot::new(10, TargetIdItem, Fixed(7))),
            Some(UapSlot::new(11, AIRCRAFT_DERIVED_ITEM, Compound)),
            Some(UapSlot::new(12, TrackNumberItem, Fixed(2))),
            Some(UapSlot::new(13, TrackStatusItem, Extended)),
            Some(UapSlot::new(14, SystemTrackAgesItem { policy }, Compound)),
            Some(UapSlot::new(15, ModeOfMovementItem, Fixed(1))),
            Some(UapSlot::new(16, TrackDataAgesItem { policy }, Compound)),
            Some(UapSlot::new(17, MeasuredFlightLevelItem, Fixed(2))),
            Some(UapSlot::new(18, GeometricAltitudeItem, Fixed(2))),
            Some(UapSlot::new(19, BarometricAltitudeItem, Fixed(2))),
            Some(UapSlot::new(20, RateOfClimbItem, Fixed(2))),
            Some(UapSlot::new(21, FLIGHT_PLAN_ITEM, Compound)),
            Some(UapSlot::new(22, TargetSizeItem, Extended)),
            Some(UapSlot::new(23, VehicleFleetItem, Fixed(1))),
            Some(UapSlot::new(24, MODE5_ITEM, Compound)),
            Some(UapSlot::new(25, Mode2Item, Fixed(2))),
            Some(UapSlot::new(26, ComposedTrackNumberItem, Extended)),
            Some(UapSlot::new(27, AccuraciesItem { policy }, Compound)),
            Some(UapSlot::new(28, MeasuredInfoItem, Compound)),
            None,
            None,
            None,
            None,
            None,
            Some(UapSlot::new(34, RESERVED_EXPANSION_ITEM, Explicit)),
            Some(UapSlot::new(35, SPECIAL_PURPOSE_ITEM, Explicit)),
        ];

        Uap {
            category: 62,
            edition: "1.18",
            slots,
            config: *config,
        }
    }

    pub fn slot(&self, frn: u8) -> Option<&UapSlot> {
        (frn as usize)
            .checked_sub(1)
            .and_then(|i| self.slots.get(i))
            .and_then(Option::as_ref)
    }

    /// Defined slots in FRN order.
    pub fn slots(&self) -> impl Iterator<Item = &UapSlot> {
        self.slots.iter().flatten()
    }

    /// Slot of the item with the given reference, e.g. `I062/105`.
    pub fn find(&self, item: &str) -> Option<&UapSlot> {
        self.slots().find(|s| s.codec.id() == item)
    }

    /// Highest FRN of the table, spare or not.
    pub fn max_frn(&self) -> usize {
        self.slots.len()
    }

    /// FSPEC octets needed to address every FRN.
    pub fn fspec_octets(&self) -> usize {
        self.slots.len().div_ceil(BITS_PER_OCTET).max(1)
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Human-readable value of an item, or a placeholder for unknown FRNs.
    pub fn describe(&self, frn: u8, value: &ItemValue) -> String {
        match self.slot(frn) {
            Some(slot) => slot.codec.describe_item(value),
            None => format!("FRN {frn}: {value:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
