//! Data item codec contract.
//!
//! Concrete items implement [`DataItem`] with their own value type. The
//! blanket [`ItemCodec`] impl erases that type behind [`ItemValue`] so a UAP
//! can keep one boxed codec per slot.

use crate::cursor::{Cursor, Writer};
use crate::items::ItemValue;
use crate::types::{AsterixError, Result};

/// A typed ASTERIX data item.
///
/// `decode` must consume exactly the bytes of the item's layout and fail
/// with `Underrun` rather than read past the end. `encode` may assume
/// `validate` already passed.
pub trait DataItem: Send + Sync {
    type Value: Clone + std::fmt::Debug;

    /// Item reference, e.g. `I062/010`.
    fn id(&self) -> &'static str;

    /// Human-readable item title.
    fn name(&self) -> &'static str;

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<Self::Value>;

    fn encode(&self, value: &Self::Value, out: &mut Writer) -> Result<()>;

    fn validate(&self, _value: &Self::Value) -> Result<()> {
        Ok(())
    }

    fn describe(&self, value: &Self::Value) -> String;

    fn wrap(value: Self::Value) -> ItemValue;

    fn unwrap(value: &ItemValue) -> Option<&Self::Value>;
}

/// Object-safe view of a [`DataItem`] over [`ItemValue`].
pub trait ItemCodec: Send + Sync {
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    /// Decode one item and report how many bytes it took.
    fn decode_item(&self, cursor: &mut Cursor<'_>) -> Result<(ItemValue, usize)>;

    /// Validate and append one item. Nothing is written on failure.
    fn encode_item(&self, value: &ItemValue, out: &mut Writer) -> Result<usize>;

    fn validate_item(&self, value: &ItemValue) -> Result<()>;

    fn describe_item(&self, value: &ItemValue) -> String;
}

impl<T: DataItem> ItemCodec for T {
    fn id(&self) -> &'static str {
        DataItem::id(self)
    }

    fn name(&self) -> &'static str {
        DataItem::name(self)
    }

    fn decode_item(&self, cursor: &mut Cursor<'_>) -> Result<(ItemValue, usize)> {
        let start = cursor.position();
        let value = self
            .decode(cursor)
            .map_err(|e| e.in_item(DataItem::id(self)))?;
        Ok((T::wrap(value), cursor.position() - start))
    }

    fn encode_item(&self, value: &ItemValue, out: &mut Writer) -> Result<usize> {
        let id = DataItem::id(self);
        let value = T::unwrap(value).ok_or(AsterixError::ValueMismatch { item: id })?;
        self.validate(value).map_err(|e| e.in_item(id))?;

        let mut local = Writer::new();
        self.encode(value, &mut local).map_err(|e| e.in_item(id))?;
        out.write_bytes(local.as_slice()).map_err(|e| e.in_item(id))?;
        Ok(local.len())
    }

    fn validate_item(&self, value: &ItemValue) -> Result<()> {
        let id = DataItem::id(self);
        let value = T::unwrap(value).ok_or(AsterixError::ValueMismatch { item: id })?;
        self.validate(value).map_err(|e| e.in_item(id))
    }

    fn describe_item(&self, value: &ItemValue) -> String {
        match T::unwrap(value) {
            Some(v) => self.describe(v),
            None => format!("{value:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::fixed::{TrackNumberItem, Wgs84PositionItem};
    use crate::items::Wgs84Position;

    #[test]
    fn test_decode_item_reports_consumed() {
        let codec: &dyn ItemCodec = &TrackNumberItem;
        let data = [0x12, 0x34, 0xFF];
        let mut c = Cursor::new(&data);
        let (value, n) = codec.decode_item(&mut c).unwrap();
        assert_eq!(value, ItemValue::TrackNumber(0x1234));
        assert_eq!(n, 2);
    }

    #[test]
    fn test_decode_item_wraps_error() {
        let codec: &dyn ItemCodec = &TrackNumberItem;
        let mut c = Cursor::new(&[0x12]);
        let err = codec.decode_item(&mut c).unwrap_err();
        match err {
            AsterixError::Item { item, source } => {
                assert_eq!(item, "I062/040");
                assert!(matches!(*source, AsterixError::Underrun { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_encode_item_rejects_wrong_variant() {
        let codec: &dyn ItemCodec = &TrackNumberItem;
        let mut out = Writer::new();
        let err = codec
            .encode_item(&ItemValue::ServiceId(1), &mut out)
            .unwrap_err();
        assert!(matches!(err, AsterixError::ValueMismatch { item: "I062/040" }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_encode_item_writes_nothing_on_invalid() {
        let codec: &dyn ItemCodec = &Wgs84PositionItem;
        let mut out = Writer::new();
        out.write_u8(0xAA).unwrap();
        let bad = ItemValue::PositionWgs84(Wgs84Position {
            latitude: 91.0,
            longitude: 0.0,
        });
        assert!(codec.encode_item(&bad, &mut out).is_err());
        assert!(codec.validate_item(&bad).is_err());
        assert_eq!(out.as_slice(), &[0xAA]);
    }

    #[test]
    fn test_encode_item_respects_writer_cap() {
        let codec: &dyn ItemCodec = &Wgs84PositionItem;
        let mut out = Writer::with_limit(4);
        let value = ItemValue::PositionWgs84(Wgs84Position {
            latitude: 1.0,
            longitude: 2.0,
        });
        let err = codec.encode_item(&value, &mut out).unwrap_err();
        assert!(matches!(err.root(), AsterixError::TooLarge { len: 8, max: 4 }));
        assert!(out.is_empty());
    }
}
