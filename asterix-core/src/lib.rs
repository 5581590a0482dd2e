//! asterix-core: ASTERIX CAT062 record codec.
//!
//! No async, no network I/O: a byte span and a UAP in, a [`Record`] out, and
//! back. This crate is the library behind the `asterix` command-line tool.

pub mod codec;
pub mod compound;
pub mod config;
pub mod cursor;
pub mod fspec;
pub mod items;
pub mod numeric;
pub mod record;
pub mod types;
pub mod uap;

// Re-export commonly used types at crate root
pub use codec::{DataItem, ItemCodec};
pub use config::{CodecConfig, Config, DecodeConfig};
pub use cursor::{Cursor, Writer};
pub use fspec::{decode_presence, encode_presence, DecodeMode, Fspec};
pub use items::ItemValue;
pub use numeric::RangePolicy;
pub use record::{
    decode_record, decode_record_exact, decode_records, encode_record, encode_record_into,
    DecodedRecord, Record,
};
pub use types::*;
pub use uap::{LengthRule, Uap, UapSlot, CAT062};
