//! Numeric conversion primitives shared by every data item.
//!
//! - Two's-complement sign extension at arbitrary widths
//! - Fixed-point quantization (`raw = round(value / lsb)`, `value = raw * lsb`)
//! - Range checks and saturation under a configurable [`RangePolicy`]
//! - Mode 3/A style octal digit packing
//!
//! Rounding is always half-away-from-zero (`f64::round`).

use serde::{Deserialize, Serialize};

use crate::types::{AsterixError, Result};

/// What an encoder does with a physical value outside its field's range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Fail with `InvalidValue`.
    #[default]
    Reject,
    /// Clamp to the nearest representable value.
    Saturate,
}

impl std::fmt::Display for RangePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangePolicy::Reject => write!(f, "reject"),
            RangePolicy::Saturate => write!(f, "saturate"),
        }
    }
}

impl std::str::FromStr for RangePolicy {
    type Err = AsterixError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reject" => Ok(RangePolicy::Reject),
            "saturate" => Ok(RangePolicy::Saturate),
            other => Err(AsterixError::Config(format!("unknown range policy: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Sign extension
// ---------------------------------------------------------------------------

/// Interpret the low `width` bits of `raw` as a two's-complement integer.
///
/// Bits above `width` are ignored. `width` must be in `1..=32`.
pub fn sign_extend(raw: u32, width: u32) -> i32 {
    debug_assert!((1..=32).contains(&width));
    let raw = mask(raw as i64, width);
    let sign = 1i64 << (width - 1);
    if raw & sign != 0 {
        (raw - (1i64 << width)) as i32
    } else {
        raw as i32
    }
}

/// Two's-complement bit pattern of `value` truncated to `width` bits.
///
/// Callers check the range first; this only masks.
pub fn to_twos_complement(value: i64, width: u32) -> u32 {
    mask(value, width) as u32
}

fn mask(value: i64, width: u32) -> i64 {
    value & ((1i64 << width) - 1)
}

/// Inclusive range of a signed `width`-bit integer.
pub fn signed_bounds(width: u32) -> (i64, i64) {
    let half = 1i64 << (width - 1);
    (-half, half - 1)
}

/// Largest value of an unsigned `width`-bit integer.
pub fn unsigned_max(width: u32) -> i64 {
    (1i64 << width) - 1
}

// ---------------------------------------------------------------------------
// Fixed-point quantization
// ---------------------------------------------------------------------------

/// Physical value → raw count, rounding half away from zero.
pub fn quantize(value: f64, lsb: f64) -> i64 {
    (value / lsb).round() as i64
}

/// Raw count → physical value.
pub fn dequantize(raw: i64, lsb: f64) -> f64 {
    raw as f64 * lsb
}

/// Quantize `value` into a signed field of `width` bits.
pub fn quantize_signed(item: &'static str, value: f64, lsb: f64, width: u32) -> Result<u32> {
    check_finite(item, value)?;
    let raw = quantize(value, lsb);
    let (min, max) = signed_bounds(width);
    if raw < min || raw > max {
        return Err(AsterixError::invalid(
            item,
            format!("{value} does not fit a {width}-bit signed field with LSB {lsb}"),
        ));
    }
    Ok(to_twos_complement(raw, width))
}

/// Quantize `value` into an unsigned field of `width` bits, saturating or
/// rejecting out-of-range values according to `policy`.
pub fn quantize_unsigned(
    item: &'static str,
    value: f64,
    lsb: f64,
    width: u32,
    policy: RangePolicy,
) -> Result<u32> {
    check_finite(item, value)?;
    let raw = quantize(value, lsb);
    let max = unsigned_max(width);
    if (0..=max).contains(&raw) {
        return Ok(raw as u32);
    }
    match policy {
        RangePolicy::Saturate => Ok(raw.clamp(0, max) as u32),
        RangePolicy::Reject => Err(AsterixError::invalid(
            item,
            format!(
                "{value} outside [0, {}] for a {width}-bit field",
                dequantize(max, lsb)
            ),
        )),
    }
}

/// Quantize a cyclic quantity (azimuth, time of day) into `modulus` raw
/// steps. Values that round up to a full cycle wrap to 0.
pub fn quantize_wrapping(item: &'static str, value: f64, lsb: f64, modulus: i64) -> Result<u32> {
    check_finite(item, value)?;
    Ok(quantize(value, lsb).rem_euclid(modulus) as u32)
}

// ---------------------------------------------------------------------------
// Range checks
// ---------------------------------------------------------------------------

pub fn check_finite(item: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AsterixError::invalid(item, format!("{value} is not finite")))
    }
}

/// `min <= value <= max`.
pub fn check_range(item: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    check_finite(item, value)?;
    if value < min || value > max {
        return Err(AsterixError::invalid(
            item,
            format!("{value} outside [{min}, {max}]"),
        ));
    }
    Ok(())
}

/// `min <= value < max`.
pub fn check_half_open(item: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    check_finite(item, value)?;
    if value < min || value >= max {
        return Err(AsterixError::invalid(
            item,
            format!("{value} outside [{min}, {max})"),
        ));
    }
    Ok(())
}

/// Fail unless `value` fits in `width` bits.
pub fn check_bits(item: &'static str, value: u32, width: u32) -> Result<()> {
    if value as i64 > unsigned_max(width) {
        return Err(AsterixError::invalid(
            item,
            format!("{value:#X} does not fit in {width} bits"),
        ));
    }
    Ok(())
}

/// Larger of two partially ordered values, preferring `a` on ties.
pub fn max_of<T: PartialOrd>(a: T, b: T) -> T {
    if b > a { b } else { a }
}

// ---------------------------------------------------------------------------
// Octal digits
// ---------------------------------------------------------------------------

/// Split a 12-bit code into four 3-bit digits, most significant first.
pub fn pack_octal_digits(code: u16) -> [u8; 4] {
    [
        ((code >> 9) & 0x7) as u8,
        ((code >> 6) & 0x7) as u8,
        ((code >> 3) & 0x7) as u8,
        (code & 0x7) as u8,
    ]
}

/// Join four octal digits back into a 12-bit code.
pub fn unpack_octal_digits(item: &'static str, digits: [u8; 4]) -> Result<u16> {
    let mut code = 0u16;
    for d in digits {
        if d > 7 {
            return Err(AsterixError::invalid(item, format!("octal digit {d} > 7")));
        }
        code = (code << 3) | d as u16;
    }
    Ok(code)
}

/// Render a 12-bit code as four octal digits, e.g. `7700`.
pub fn octal_string(code: u16) -> String {
    let [a, b, c, d] = pack_octal_digits(code);
    format!("{a}{b}{c}{d}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sign_extend_24bit_boundaries() {
        assert_eq!(sign_extend(0x800000, 24), -8388608);
        assert_eq!(sign_extend(0x7FFFFF, 24), 8388607);
        assert_eq!(sign_extend(0, 24), 0);
        assert_eq!(sign_extend(0xFFFFFF, 24), -1);
    }

    #[test]
    fn test_sign_extend_other_widths() {
        assert_eq!(sign_extend(0x80, 8), -128);
        assert_eq!(sign_extend(0x7F, 8), 127);
        assert_eq!(sign_extend(0x800, 12), -2048);
        assert_eq!(sign_extend(0x1000, 13), -4096);
        assert_eq!(sign_extend(0x2000, 14), -8192);
        assert_eq!(sign_extend(0x4000, 15), -16384);
        assert_eq!(sign_extend(0x8000, 16), -32768);
        assert_eq!(sign_extend(0x80000000, 32), i32::MIN);
        assert_eq!(sign_extend(0x7FFFFFFF, 32), i32::MAX);
        assert_eq!(sign_extend(0xFF33_3333, 32), -13421773);
    }

    #[test]
    fn test_sign_extend_ignores_high_bits() {
        assert_eq!(sign_extend(0xFF_000001, 24), 1);
    }

    #[test]
    fn test_twos_complement_inverse() {
        for width in [8, 12, 13, 14, 16, 24, 32] {
            let (min, max) = signed_bounds(width);
            for v in [min, -1, 0, 1, max] {
                assert_eq!(sign_extend(to_twos_complement(v, width), width) as i64, v);
            }
        }
    }

    #[test]
    fn test_quantize_rounds_half_away_from_zero() {
        assert_eq!(quantize(0.125, 0.25), 1);
        assert_eq!(quantize(-0.125, 0.25), -1);
        assert_eq!(quantize(3.124, 6.25), 0);
        assert_eq!(quantize(3.125, 6.25), 1);
        assert_eq!(quantize(1.0 / 256.0, 1.0 / 128.0), 1);
    }

    #[test]
    fn test_quantize_roundtrip_within_half_lsb() {
        for lsb in [0.25, 6.25, 1.0 / 128.0, 180.0 / 33554432.0] {
            for value in [-123.456, 0.0, 0.1, 99.99, 1234.5678] {
                let back = dequantize(quantize(value, lsb), lsb);
                assert!((back - value).abs() <= lsb / 2.0 + 1e-12);
            }
        }
    }

    #[test]
    fn test_quantize_signed_rejects_overflow() {
        assert_eq!(quantize_signed("t", -0.25, 0.25, 16).unwrap(), 0xFFFF);
        assert!(quantize_signed("t", 8192.0, 0.25, 16).is_err());
        assert!(quantize_signed("t", f64::NAN, 0.25, 16).is_err());
    }

    #[test]
    fn test_quantize_unsigned_policy() {
        assert!(quantize_unsigned("t", 64.0, 0.25, 8, RangePolicy::Reject).is_err());
        assert_eq!(
            quantize_unsigned("t", 64.0, 0.25, 8, RangePolicy::Saturate).unwrap(),
            255
        );
        assert_eq!(
            quantize_unsigned("t", -1.0, 0.25, 8, RangePolicy::Saturate).unwrap(),
            0
        );
        assert_eq!(
            quantize_unsigned("t", 63.75, 0.25, 8, RangePolicy::Reject).unwrap(),
            255
        );
    }

    #[test]
    fn test_quantize_wrapping_full_cycle() {
        assert_eq!(quantize_wrapping("t", 359.999, 360.0 / 65536.0, 1 << 16).unwrap(), 0);
        assert_eq!(quantize_wrapping("t", 180.0, 360.0 / 65536.0, 1 << 16).unwrap(), 0x8000);
        assert_eq!(quantize_wrapping("t", 86_399.999, 1.0 / 128.0, 86_400 * 128).unwrap(), 0);
        assert!(quantize_wrapping("t", f64::INFINITY, 1.0, 8).is_err());
    }

    #[test]
    fn test_ranges() {
        assert!(check_range("lat", 90.0, -90.0, 90.0).is_ok());
        assert!(check_range("lat", 90.1, -90.0, 90.0).is_err());
        assert!(check_half_open("lon", -180.0, -180.0, 180.0).is_ok());
        assert!(check_half_open("lon", 180.0, -180.0, 180.0).is_err());
        assert!(check_bits("code", 0xFFF, 12).is_ok());
        assert!(check_bits("code", 0x1000, 12).is_err());
        assert_abs_diff_eq!(max_of(1.5, 2.5), 2.5);
        assert_eq!(max_of(3, 1), 3);
    }

    #[test]
    fn test_octal_digits() {
        assert_eq!(pack_octal_digits(0o7700), [7, 7, 0, 0]);
        assert_eq!(pack_octal_digits(0o1234), [1, 2, 3, 4]);
        assert_eq!(unpack_octal_digits("t", [7, 5, 0, 0]).unwrap(), 0o7500);
        assert!(unpack_octal_digits("t", [8, 0, 0, 0]).is_err());
        assert_eq!(octal_string(0o7600), "7600");
        assert_eq!(octal_string(0o0017), "0017");
    }

    #[test]
    fn test_range_policy_parse() {
        assert_eq!("saturate".parse::<RangePolicy>().unwrap(), RangePolicy::Saturate);
        assert_eq!(RangePolicy::Reject.to_string(), "reject");
        assert!("clamp".parse::<RangePolicy>().is_err());
    }
}
