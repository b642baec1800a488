//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 (half away from zero) and clamp it to the i32 range, returning 0 for NaN.
#[must_use]
pub fn round_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    cast::<f64, i32>(clamped).unwrap_or(0)
}

/// Floor a f64 and clamp it to the i32 range, returning 0 for NaN.
#[must_use]
pub fn floor_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).floor();
    cast::<f64, i32>(clamped).unwrap_or(0)
}

/// Saturating narrowing from i64 to i32.
#[must_use]
pub fn saturate_i64_to_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Clamp a scalar into `[0, max]`, mapping NaN to zero.
#[must_use]
pub fn clamp_unit_scalar(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, max.max(0.0))
}

/// Reinterpret a signed seed as its unsigned bit pattern.
#[must_use]
pub const fn seed_bits(value: i64) -> u64 {
    u64::from_le_bytes(value.to_le_bytes())
}
