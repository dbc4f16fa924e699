//! Fixed-point quantization helpers.
//!
//! Each helper returns the raw stored value and whether the input had to be
//! clamped to fit. Missing values map to the field's sentinel and are not
//! counted as clamps; NaN is treated as out of range.

/// Quantize an optional non-negative quantity onto `0..=max` in steps of
/// `1/scale`, reserving `sentinel` for a missing value.
pub(crate) fn unsigned(value: Option<f64>, scale: f64, max: u32, sentinel: u32) -> (u32, bool) {
    let Some(v) = value else {
        return (sentinel, false);
    };
    if v.is_nan() {
        return (sentinel, true);
    }
    let raw = (v * scale).round();
    if raw < 0.0 {
        (0, true)
    } else if raw > f64::from(max) {
        (max, true)
    } else {
        (raw as u32, false)
    }
}

/// Signed counterpart of [`unsigned`], onto `min..=max`.
pub(crate) fn signed(
    value: Option<f64>,
    scale: f64,
    min: i32,
    max: i32,
    sentinel: i32,
) -> (i32, bool) {
    let Some(v) = value else {
        return (sentinel, false);
    };
    if v.is_nan() {
        return (sentinel, true);
    }
    let raw = (v * scale).round();
    if raw < f64::from(min) {
        (min, true)
    } else if raw > f64::from(max) {
        (max, true)
    } else {
        (raw as i32, false)
    }
}

/// Clamp an integer into `min..=max`.
pub(crate) fn clamp_int(value: i64, min: i64, max: i64) -> (i64, bool) {
    if value < min {
        (min, true)
    } else if value > max {
        (max, true)
    } else {
        (value, false)
    }
}

/// Inverse of [`unsigned`]: `None` for the sentinel.
pub(crate) fn dequantize_unsigned(raw: u32, scale: f64, sentinel: u32) -> Option<f64> {
    (raw != sentinel).then(|| f64::from(raw) / scale)
}

/// Inverse of [`signed`]: `None` for the sentinel.
pub(crate) fn dequantize_signed(raw: i32, scale: f64, sentinel: i32) -> Option<f64> {
    (raw != sentinel).then(|| f64::from(raw) / scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_clamps_both_ends() {
        assert_eq!(unsigned(Some(-1.0), 64.0, 100, 0xFFFF), (0, true));
        assert_eq!(unsigned(Some(1e9), 64.0, 100, 0xFFFF), (100, true));
        assert_eq!(unsigned(Some(f64::INFINITY), 1.0, 254, 255), (254, true));
        assert_eq!(unsigned(Some(f64::NAN), 1.0, 254, 255), (255, true));
        assert_eq!(unsigned(None, 1.0, 254, 255), (255, false));
        assert_eq!(unsigned(Some(0.5), 254.0, 254, 255), (127, false));
    }

    #[test]
    fn test_signed_rounds_to_half_points() {
        assert_eq!(signed(Some(-3.5), 2.0, -127, 127, -128), (-7, false));
        assert_eq!(signed(Some(-100.0), 2.0, -127, 127, -128), (-127, true));
        assert_eq!(signed(Some(f64::NEG_INFINITY), 2.0, -127, 127, -128), (-127, true));
        assert_eq!(dequantize_signed(-7, 2.0, -128), Some(-3.5));
        assert_eq!(dequantize_signed(-128, 2.0, -128), None);
    }

    #[test]
    fn test_clamp_int() {
        assert_eq!(clamp_int(-5, 0, 255), (0, true));
        assert_eq!(clamp_int(300, 0, 255), (255, true));
        assert_eq!(clamp_int(42, 0, 255), (42, false));
    }
}
