/// Tolerance used whenever float geometry is snapped to the integer pixel grid.
///
/// Integer crop rects under a nearly-integer matrix must not grow by a full row or column because
/// of float noise, so rounding out shrinks by this amount first and rounding in grows by it.
pub const ROUND_EPSILON: f64 = 1e-3;

/// Scalars smaller than this are treated as zero (1/4096, matching 12 fractional bits).
pub(crate) const NEARLY_ZERO: f64 = 1.0 / 4096.0;

pub(crate) fn nearly_equal(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

pub(crate) fn nearly_zero(v: f64) -> bool {
    v.abs() <= NEARLY_ZERO
}

/// Float-to-int conversion that pins out-of-range values to the i32 limits and NaN to 0.
pub(crate) fn saturate_i32(v: f64) -> i32 {
    // `as` casts from float saturate in Rust.
    v as i32
}

/// Smallest `n` such that `1 << n >= v`, with `next_log2(0) == 0`.
pub(crate) fn next_log2(v: u32) -> u32 {
    if v <= 1 {
        return 0;
    }
    32 - (v - 1).leading_zeros()
}

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

pub(crate) fn unit_to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
