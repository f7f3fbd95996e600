//! Integer pixel helpers shared by the locators.

/// Truncates a floating coordinate toward zero, saturating at the `i32` range.
pub(crate) fn trunc_to_i32(value: f64) -> i32 {
    value as i32
}

/// Integer midpoint `a + (b - a) / 2`, truncating toward zero.
pub(crate) fn midpoint_i32(a: i32, b: i32) -> i32 {
    a + (b - a) / 2
}

/// Cross product of `(b - a)` and `(c - a)`.
pub(crate) fn cross(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}
