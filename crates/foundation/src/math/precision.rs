//! Float ordering for hit sorting.

use core::cmp::Ordering;

fn ordering_key(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Total order where `-0.0 == 0.0` and every NaN compares equal to every other NaN,
/// after all numbers.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    ordering_key(a).total_cmp(&ordering_key(b))
}
