//! Numeric helpers

use rand::Rng;

/// Largest integer an `f64` represents exactly (2^53 - 1)
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;
pub const MIN_SAFE_INTEGER: i64 = -MAX_SAFE_INTEGER;

/// Uniform random integer in `[min, max]`, both ends inclusive.
///
/// Missing bounds default to the safe integer range. Reversed bounds are
/// swapped rather than rejected.
pub fn random_number(min: Option<i64>, max: Option<i64>) -> i64 {
    random_number_with(&mut rand::thread_rng(), min, max)
}

pub fn random_number_with<R: Rng>(rng: &mut R, min: Option<i64>, max: Option<i64>) -> i64 {
    let a = min.unwrap_or(MIN_SAFE_INTEGER);
    let b = max.unwrap_or(MAX_SAFE_INTEGER);
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    rng.gen_range(low..=high)
}

/// Whether `value` lies between `a` and `b`, in either order
pub fn is_between(value: f64, a: f64, b: f64, inclusive: bool) -> bool {
    let min = a.min(b);
    let max = a.max(b);
    if inclusive {
        value >= min && value <= max
    } else {
        value > min && value < max
    }
}

/// Nearest integer, ties toward positive infinity
fn round_half_up(x: f64) -> f64 {
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// Round to `digits` decimals by scaling, rounding and scaling back.
///
/// This is plain binary floating point: `round(1.005, 2)` is `1.0` because
/// `1.005 * 100` is `100.49999999999999`.
pub fn round(number: f64, digits: i32) -> f64 {
    let multiplier = 10f64.powi(digits);
    round_half_up(number * multiplier) / multiplier
}

/// [`round`], formatted as the shortest decimal that reads back the same.
/// Negative zero prints as `0`.
pub fn round_to_string(number: f64, digits: i32) -> String {
    let rounded = round(number, digits);
    // -0.0 == 0.0, so this also clears the sign
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{}", rounded)
}
