//! Small numeric helpers shared by the aggregators and plots.

use itertools::Itertools;

/// Percentile of `values` using linear interpolation between closest ranks
/// (numpy's default). `q` is in `[0, 100]`. Non-finite values are ignored;
/// returns `None` when nothing is left.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    let sorted: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .sorted_by(|a, b| a.total_cmp(b))
        .collect();
    percentile_sorted(&sorted, q)
}

/// As [`percentile`] but for already sorted, finite input.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 100.0);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Round half away from zero to `digits` decimals.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// `numerator / denominator`, or `None` when the denominator is zero or the
/// result is not finite.
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator).filter(|v| v.is_finite())
}
