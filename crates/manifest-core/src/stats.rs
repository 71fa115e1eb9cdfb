//! Small numeric helpers shared by the normalizer and the summary engine.

// ── Percentile helper ─────────────────────────────────────────────────────────

/// Compute the `p`-th percentile of a **sorted** slice using standard linear
/// interpolation (the same algorithm used by NumPy's `percentile` function).
///
/// Returns `None` for an empty slice.
pub fn percentile(sorted_data: &[f64], p: f64) -> Option<f64> {
    let len = sorted_data.len();
    match len {
        0 => None,
        1 => Some(sorted_data[0]),
        _ => {
            let rank = (p / 100.0) * (len as f64 - 1.0);
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            if lo == hi {
                return Some(sorted_data[lo]);
            }
            let frac = rank - lo as f64;
            Some(sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo]))
        }
    }
}

/// Median of an unsorted set of values. Even counts average the two middle
/// values.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile(&sorted, 50.0)
}

/// Arithmetic mean, `None` for an empty iterator.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
