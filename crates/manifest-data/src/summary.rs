//! Headline statistics for a (filtered) passenger table.

use manifest_core::models::{PassengerTable, SummaryStats};
use manifest_core::stats::mean;

/// Compute [`SummaryStats`] over every row of `table`.
///
/// An empty table is a valid input: the rate is `0.0` and both means are
/// `None`.
pub fn summarize(table: &PassengerTable) -> SummaryStats {
    let total_count = table.len();
    let survivor_count = table.rows.iter().filter(|p| p.has_survived()).count();

    let survival_rate = if total_count > 0 {
        survivor_count as f64 / total_count as f64 * 100.0
    } else {
        0.0
    };

    SummaryStats {
        total_count,
        survivor_count,
        survival_rate,
        mean_age: mean(table.rows.iter().filter_map(|p| p.age)),
        mean_fare: mean(table.rows.iter().filter_map(|p| p.fare)),
    }
}
