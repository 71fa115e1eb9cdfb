//! Grouped breakdowns behind the dashboard charts, and the filter choices
//! offered to the presentation layer.

use std::collections::BTreeMap;

use serde::Serialize;

use manifest_core::models::PassengerTable;

/// Number of bins used by the age histogram when the caller has no preference.
pub const DEFAULT_AGE_BINS: usize = 50;

// ── Breakdown types ───────────────────────────────────────────────────────────

/// Survivors and casualties within one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub survived: usize,
    pub perished: usize,
}

impl Outcome {
    fn record(&mut self, survived: bool) {
        if survived {
            self.survived += 1;
        } else {
            self.perished += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.survived + self.perished
    }
}

/// Outcome counts for one ticket class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassOutcome {
    pub pclass: u8,
    pub outcome: Outcome,
}

/// Number of passengers with one sex label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenderCount {
    pub sex: String,
    pub count: usize,
}

/// One equal-width age bin; `upper` is inclusive only for the last bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeBin {
    pub lower: f64,
    pub upper: f64,
    pub outcome: Outcome,
}

// ── BreakdownAggregator ───────────────────────────────────────────────────────

/// Stateless helper that groups passengers for the charts.
pub struct BreakdownAggregator;

impl BreakdownAggregator {
    /// Survival per class, ascending by class.
    pub fn survival_by_class(table: &PassengerTable) -> Vec<ClassOutcome> {
        let mut groups: BTreeMap<u8, Outcome> = BTreeMap::new();
        for p in &table.rows {
            groups.entry(p.pclass).or_default().record(p.has_survived());
        }
        groups
            .into_iter()
            .map(|(pclass, outcome)| ClassOutcome { pclass, outcome })
            .collect()
    }

    /// Passenger count per sex, largest group first, ties by label.
    pub fn gender_distribution(table: &PassengerTable) -> Vec<GenderCount> {
        let mut groups: BTreeMap<&str, usize> = BTreeMap::new();
        for p in &table.rows {
            *groups.entry(p.sex.as_str()).or_default() += 1;
        }
        let mut counts: Vec<GenderCount> = groups
            .into_iter()
            .map(|(sex, count)| GenderCount {
                sex: sex.to_string(),
                count,
            })
            .collect();
        // BTreeMap order already sorts by label; a stable sort keeps it for ties.
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts
    }

    /// Equal-width age histogram split by outcome.
    ///
    /// Rows without an age are skipped. Returns no bins for `bins == 0` or
    /// when no row has an age. A zero-width span yields a single bin.
    pub fn age_histogram(table: &PassengerTable, bins: usize) -> Vec<AgeBin> {
        let Some((lo, hi)) = table.age_bounds() else {
            return Vec::new();
        };
        if bins == 0 {
            return Vec::new();
        }

        let bins = if hi > lo { bins } else { 1 };
        let width = (hi - lo) / bins as f64;

        let mut histogram: Vec<AgeBin> = (0..bins)
            .map(|i| AgeBin {
                lower: lo + width * i as f64,
                upper: if i + 1 == bins {
                    hi
                } else {
                    lo + width * (i + 1) as f64
                },
                outcome: Outcome::default(),
            })
            .collect();

        for p in &table.rows {
            let Some(age) = p.age else { continue };
            let index = if width > 0.0 {
                (((age - lo) / width).floor() as usize).min(bins - 1)
            } else {
                0
            };
            histogram[index].outcome.record(p.has_survived());
        }

        histogram
    }
}

// ── FilterOptions ─────────────────────────────────────────────────────────────

/// The choices a filter widget can offer for a table.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FilterOptions {
    /// Distinct classes, ascending.
    pub classes: Vec<u8>,
    /// Distinct sex labels in first-seen order.
    pub genders: Vec<String>,
    /// Observed `(min, max)` age, `None` when no row has an age.
    pub age_bounds: Option<(f64, f64)>,
}

impl FilterOptions {
    pub fn from_table(table: &PassengerTable) -> Self {
        let mut classes: Vec<u8> = table.rows.iter().map(|p| p.pclass).collect();
        classes.sort_unstable();
        classes.dedup();

        let mut genders: Vec<String> = Vec::new();
        for p in &table.rows {
            if !genders.contains(&p.sex) {
                genders.push(p.sex.clone());
            }
        }

        Self {
            classes,
            genders,
            age_bounds: table.age_bounds(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
