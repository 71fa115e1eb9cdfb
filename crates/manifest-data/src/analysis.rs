//! One filter pass: normalized table + filter spec → everything a view needs.

use serde::Serialize;

use manifest_core::models::{FilterSpec, PassengerTable, SummaryStats};

use crate::aggregator::{
    AgeBin, BreakdownAggregator, ClassOutcome, FilterOptions, GenderCount, DEFAULT_AGE_BINS,
};
use crate::filter::apply_filter;
use crate::summary::summarize;

/// Chart-ready groupings of a filtered table.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Breakdowns {
    pub survival_by_class: Vec<ClassOutcome>,
    pub gender_distribution: Vec<GenderCount>,
    pub age_histogram: Vec<AgeBin>,
}

impl Breakdowns {
    pub fn from_table(table: &PassengerTable, age_bins: usize) -> Self {
        Self {
            survival_by_class: BreakdownAggregator::survival_by_class(table),
            gender_distribution: BreakdownAggregator::gender_distribution(table),
            age_histogram: BreakdownAggregator::age_histogram(table, age_bins),
        }
    }
}

/// The derived view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DashboardView {
    /// The filter this view was computed for.
    pub spec: FilterSpec,
    /// Rows that passed the filter.
    pub filtered: PassengerTable,
    pub summary: SummaryStats,
    pub breakdowns: Breakdowns,
    /// Choices computed from the unfiltered table.
    pub options: FilterOptions,
    /// Row count of the unfiltered table.
    pub source_rows: usize,
}

impl DashboardView {
    /// `true` when no row passed the filter.
    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }
}

/// Filter `table` by `spec` and derive the summary and breakdowns.
pub fn build_view(table: &PassengerTable, spec: &FilterSpec) -> DashboardView {
    build_view_with_bins(table, spec, DEFAULT_AGE_BINS)
}

/// [`build_view`] with an explicit histogram resolution.
pub fn build_view_with_bins(
    table: &PassengerTable,
    spec: &FilterSpec,
    age_bins: usize,
) -> DashboardView {
    let filtered = apply_filter(table, spec);
    let summary = summarize(&filtered);
    let breakdowns = Breakdowns::from_table(&filtered, age_bins);

    DashboardView {
        spec: spec.clone(),
        summary,
        breakdowns,
        options: FilterOptions::from_table(table),
        source_rows: table.len(),
        filtered,
    }
}
