//! Conjunctive row filtering over a normalized [`PassengerTable`].

use manifest_core::models::{FilterSpec, Passenger, PassengerTable};

/// `true` when `passenger` satisfies every predicate of `spec`.
///
/// Gender compares trimmed and case-insensitively. A row with no age fails
/// any explicit age range.
pub fn matches(passenger: &Passenger, spec: &FilterSpec) -> bool {
    let class_ok = spec
        .class_filter
        .as_option()
        .map_or(true, |class| passenger.pclass == *class);

    let gender_ok = spec
        .gender_filter
        .as_option()
        .map_or(true, |gender| {
            passenger.sex.to_lowercase() == gender.trim().to_lowercase()
        });

    let age_ok = match spec.age_range {
        None => true,
        Some(range) => passenger.age.is_some_and(|age| range.contains(age)),
    };

    class_ok && gender_ok && age_ok
}

/// Return the rows of `table` that match `spec`, in their original order.
///
/// The source table is left untouched; the column set carries over.
pub fn apply_filter(table: &PassengerTable, spec: &FilterSpec) -> PassengerTable {
    let rows = table
        .rows
        .iter()
        .filter(|p| matches(p, spec))
        .cloned()
        .collect();
    PassengerTable::new(table.columns, rows)
}
