//! Dashboard filter state and the interactions that change it.
//!
//! State is owned by the caller and threaded through [`handle`]; nothing
//! here is global.

use manifest_core::error::Result;
use manifest_core::models::{AgeRange, FilterSpec, Selection};
use manifest_data::aggregator::FilterOptions;

/// The filter currently applied and the one a reset returns to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardState {
    pub filter: FilterSpec,
    pub defaults: FilterSpec,
}

impl DashboardState {
    pub fn new(defaults: FilterSpec) -> Self {
        Self {
            filter: defaults.clone(),
            defaults,
        }
    }
}

/// A user action on the filter widgets.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    SelectClass(Selection<u8>),
    SelectGender(Selection<String>),
    SetAgeRange { min: f64, max: f64 },
    /// Step through `All` and each offered class.
    CycleClass,
    /// Step through `All` and each offered sex label.
    CycleGender,
    /// Shift the age bounds, clamped to the observed span.
    NudgeAge { min_delta: f64, max_delta: f64 },
    ResetFilters,
}

/// Apply `interaction` to `state`, returning the new state.
///
/// Selecting a category that no row carries is allowed and simply yields an
/// empty view. An inverted or non-finite age range is rejected with
/// [`ManifestError::InvalidFilter`](manifest_core::ManifestError::InvalidFilter).
pub fn handle(
    mut state: DashboardState,
    interaction: &Interaction,
    options: &FilterOptions,
) -> Result<DashboardState> {
    tracing::debug!(?interaction, "dashboard interaction");

    match interaction {
        Interaction::SelectClass(class) => {
            state.filter = state.filter.with_class(class.clone());
        }
        Interaction::SelectGender(gender) => {
            state.filter = state.filter.with_gender(gender.clone());
        }
        Interaction::SetAgeRange { min, max } => {
            let range = AgeRange::new(*min, *max)?;
            state.filter = state.filter.with_age_range(Some(range));
        }
        Interaction::CycleClass => {
            let next = cycle(&state.filter.class_filter, &options.classes);
            state.filter = state.filter.with_class(next);
        }
        Interaction::CycleGender => {
            let next = cycle(&state.filter.gender_filter, &options.genders);
            state.filter = state.filter.with_gender(next);
        }
        Interaction::NudgeAge {
            min_delta,
            max_delta,
        } => {
            let nudged = nudge(
                state.filter.age_range,
                options.age_bounds,
                *min_delta,
                *max_delta,
            )?;
            if let Some(range) = nudged {
                state.filter = state.filter.with_age_range(Some(range));
            }
        }
        Interaction::ResetFilters => {
            state.filter = state.defaults.clone();
        }
    }

    Ok(state)
}

/// `All` → first choice → … → last choice → `All`. A current value that is
/// not among `choices` restarts from `All`.
fn cycle<T: Clone + PartialEq>(current: &Selection<T>, choices: &[T]) -> Selection<T> {
    let next_index = match current {
        Selection::All => 0,
        Selection::Only(value) => match choices.iter().position(|c| c == value) {
            Some(i) => i + 1,
            None => return Selection::All,
        },
    };
    choices
        .get(next_index)
        .cloned()
        .map_or(Selection::All, Selection::Only)
}

fn nudge(
    current: Option<AgeRange>,
    bounds: Option<(f64, f64)>,
    min_delta: f64,
    max_delta: f64,
) -> Result<Option<AgeRange>> {
    let Some((lo, hi)) = bounds else {
        return Ok(None);
    };
    let (cur_min, cur_max) = current.map_or((lo, hi), |r| (r.min(), r.max()));

    let mut min = (cur_min + min_delta).clamp(lo, hi);
    let mut max = (cur_max + max_delta).clamp(lo, hi);
    if min > max {
        // The bound being moved stops at the other one.
        if min_delta != 0.0 {
            min = max;
        } else {
            max = min;
        }
    }

    AgeRange::new(min, max).map(Some)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use manifest_core::error::ManifestError;

    fn options() -> FilterOptions {
        FilterOptions {
            classes: vec![1, 2, 3],
            genders: vec!["male".to_string(), "female".to_string()],
            age_bounds: Some((0.5, 80.0)),
        }
    }

    fn state() -> DashboardState {
        DashboardState::new(
            FilterSpec::all().with_age_range(Some(AgeRange::new(0.5, 80.0).unwrap())),
        )
    }

    #[test]
    fn test_select_and_reset() {
        let s = handle(state(), &Interaction::SelectClass(Selection::Only(2)), &options()).unwrap();
        let s = handle(
            s,
            &Interaction::SelectGender(Selection::Only(" Female ".to_string())),
            &options(),
        )
        .unwrap();
        assert_eq!(s.filter.class_filter, Selection::Only(2));
        assert_eq!(s.filter.gender_filter, Selection::Only("female".to_string()));

        let s = handle(s, &Interaction::ResetFilters, &options()).unwrap();
        assert_eq!(s.filter, s.defaults);
    }

    #[test]
    fn test_cycle_class_wraps_to_all() {
        let mut s = state();
        let mut seen = Vec::new();
        for _ in 0..4 {
            s = handle(s, &Interaction::CycleClass, &options()).unwrap();
            seen.push(s.filter.class_filter.clone());
        }
        assert_eq!(
            seen,
            vec![
                Selection::Only(1),
                Selection::Only(2),
                Selection::Only(3),
                Selection::All
            ]
        );
    }

    #[test]
    fn test_cycle_gender_from_unknown_value_restarts() {
        let s = handle(
            state(),
            &Interaction::SelectGender(Selection::Only("unknown".to_string())),
            &options(),
        )
        .unwrap();
        let s = handle(s, &Interaction::CycleGender, &options()).unwrap();
        assert_eq!(s.filter.gender_filter, Selection::All);
    }

    #[test]
    fn test_cycle_with_no_choices_stays_all() {
        let s = handle(state(), &Interaction::CycleClass, &FilterOptions::default()).unwrap();
        assert_eq!(s.filter.class_filter, Selection::All);
    }

    #[test]
    fn test_set_age_range_validates() {
        let s = handle(
            state(),
            &Interaction::SetAgeRange { min: 25.0, max: 35.0 },
            &options(),
        )
        .unwrap();
        assert_eq!(s.filter.age_range, Some(AgeRange::new(25.0, 35.0).unwrap()));

        let err = handle(s, &Interaction::SetAgeRange { min: 40.0, max: 30.0 }, &options());
        assert!(matches!(err, Err(ManifestError::InvalidFilter(_))));
    }

    #[test]
    fn test_nudge_age_clamps_to_bounds() {
        let s = handle(
            state(),
            &Interaction::NudgeAge { min_delta: -5.0, max_delta: 10.0 },
            &options(),
        )
        .unwrap();
        assert_eq!(s.filter.age_range, Some(AgeRange::new(0.5, 80.0).unwrap()));

        let s = handle(
            s,
            &Interaction::NudgeAge { min_delta: 5.0, max_delta: -10.0 },
            &options(),
        )
        .unwrap();
        assert_eq!(s.filter.age_range, Some(AgeRange::new(5.5, 70.0).unwrap()));
    }

    #[test]
    fn test_nudge_min_stops_at_max() {
        let s = handle(
            state(),
            &Interaction::SetAgeRange { min: 20.0, max: 22.0 },
            &options(),
        )
        .unwrap();
        let s = handle(
            s,
            &Interaction::NudgeAge { min_delta: 5.0, max_delta: 0.0 },
            &options(),
        )
        .unwrap();
        assert_eq!(s.filter.age_range, Some(AgeRange::new(22.0, 22.0).unwrap()));
    }

    #[test]
    fn test_nudge_without_ages_is_noop() {
        let s = DashboardState::new(FilterSpec::all());
        let out = handle(
            s.clone(),
            &Interaction::NudgeAge { min_delta: 1.0, max_delta: 0.0 },
            &FilterOptions::default(),
        )
        .unwrap();
        assert_eq!(out, s);
    }
}
