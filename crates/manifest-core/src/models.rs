use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{ManifestError, Result};

/// One loosely-typed row as returned by a record source.
pub type RawRecord = Map<String, Value>;

/// Placeholder written into `embarked` when the port is missing.
pub const UNKNOWN_PORT: &str = "UNKNOWN";

/// Placeholder written into `sex` when the value is missing.
pub const UNKNOWN_SEX: &str = "unknown";

/// Class value used for rows whose `pclass` could not be interpreted.
pub const INVALID_CLASS: u8 = 0;

/// Filter labels that mean "include every category".
pub const NO_FILTER_LABELS: &[&str] = &["all", "alle"];

// ── DomainPolicy ──────────────────────────────────────────────────────────────

/// What the normalizer does with out-of-domain `pclass` / `survived` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainPolicy {
    /// Replace the value with `0` and keep the row.
    #[default]
    Coerce,
    /// Remove the row from the normalized table.
    Drop,
}

// ── Passenger ─────────────────────────────────────────────────────────────────

/// A single normalized passenger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passenger {
    /// `1` when the passenger survived, `0` otherwise.
    pub survived: u8,
    /// Ticket class 1–3, or [`INVALID_CLASS`] for rows kept in coerce mode.
    pub pclass: u8,
    /// Age in years; imputed with the load median when missing.
    pub age: Option<f64>,
    /// Ticket fare; imputed with the load median when missing.
    pub fare: Option<f64>,
    /// Lowercase, trimmed sex label.
    pub sex: String,
    /// Uppercase, trimmed port code, `None` when the column does not exist.
    pub embarked: Option<String>,
    /// Every other field of the source row, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Passenger {
    pub fn has_survived(&self) -> bool {
        self.survived == 1
    }

    /// Display name taken from the pass-through fields, if the source has one.
    pub fn name(&self) -> Option<&str> {
        self.extra.get("name").and_then(|v| v.as_str())
    }
}

// ── PassengerTable ────────────────────────────────────────────────────────────

/// Which optional columns were present in the source schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnSet {
    pub fare: bool,
    pub embarked: bool,
}

/// An immutable set of normalized rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PassengerTable {
    pub columns: ColumnSet,
    pub rows: Vec<Passenger>,
}

impl PassengerTable {
    pub fn new(columns: ColumnSet, rows: Vec<Passenger>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Smallest and largest defined age, or `None` when no row has one.
    pub fn age_bounds(&self) -> Option<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|p| p.age)
            .fold(None, |acc, age| match acc {
                None => Some((age, age)),
                Some((lo, hi)) => Some((lo.min(age), hi.max(age))),
            })
    }
}

// ── Selection ─────────────────────────────────────────────────────────────────

/// A categorical filter value: either "no filter" or one exact category.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selection<T> {
    #[default]
    All,
    Only(T),
}

impl<T> Selection<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Selection::All => None,
            Selection::Only(v) => Some(v),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => write!(f, "All"),
            Selection::Only(v) => write!(f, "{}", v),
        }
    }
}

impl<T> FromStr for Selection<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    type Err = ManifestError;

    /// `"All"`, `"Alle"` (any case) and the empty string select everything.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || NO_FILTER_LABELS.contains(&trimmed.to_lowercase().as_str()) {
            return Ok(Selection::All);
        }
        trimmed
            .parse::<T>()
            .map(Selection::Only)
            .map_err(|e| ManifestError::InvalidFilter(format!("'{}': {}", trimmed, e)))
    }
}

// ── AgeRange ──────────────────────────────────────────────────────────────────

/// Inclusive age interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeRange {
    min: f64,
    max: f64,
}

impl AgeRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ManifestError::InvalidFilter(format!(
                "age bounds must be finite, got ({}, {})",
                min, max
            )));
        }
        if min > max {
            return Err(ManifestError::InvalidFilter(format!(
                "min age {} is above max age {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, age: f64) -> bool {
        age >= self.min && age <= self.max
    }
}

// ── FilterSpec ────────────────────────────────────────────────────────────────

/// The set of user-chosen predicates applied to a normalized table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    pub class_filter: Selection<u8>,
    pub gender_filter: Selection<String>,
    /// `None` places no restriction on age.
    pub age_range: Option<AgeRange>,
}

impl FilterSpec {
    /// A spec that restricts nothing.
    pub fn all() -> Self {
        Self::default()
    }

    /// "No filter" on both categories and the observed age span of `table`.
    pub fn full_range(table: &PassengerTable) -> Self {
        Self {
            class_filter: Selection::All,
            gender_filter: Selection::All,
            age_range: table
                .age_bounds()
                .map(|(min, max)| AgeRange { min, max }),
        }
    }

    pub fn with_class(mut self, class: Selection<u8>) -> Self {
        self.class_filter = class;
        self
    }

    pub fn with_gender(mut self, gender: Selection<String>) -> Self {
        self.gender_filter = match gender {
            Selection::All => Selection::All,
            Selection::Only(g) => Selection::Only(g.trim().to_lowercase()),
        };
        self
    }

    pub fn with_age_range(mut self, range: Option<AgeRange>) -> Self {
        self.age_range = range;
        self
    }
}

// ── SummaryStats ──────────────────────────────────────────────────────────────

/// Aggregate figures derived from a (filtered) table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_count: usize,
    pub survivor_count: usize,
    /// Percentage in `0.0..=100.0`; `0.0` for an empty table.
    pub survival_rate: f64,
    /// `None` when no row has an age.
    pub mean_age: Option<f64>,
    /// `None` when no row has a fare.
    pub mean_fare: Option<f64>,
}
