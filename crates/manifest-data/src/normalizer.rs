//! Turns loosely-typed source rows into a typed [`PassengerTable`].
//!
//! The normalizer is a pure function over borrowed input: it never mutates
//! the raw rows and performs no I/O or logging. Values that cannot be
//! converted are recovered locally (median, sentinel or drop, depending on
//! the column and the [`DomainPolicy`]) and reported as
//! [`CoercionWarning`]s in the [`NormalizeReport`].

use serde::Serialize;
use serde_json::{Map, Value};

use manifest_core::error::{Result, SchemaError};
use manifest_core::models::{
    ColumnSet, DomainPolicy, Passenger, PassengerTable, RawRecord, INVALID_CLASS, UNKNOWN_PORT,
    UNKNOWN_SEX,
};
use manifest_core::stats::median;

/// Columns the filter and summary engine cannot work without.
pub const REQUIRED_COLUMNS: &[&str] = &["survived", "pclass", "sex", "age"];

/// Every column the normalizer interprets; the rest pass through as `extra`.
const KNOWN_COLUMNS: &[&str] = &["survived", "pclass", "age", "fare", "sex", "embarked"];

const SURVIVED_DOMAIN: &[i64] = &[0, 1];
const CLASS_DOMAIN: &[i64] = &[1, 2, 3];

// ── Report types ──────────────────────────────────────────────────────────────

/// Why a value could not be used as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionKind {
    /// A required code (`pclass` / `survived`) was absent or null.
    Missing,
    /// The value could not be read as a number.
    NotNumeric,
    /// The value is numeric but outside the column's domain.
    OutOfDomain,
}

/// A value that was replaced or whose row was dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoercionWarning {
    /// Zero-based index into the raw input.
    pub row: usize,
    pub column: &'static str,
    pub value: Value,
    pub kind: CoercionKind,
}

/// Bookkeeping produced alongside the normalized table.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NormalizeReport {
    pub rows_in: usize,
    pub rows_out: usize,
    /// Rows removed under [`DomainPolicy::Drop`].
    pub dropped: usize,
    /// Median used to fill missing ages, `None` when no age was numeric.
    pub age_median: Option<f64>,
    /// Median used to fill missing fares, `None` when no fare was numeric.
    pub fare_median: Option<f64>,
    pub age_imputed: usize,
    pub fare_imputed: usize,
    pub warnings: Vec<CoercionWarning>,
}

/// The cleaned table and how it was produced.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Normalized {
    pub table: PassengerTable,
    pub report: NormalizeReport,
}

// ── Cell readers ──────────────────────────────────────────────────────────────

/// A raw field read as a number.
enum NumericCell<'a> {
    Missing,
    Number(f64),
    Invalid(&'a Value),
}

fn read_numeric<'a>(raw: &'a RawRecord, column: &str) -> NumericCell<'a> {
    let Some(value) = raw.get(column) else {
        return NumericCell::Missing;
    };
    let parsed = match value {
        Value::Null => return NumericCell::Missing,
        Value::String(s) if s.trim().is_empty() => return NumericCell::Missing,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Array(_) | Value::Object(_) => None,
    };
    match parsed.filter(|v| v.is_finite()) {
        Some(v) => NumericCell::Number(v),
        None => NumericCell::Invalid(value),
    }
}

fn read_text(raw: &RawRecord, column: &str) -> Option<String> {
    let text = match raw.get(column)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn has_column(rows: &[RawRecord], column: &str) -> bool {
    rows.iter().any(|r| r.contains_key(column))
}

// ── Column coercion ───────────────────────────────────────────────────────────

/// Read an integer code constrained to `domain`. `None` means the value is
/// unusable; a warning has already been recorded.
fn coerce_code(
    row: usize,
    raw: &RawRecord,
    column: &'static str,
    domain: &[i64],
    warnings: &mut Vec<CoercionWarning>,
) -> Option<u8> {
    let (value, kind) = match read_numeric(raw, column) {
        NumericCell::Number(v) if v.fract() == 0.0 && domain.contains(&(v as i64)) => {
            return Some(v as u8);
        }
        NumericCell::Number(_) => (raw[column].clone(), CoercionKind::OutOfDomain),
        NumericCell::Invalid(v) => (v.clone(), CoercionKind::NotNumeric),
        NumericCell::Missing => (
            raw.get(column).cloned().unwrap_or(Value::Null),
            CoercionKind::Missing,
        ),
    };
    warnings.push(CoercionWarning {
        row,
        column,
        value,
        kind,
    });
    None
}

/// Read a continuous measurement; `None` means missing (to be imputed).
fn coerce_measure(
    row: usize,
    raw: &RawRecord,
    column: &'static str,
    warnings: &mut Vec<CoercionWarning>,
) -> Option<f64> {
    match read_numeric(raw, column) {
        NumericCell::Number(v) => Some(v),
        NumericCell::Missing => None,
        NumericCell::Invalid(v) => {
            warnings.push(CoercionWarning {
                row,
                column,
                value: v.clone(),
                kind: CoercionKind::NotNumeric,
            });
            None
        }
    }
}

fn median_of(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    median(&present)
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Normalize a raw record set.
///
/// * Empty input → [`SchemaError::EmptyTable`].
/// * A column in [`REQUIRED_COLUMNS`] absent from every row →
///   [`SchemaError::MissingColumn`]. `fare` and `embarked` are optional.
/// * `age` / `fare`: missing or non-numeric values are replaced by the median
///   of the numeric values of the whole load (computed before any row is
///   dropped). When a column has no numeric value at all it stays `None`.
/// * `survived` / `pclass`: invalid values become `0` under
///   [`DomainPolicy::Coerce`], or drop the row under [`DomainPolicy::Drop`].
/// * `sex` is lowercased, `embarked` uppercased, both trimmed; blanks become
///   `"unknown"` / `"UNKNOWN"`.
pub fn normalize(rows: &[RawRecord], policy: DomainPolicy) -> Result<Normalized> {
    if rows.is_empty() {
        return Err(SchemaError::EmptyTable.into());
    }
    if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !has_column(rows, c)) {
        return Err(SchemaError::MissingColumn(missing.to_string()).into());
    }

    let columns = ColumnSet {
        fare: has_column(rows, "fare"),
        embarked: has_column(rows, "embarked"),
    };

    let mut warnings: Vec<CoercionWarning> = Vec::new();

    let ages: Vec<Option<f64>> = rows
        .iter()
        .enumerate()
        .map(|(i, raw)| coerce_measure(i, raw, "age", &mut warnings))
        .collect();
    let fares: Vec<Option<f64>> = if columns.fare {
        rows.iter()
            .enumerate()
            .map(|(i, raw)| coerce_measure(i, raw, "fare", &mut warnings))
            .collect()
    } else {
        vec![None; rows.len()]
    };

    let age_median = median_of(&ages);
    let fare_median = median_of(&fares);

    let mut report = NormalizeReport {
        rows_in: rows.len(),
        age_median,
        fare_median,
        ..Default::default()
    };

    let mut passengers: Vec<Passenger> = Vec::with_capacity(rows.len());

    for (i, raw) in rows.iter().enumerate() {
        let survived = coerce_code(i, raw, "survived", SURVIVED_DOMAIN, &mut warnings);
        let pclass = coerce_code(i, raw, "pclass", CLASS_DOMAIN, &mut warnings);

        let (survived, pclass) = match (survived, pclass, policy) {
            (Some(s), Some(c), _) => (s, c),
            (_, _, DomainPolicy::Drop) => {
                report.dropped += 1;
                continue;
            }
            (s, c, DomainPolicy::Coerce) => (s.unwrap_or(0), c.unwrap_or(INVALID_CLASS)),
        };

        let age = match ages[i] {
            Some(v) => Some(v),
            None => {
                if age_median.is_some() {
                    report.age_imputed += 1;
                }
                age_median
            }
        };

        let fare = match fares[i] {
            Some(v) => Some(v),
            None if columns.fare => {
                if fare_median.is_some() {
                    report.fare_imputed += 1;
                }
                fare_median
            }
            None => None,
        };

        let sex = read_text(raw, "sex")
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| UNKNOWN_SEX.to_string());

        let embarked = columns.embarked.then(|| {
            read_text(raw, "embarked")
                .map(|s| s.to_uppercase())
                .unwrap_or_else(|| UNKNOWN_PORT.to_string())
        });

        let extra: Map<String, Value> = raw
            .iter()
            .filter(|(k, _)| !KNOWN_COLUMNS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        passengers.push(Passenger {
            survived,
            pclass,
            age,
            fare,
            sex,
            embarked,
            extra,
        });
    }

    report.rows_out = passengers.len();
    report.warnings = warnings;

    Ok(Normalized {
        table: PassengerTable::new(columns, passengers),
        report,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use manifest_core::ManifestError;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Vec<RawRecord> {
        values
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => map,
                other => panic!("fixture must be an object, got {other}"),
            })
            .collect()
    }

    /// The three-row example used throughout the dashboard docs.
    fn sample() -> Vec<RawRecord> {
        records(vec![
            json!({"pclass": 1, "survived": 1, "age": 29, "sex": "Female"}),
            json!({"pclass": 3, "survived": 0, "age": 2, "sex": "male"}),
            json!({"pclass": 1, "survived": 1, "age": null, "fare": null}),
        ])
    }

    #[test]
    fn test_missing_age_imputed_with_median() {
        let out = normalize(&sample(), DomainPolicy::Coerce).unwrap();
        let rows = &out.table.rows;
        assert_eq!(rows[2].age, Some(15.5));
        assert_eq!(out.report.age_median, Some(15.5));
        assert_eq!(out.report.age_imputed, 1);
    }

    #[test]
    fn test_all_missing_fare_stays_undefined() {
        let out = normalize(&sample(), DomainPolicy::Coerce).unwrap();
        assert!(out.table.columns.fare);
        assert!(out.table.rows.iter().all(|p| p.fare.is_none()));
        assert_eq!(out.report.fare_median, None);
        assert_eq!(out.report.fare_imputed, 0);
    }

    #[test]
    fn test_all_missing_age_stays_undefined() {
        let rows = records(vec![
            json!({"pclass": 1, "survived": 1, "age": null, "sex": "female", "fare": 30}),
            json!({"pclass": 2, "survived": 0, "age": "unknown", "sex": "male", "fare": 13}),
            json!({"pclass": 3, "survived": 0, "age": "", "sex": "male", "fare": 7.25}),
        ]);
        let out = normalize(&rows, DomainPolicy::Coerce).unwrap();

        assert!(out.table.rows.iter().all(|p| p.age.is_none()));
        assert_eq!(out.table.age_bounds(), None);
        assert_eq!(out.report.age_median, None);
        assert_eq!(out.report.age_imputed, 0);
        // Only the unparseable text is reported; null and blank are plain gaps.
        assert_eq!(out.report.warnings.len(), 1);
        assert_eq!(out.report.warnings[0].kind, CoercionKind::NotNumeric);
        // Fare is unaffected.
        assert_eq!(out.table.rows[2].fare, Some(7.25));
    }

    #[test]
    fn test_even_count_median_imputation() {
        let rows = records(vec![
            json!({"pclass": 1, "survived": 1, "age": 10, "sex": "male", "fare": 10}),
            json!({"pclass": 2, "survived": 0, "age": 20, "sex": "male", "fare": "20"}),
            json!({"pclass": 3, "survived": 0, "age": null, "sex": "male", "fare": ""}),
        ]);
        let out = normalize(&rows, DomainPolicy::Coerce).unwrap();
        assert_eq!(out.table.rows[2].age, Some(15.0));
        assert_eq!(out.table.rows[2].fare, Some(15.0));
    }

    #[test]
    fn test_no_missing_measures_after_normalization() {
        let rows = records(vec![
            json!({"pclass": 1, "survived": 1, "age": "38", "sex": "female", "fare": 71.28}),
            json!({"pclass": 3, "survived": 0, "age": "unknown", "sex": "male", "fare": null}),
            json!({"pclass": 3, "survived": 0, "sex": "male", "fare": 7.25}),
        ]);
        let out = normalize(&rows, DomainPolicy::Coerce).unwrap();
        for p in &out.table.rows {
            assert!(p.age.is_some());
            assert!(p.fare.is_some());
        }
    }

    #[test]
    fn test_text_columns_case_normalized() {
        let rows = records(vec![
            json!({"pclass": 1, "survived": 1, "age": 29, "sex": "  FeMale ", "embarked": " s"}),
            json!({"pclass": 2, "survived": 0, "age": 40, "sex": "MALE", "embarked": null}),
            json!({"pclass": 2, "survived": 0, "age": 40, "sex": "", "embarked": "  "}),
        ]);
        let out = normalize(&rows, DomainPolicy::Coerce).unwrap();
        let rows = &out.table.rows;
        assert_eq!(rows[0].sex, "female");
        assert_eq!(rows[0].embarked.as_deref(), Some("S"));
        assert_eq!(rows[1].sex, "male");
        assert_eq!(rows[1].embarked.as_deref(), Some("UNKNOWN"));
        assert_eq!(rows[2].sex, "unknown");
        assert_eq!(rows[2].embarked.as_deref(), Some("UNKNOWN"));
        for p in rows {
            assert_eq!(p.sex, p.sex.trim().to_lowercase());
            let port = p.embarked.as_deref().unwrap();
            assert_eq!(port, port.trim().to_uppercase());
        }
    }

    #[test]
    fn test_absent_embarked_column_is_skipped() {
        let out = normalize(&sample(), DomainPolicy::Coerce).unwrap();
        assert!(!out.table.columns.embarked);
        assert!(out.table.rows.iter().all(|p| p.embarked.is_none()));
    }

    #[test]
    fn test_coerce_policy_keeps_invalid_codes_as_zero() {
        let rows = records(vec![
            json!({"pclass": "first", "survived": 1, "age": 30, "sex": "male"}),
            json!({"pclass": 4, "survived": 2, "age": 30, "sex": "male"}),
            json!({"pclass": "2", "survived": "0", "age": 30, "sex": "male"}),
            json!({"pclass": 1.5, "survived": true, "age": 30, "sex": "male"}),
        ]);
        let out = normalize(&rows, DomainPolicy::Coerce).unwrap();
        let rows = &out.table.rows;
        assert_eq!(rows.len(), 4);
        assert_eq!((rows[0].pclass, rows[0].survived), (0, 1));
        assert_eq!((rows[1].pclass, rows[1].survived), (0, 0));
        assert_eq!((rows[2].pclass, rows[2].survived), (2, 0));
        assert_eq!((rows[3].pclass, rows[3].survived), (0, 1));
        assert_eq!(out.report.dropped, 0);

        let kinds: Vec<(usize, &str, CoercionKind)> = out
            .report
            .warnings
            .iter()
            .map(|w| (w.row, w.column, w.kind))
            .collect();
        assert!(kinds.contains(&(0, "pclass", CoercionKind::NotNumeric)));
        assert!(kinds.contains(&(1, "pclass", CoercionKind::OutOfDomain)));
        assert!(kinds.contains(&(1, "survived", CoercionKind::OutOfDomain)));
        assert!(kinds.contains(&(3, "pclass", CoercionKind::OutOfDomain)));
    }

    #[test]
    fn test_drop_policy_removes_out_of_domain_rows() {
        let rows = records(vec![
            json!({"pclass": 1, "survived": 1, "age": 30, "sex": "female"}),
            json!({"pclass": 0, "survived": 1, "age": 30, "sex": "male"}),
            json!({"pclass": 3, "survived": null, "age": 30, "sex": "male"}),
            json!({"pclass": 2, "survived": 0, "age": 30, "sex": "male"}),
        ]);
        let out = normalize(&rows, DomainPolicy::Drop).unwrap();
        assert_eq!(out.table.len(), 2);
        assert_eq!(out.report.dropped, 2);
        assert_eq!(out.report.rows_in, 4);
        assert_eq!(out.report.rows_out, 2);
        assert!(out
            .table
            .rows
            .iter()
            .all(|p| (1..=3).contains(&p.pclass) && p.survived <= 1));
    }

    #[test]
    fn test_median_uses_whole_load_before_drops() {
        let rows = records(vec![
            json!({"pclass": 9, "survived": 1, "age": 80, "sex": "male"}),
            json!({"pclass": 1, "survived": 1, "age": 20, "sex": "male"}),
            json!({"pclass": 1, "survived": 1, "age": null, "sex": "male"}),
        ]);
        let out = normalize(&rows, DomainPolicy::Drop).unwrap();
        assert_eq!(out.table.len(), 2);
        assert_eq!(out.table.rows[1].age, Some(50.0));
    }

    #[test]
    fn test_missing_required_column_is_schema_error() {
        let rows = records(vec![json!({"survived": 1, "age": 3, "sex": "male"})]);
        match normalize(&rows, DomainPolicy::Coerce) {
            Err(ManifestError::Schema(SchemaError::MissingColumn(col))) => {
                assert_eq!(col, "pclass")
            }
            other => panic!("expected missing pclass, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input_is_schema_error() {
        assert!(matches!(
            normalize(&[], DomainPolicy::Coerce),
            Err(ManifestError::Schema(SchemaError::EmptyTable))
        ));
    }

    #[test]
    fn test_input_is_not_mutated_and_extras_pass_through() {
        let rows = records(vec![json!({
            "pclass": "1", "survived": "1", "age": " 29 ", "sex": "Female",
            "name": "Allen, Miss. Elisabeth Walton", "ticket": "24160"
        })]);
        let before = rows.clone();
        let out = normalize(&rows, DomainPolicy::Coerce).unwrap();
        assert_eq!(rows, before);

        let p = &out.table.rows[0];
        assert_eq!(p.age, Some(29.0));
        assert_eq!(p.name(), Some("Allen, Miss. Elisabeth Walton"));
        assert_eq!(p.extra.get("ticket"), Some(&json!("24160")));
        assert!(!p.extra.contains_key("sex"));
    }

    #[test]
    fn test_non_numeric_age_records_warning() {
        let rows = records(vec![
            json!({"pclass": 1, "survived": 1, "age": "old", "sex": "male"}),
            json!({"pclass": 1, "survived": 1, "age": 40, "sex": "male"}),
        ]);
        let out = normalize(&rows, DomainPolicy::Coerce).unwrap();
        assert_eq!(out.table.rows[0].age, Some(40.0));
        assert_eq!(
            out.report.warnings,
            vec![CoercionWarning {
                row: 0,
                column: "age",
                value: json!("old"),
                kind: CoercionKind::NotNumeric,
            }]
        );
    }
}
