//! Plain-text rendering of a dashboard view for `--view summary`.

use std::io::{self, Write};

use manifest_core::formatting::{
    format_class, format_count, format_currency, format_optional, format_percent, title_case,
    NOT_APPLICABLE,
};
use manifest_data::analysis::DashboardView;
use manifest_data::normalizer::NormalizeReport;
use manifest_ui::dashboard_view::describe_filter;

/// Write the summary report for `view` to `out`.
pub fn write_summary<W: Write>(
    out: &mut W,
    source: &str,
    view: &DashboardView,
    load: &NormalizeReport,
) -> io::Result<()> {
    let s = &view.summary;

    writeln!(out, "Source: {}", source)?;
    writeln!(out, "Filter: {}", describe_filter(&view.spec))?;
    writeln!(out)?;

    writeln!(out, "{:<16}{:>12}", "Passengers", format_count(s.total_count))?;
    writeln!(out, "{:<16}{:>12}", "Survivors", format_count(s.survivor_count))?;
    writeln!(out, "{:<16}{:>12}", "Survival rate", format_percent(s.survival_rate))?;
    writeln!(out, "{:<16}{:>12}", "Mean age", format_optional(s.mean_age, 1))?;
    writeln!(
        out,
        "{:<16}{:>12}",
        "Mean fare",
        s.mean_fare
            .map(format_currency)
            .unwrap_or_else(|| NOT_APPLICABLE.to_string())
    )?;

    if view.is_empty() {
        writeln!(out)?;
        writeln!(out, "No passengers match the current filter.")?;
    } else {
        writeln!(out)?;
        writeln!(out, "Survival by class")?;
        for c in &view.breakdowns.survival_by_class {
            let total = c.outcome.total();
            let rate = if total > 0 {
                c.outcome.survived as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            writeln!(
                out,
                "  {:<6}{:>8} survived {:>8} perished {:>8}",
                format_class(c.pclass),
                format_count(c.outcome.survived),
                format_count(c.outcome.perished),
                format_percent(rate)
            )?;
        }

        writeln!(out)?;
        writeln!(out, "Gender")?;
        for g in &view.breakdowns.gender_distribution {
            writeln!(out, "  {:<10}{:>8}", title_case(&g.sex), format_count(g.count))?;
        }
    }

    writeln!(out)?;
    writeln!(
        out,
        "Loaded {} of {} rows ({} dropped), {} ages and {} fares imputed, {} values coerced",
        format_count(load.rows_out),
        format_count(load.rows_in),
        format_count(load.dropped),
        format_count(load.age_imputed),
        format_count(load.fare_imputed),
        format_count(load.warnings.len())
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use manifest_core::models::{DomainPolicy, FilterSpec, RawRecord, Selection};
    use manifest_data::analysis::build_view;
    use manifest_data::normalizer::normalize;
    use serde_json::json;

    fn render(spec_for: impl Fn(&FilterSpec) -> FilterSpec) -> String {
        let rows: Vec<RawRecord> = vec![
            json!({"pclass": 1, "survived": 1, "age": 29, "sex": "female", "fare": 211.34}),
            json!({"pclass": 3, "survived": 0, "age": 2, "sex": "male", "fare": 21.07}),
            json!({"pclass": 1, "survived": 1, "age": null, "sex": null, "fare": null}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();
        let normalized = normalize(&rows, DomainPolicy::Coerce).unwrap();
        let spec = spec_for(&FilterSpec::full_range(&normalized.table));
        let view = build_view(&normalized.table, &spec);

        let mut out = Vec::new();
        write_summary(&mut out, "file:titanic.jsonl", &view, &normalized.report).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_summary_first_class() {
        let text = render(|spec| spec.clone().with_class(Selection::Only(1)));
        assert!(text.contains("Source: file:titanic.jsonl"));
        assert!(text.contains("Filter: Class 1 | Gender All | Age 2.0-29.0"));
        assert!(text.contains("100.0%"));
        assert!(text.contains("22.2") || text.contains("22.3"));
        assert!(text.contains("Survival by class"));
        assert!(text.contains("1 ages and 1 fares imputed"));
    }

    #[test]
    fn test_summary_labels_unreadable_class() {
        let rows: Vec<RawRecord> = vec![
            json!({"pclass": 1, "survived": 1, "age": 30, "sex": "female"}),
            json!({"pclass": "steerage", "survived": 0, "age": 20, "sex": "male"}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();
        let normalized = normalize(&rows, DomainPolicy::Coerce).unwrap();
        let view = build_view(&normalized.table, &FilterSpec::all());

        let mut out = Vec::new();
        write_summary(&mut out, "file:mixed.jsonl", &view, &normalized.report).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("  ?     "), "{text}");
        assert!(!text.contains("  0     "), "{text}");
    }

    #[test]
    fn test_summary_empty_subset() {
        let text = render(|spec| spec.clone().with_class(Selection::Only(2)));
        assert!(text.contains("No passengers match"));
        assert!(text.contains(NOT_APPLICABLE));
        assert!(!text.contains("Survival by class"));
    }
}
