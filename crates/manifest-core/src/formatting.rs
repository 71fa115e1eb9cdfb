use crate::models::INVALID_CLASS;

/// Label shown wherever a statistic is undefined.
pub const NOT_APPLICABLE: &str = "N/A";

/// Label shown for a ticket class that could not be read.
pub const UNKNOWN_CLASS: &str = "?";

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use manifest_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: usize) -> String {
    let negative = value < 0.0;
    let fixed = format!("{:.*}", decimals, value.abs());

    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut result = group_thousands(int_part);
    if let Some(frac) = frac_part {
        result.push('.');
        result.push_str(frac);
    }

    // "-0.0" reads badly; only keep the sign for non-zero output.
    if negative && result.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format an integer count with thousands separators.
pub fn format_count(count: usize) -> String {
    group_thousands(&count.to_string())
}

/// Format a percentage with one decimal place, e.g. `"38.4%"`.
pub fn format_percent(rate: f64) -> String {
    format!("{}%", format_number(rate, 1))
}

/// Format a monetary amount with a `$` prefix and two decimals.
///
/// ```
/// use manifest_core::formatting::format_currency;
///
/// assert_eq!(format_currency(32.2042), "$32.20");
/// assert_eq!(format_currency(1234.5), "$1,234.50");
/// ```
pub fn format_currency(amount: f64) -> String {
    if amount < 0.0 {
        format!("$-{}", format_number(amount.abs(), 2))
    } else {
        format!("${}", format_number(amount, 2))
    }
}

/// Format an optional statistic, using [`NOT_APPLICABLE`] for `None`.
pub fn format_optional(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format_number(v, decimals))
        .unwrap_or_else(|| NOT_APPLICABLE.to_string())
}

/// Display label of a ticket class; rows coerced to [`INVALID_CLASS`] show
/// [`UNKNOWN_CLASS`].
pub fn format_class(pclass: u8) -> String {
    if pclass == INVALID_CLASS {
        UNKNOWN_CLASS.to_string()
    } else {
        pclass.to_string()
    }
}

/// Capitalise the first letter of every whitespace-separated word.
///
/// ```
/// use manifest_core::formatting::title_case;
///
/// assert_eq!(title_case("female"), "Female");
/// assert_eq!(title_case("not given"), "Not Given");
/// ```
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Insert `,` separators into a string of ASCII digits.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
