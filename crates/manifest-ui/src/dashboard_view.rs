//! Passenger dashboard screen.
//!
//! One frame shows the active filter, the headline metrics, survival by
//! class, the gender split, an age histogram and the first filtered rows.

use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use manifest_core::formatting::{
    format_class, format_count, format_currency, format_number, format_optional, format_percent,
    title_case, NOT_APPLICABLE,
};
use manifest_core::models::{FilterSpec, Passenger};
use manifest_data::aggregator::AgeBin;
use manifest_data::analysis::DashboardView;

use crate::themes::Theme;

const TITLE: &str = " Manifest View ";

/// Rows of block glyphs used by the age histogram.
const HISTOGRAM_HEIGHT: u16 = 6;

/// Eighth-block glyphs, empty to full.
const LEVELS: [char; 9] = [
    ' ', '\u{2581}', '\u{2582}', '\u{2583}', '\u{2584}', '\u{2585}', '\u{2586}', '\u{2587}',
    '\u{2588}',
];

const NAME_WIDTH: usize = 28;

/// Where the data came from and any message to show above the dashboard.
#[derive(Debug, Clone, Default)]
pub struct HeaderInfo {
    pub source: String,
    pub loaded_at: Option<DateTime<Utc>>,
    /// Last warning or error, shown in the header.
    pub status: Option<String>,
}

/// Render the full dashboard for `view` into `area`.
///
/// An empty filtered subset keeps the header and key help and replaces the
/// charts with [`render_no_data`].
pub fn render_dashboard(
    frame: &mut Frame,
    area: Rect,
    view: &DashboardView,
    header: &HeaderInfo,
    theme: &Theme,
) {
    let header_height = if header.status.is_some() { 6 } else { 5 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(header_height),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, chunks[0], view, header, theme);
    if view.is_empty() {
        render_no_data(frame, chunks[1], theme);
    } else {
        render_body(frame, chunks[1], view, theme);
    }
    frame.render_widget(Paragraph::new(key_help(theme)), chunks[2]);
}

/// Placeholder shown when no passenger matches the current filter.
pub fn render_no_data(frame: &mut Frame, area: Rect, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("No passengers match the current filter", theme.warning)),
        Line::from(""),
        Line::from(Span::styled(
            "Widen the age range or press 'x' to reset the filters.",
            theme.dim,
        )),
        Line::from(Span::styled("Press 'q' or Ctrl+C to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(text)).block(Block::default().borders(Borders::ALL).title(TITLE)),
        area,
    );
}

/// Full-screen message shown when no record set could be loaded.
pub fn render_load_error(frame: &mut Frame, area: Rect, message: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("Could not load passenger data", theme.error)),
        Line::from(""),
        Line::from(Span::styled(message.to_string(), theme.text)),
        Line::from(""),
        Line::from(Span::styled("Press 'r' to retry, 'q' or Ctrl+C to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(text)).block(Block::default().borders(Borders::ALL).title(TITLE)),
        area,
    );
}

// ── Sections ──────────────────────────────────────────────────────────────────

fn render_header(
    frame: &mut Frame,
    area: Rect,
    view: &DashboardView,
    header: &HeaderInfo,
    theme: &Theme,
) {
    let loaded = header
        .loaded_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Source: ", theme.label),
            Span::styled(header.source.clone(), theme.text),
            Span::styled("  Loaded: ", theme.label),
            Span::styled(loaded, theme.text),
            Span::styled("  Rows: ", theme.label),
            Span::styled(format_count(view.source_rows), theme.text),
        ]),
        Line::from(vec![
            Span::styled("Filter: ", theme.label),
            Span::styled(describe_filter(&view.spec), theme.info),
        ]),
        metrics_line(view, theme),
    ];
    if let Some(status) = &header.status {
        lines.push(Line::from(Span::styled(status.clone(), theme.warning)));
    }

    frame.render_widget(
        Paragraph::new(Text::from(lines)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.separator)
                .title(Span::styled(TITLE, theme.header)),
        ),
        area,
    );
}

fn metrics_line<'a>(view: &DashboardView, theme: &Theme) -> Line<'a> {
    let s = &view.summary;
    Line::from(vec![
        Span::styled("Passengers ", theme.label),
        Span::styled(format_count(s.total_count), theme.value),
        Span::styled("  Survivors ", theme.label),
        Span::styled(format_count(s.survivor_count), theme.value),
        Span::styled("  Survival ", theme.label),
        Span::styled(format_percent(s.survival_rate), theme.rate_style(s.survival_rate)),
        Span::styled("  Mean age ", theme.label),
        Span::styled(format_optional(s.mean_age, 1), theme.value),
        Span::styled("  Mean fare ", theme.label),
        Span::styled(
            s.mean_fare
                .map(format_currency)
                .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
            theme.value,
        ),
    ])
}

fn render_body(frame: &mut Frame, area: Rect, view: &DashboardView, theme: &Theme) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HISTOGRAM_HEIGHT + 3),
            Constraint::Min(3),
        ])
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(38),
            Constraint::Length(24),
            Constraint::Min(20),
        ])
        .split(rows[0]);

    render_class_table(frame, top[0], view, theme);
    render_gender_table(frame, top[1], view, theme);
    render_histogram(frame, top[2], &view.breakdowns.age_histogram, theme);
    render_rows_table(frame, rows[1], &view.filtered.rows, theme);
}

fn render_class_table(frame: &mut Frame, area: Rect, view: &DashboardView, theme: &Theme) {
    let header = Row::new(
        ["Class", "Survived", "Perished", "Rate"]
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    );
    let rows: Vec<Row> = view
        .breakdowns
        .survival_by_class
        .iter()
        .map(|c| {
            let total = c.outcome.total();
            let rate = if total > 0 {
                c.outcome.survived as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            Row::new(vec![
                Cell::from(format_class(c.pclass)),
                Cell::from(format_count(c.outcome.survived)).style(theme.survived),
                Cell::from(format_count(c.outcome.perished)).style(theme.perished),
                Cell::from(format_percent(rate)).style(theme.rate_style(rate)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(7),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(7),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(" Survival by class "))
    .style(theme.text);
    frame.render_widget(table, area);
}

fn render_gender_table(frame: &mut Frame, area: Rect, view: &DashboardView, theme: &Theme) {
    let total = view.summary.total_count.max(1) as f64;
    let rows: Vec<Row> = view
        .breakdowns
        .gender_distribution
        .iter()
        .map(|g| {
            Row::new(vec![
                Cell::from(title_case(&g.sex)),
                Cell::from(format_count(g.count)),
                Cell::from(format_number(g.count as f64 / total * 100.0, 0) + "%").style(theme.dim),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(9),
            Constraint::Length(6),
            Constraint::Length(5),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title(" Gender "))
    .style(theme.text);
    frame.render_widget(table, area);
}

fn render_histogram(frame: &mut Frame, area: Rect, bins: &[AgeBin], theme: &Theme) {
    let mut lines = histogram_lines(bins, HISTOGRAM_HEIGHT, theme);
    if let (Some(first), Some(last)) = (bins.first(), bins.last()) {
        lines.push(Line::from(Span::styled(
            format!(
                "{} .. {} yrs, colour = survival rate",
                format_number(first.lower, 1),
                format_number(last.upper, 1)
            ),
            theme.dim,
        )));
    }
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .block(Block::default().borders(Borders::ALL).title(" Age distribution ")),
        area,
    );
}

fn render_rows_table(frame: &mut Frame, area: Rect, passengers: &[Passenger], theme: &Theme) {
    let header = Row::new(
        ["Name", "Class", "Sex", "Age", "Fare", "Port", "Survived"]
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    );

    let visible = area.height.saturating_sub(3) as usize;
    let rows: Vec<Row> = passengers
        .iter()
        .take(visible)
        .enumerate()
        .map(|(i, p)| {
            let style = if i % 2 == 0 {
                theme.table_row
            } else {
                theme.table_row_alt
            };
            let (outcome, outcome_style) = if p.has_survived() {
                ("yes", theme.survived)
            } else {
                ("no", theme.perished)
            };
            Row::new(vec![
                Cell::from(truncate_to_width(p.name().unwrap_or("-"), NAME_WIDTH)),
                Cell::from(format_class(p.pclass)),
                Cell::from(title_case(&p.sex)),
                Cell::from(format_optional(p.age, 1)),
                Cell::from(
                    p.fare
                        .map(format_currency)
                        .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
                ),
                Cell::from(p.embarked.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(outcome).style(outcome_style),
            ])
            .style(style)
        })
        .collect();

    let title = format!(
        " Passengers ({} of {}) ",
        format_count(rows.len()),
        format_count(passengers.len())
    );
    let table = Table::new(
        rows,
        [
            Constraint::Length(NAME_WIDTH as u16),
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title))
    .style(theme.text);
    frame.render_widget(table, area);
}

fn key_help<'a>(theme: &Theme) -> Line<'a> {
    let keys = [
        ("c", "class"),
        ("g", "gender"),
        ("[ ]", "min age"),
        ("{ }", "max age"),
        ("x", "reset"),
        ("r", "reload"),
        ("q", "quit"),
    ];
    let mut spans = Vec::with_capacity(keys.len() * 2);
    for (key, action) in keys {
        spans.push(Span::styled(format!(" {} ", key), theme.info));
        spans.push(Span::styled(format!("{} ", action), theme.dim));
    }
    Line::from(spans)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// One-line description of a filter, e.g. `"Class 1 | Gender female | Age 20.0-40.0"`.
pub fn describe_filter(spec: &FilterSpec) -> String {
    let age = match spec.age_range {
        Some(range) => format!(
            "{}-{}",
            format_number(range.min(), 1),
            format_number(range.max(), 1)
        ),
        None => "All".to_string(),
    };
    format!(
        "Class {} | Gender {} | Age {}",
        spec.class_filter, spec.gender_filter, age
    )
}

/// Vertical histogram drawn with eighth-block glyphs, one column per bin,
/// tallest bin filling `height` rows. Each column takes the style of its
/// bin's survival rate.
pub fn histogram_lines<'a>(bins: &[AgeBin], height: u16, theme: &Theme) -> Vec<Line<'a>> {
    let peak = bins.iter().map(|b| b.outcome.total()).max().unwrap_or(0);
    if peak == 0 || height == 0 {
        return Vec::new();
    }

    let eighths: Vec<usize> = bins
        .iter()
        .map(|b| {
            let scaled = b.outcome.total() as f64 / peak as f64 * f64::from(height) * 8.0;
            // Keep every non-empty bin visible.
            if b.outcome.total() > 0 {
                (scaled.round() as usize).max(1)
            } else {
                0
            }
        })
        .collect();

    (0..height as usize)
        .rev()
        .map(|row| {
            let spans: Vec<Span> = bins
                .iter()
                .zip(&eighths)
                .map(|(bin, &level)| {
                    let fill = level.saturating_sub(row * 8).min(8);
                    let total = bin.outcome.total();
                    let rate = if total > 0 {
                        bin.outcome.survived as f64 / total as f64 * 100.0
                    } else {
                        0.0
                    };
                    Span::styled(LEVELS[fill].to_string(), theme.rate_style(rate))
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

/// Cut `s` to at most `max_width` terminal columns, marking the cut with `~`.
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    let total: usize = s.chars().map(|c| c.width().unwrap_or(0)).sum();
    if total <= max_width {
        return s.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('~');
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
