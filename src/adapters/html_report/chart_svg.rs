//! Inline SVG line charts for the HTML report.

use crate::domain::aggregate::{MonthlyTotal, TrendPivot};
use crate::domain::forecast::MonthlyPoint;
use std::fmt::Write;

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 260.0;
const PADDING: f64 = 44.0;

const ACTUAL_COLOR: &str = "#2563eb";
const FORECAST_COLOR: &str = "#f97316";
const PALETTE: [&str; 10] = [
    "#2563eb", "#f97316", "#16a34a", "#dc2626", "#9333ea", "#0891b2", "#ca8a04", "#db2777",
    "#4b5563", "#65a30d",
];

pub const EMPTY_CHART: &str = "<p class=\"empty\">No data available.</p>";

/// One line; `None` values leave a gap.
pub struct Series<'a> {
    pub label: &'a str,
    pub color: &'a str,
    pub dashed: bool,
    pub values: Vec<Option<f64>>,
}

/// Line chart over categorical x labels, y axis starting at zero.
pub fn line_chart_svg(labels: &[String], series: &[Series<'_>]) -> String {
    let max_value = series
        .iter()
        .flat_map(|s| s.values.iter().flatten())
        .fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    if labels.is_empty() || !max_value.is_finite() {
        return EMPTY_CHART.to_string();
    }

    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;
    let scale_y = if max_value > 0.0 {
        plot_height / max_value
    } else {
        1.0
    };
    let scale_x = if labels.len() > 1 {
        plot_width / (labels.len() - 1) as f64
    } else {
        0.0
    };
    let x_at = |i: usize| PADDING + i as f64 * scale_x;
    let y_at = |v: f64| HEIGHT - PADDING - v * scale_y;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}" width="100%" role="img">"#
    );
    let (p, b, r) = (PADDING, HEIGHT - PADDING, WIDTH - PADDING);
    let _ = write!(
        svg,
        r##"<line x1="{p:.1}" y1="{b:.1}" x2="{r:.1}" y2="{b:.1}" stroke="#9ca3af"/>"##
    );
    let _ = write!(
        svg,
        r##"<line x1="{p:.1}" y1="{p:.1}" x2="{p:.1}" y2="{b:.1}" stroke="#9ca3af"/>"##
    );
    let _ = write!(
        svg,
        r##"<text x="{:.1}" y="{:.1}" font-size="10" text-anchor="end" fill="#4b5563">{:.0}</text>"##,
        PADDING - 4.0,
        PADDING + 4.0,
        max_value
    );

    let label_step = labels.len().div_ceil(12).max(1);
    for (i, label) in labels.iter().enumerate().step_by(label_step) {
        let _ = write!(
            svg,
            r##"<text x="{:.1}" y="{:.1}" font-size="10" text-anchor="middle" fill="#4b5563">{}</text>"##,
            x_at(i),
            HEIGHT - PADDING + 16.0,
            escape(label)
        );
    }

    for s in series {
        let dash = if s.dashed {
            r#" stroke-dasharray="6 4""#
        } else {
            ""
        };
        for segment in segments(&s.values) {
            let points: Vec<String> = segment
                .iter()
                .map(|&(i, v)| format!("{:.1},{:.1}", x_at(i), y_at(v)))
                .collect();
            if points.len() == 1 {
                let (i, v) = segment[0];
                let _ = write!(
                    svg,
                    r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{}"/>"#,
                    x_at(i),
                    y_at(v),
                    s.color
                );
            } else {
                let _ = write!(
                    svg,
                    r#"<polyline fill="none" stroke="{}" stroke-width="2"{} points="{}"><title>{}</title></polyline>"#,
                    s.color,
                    dash,
                    points.join(" "),
                    escape(s.label)
                );
            }
        }
    }

    svg.push_str("</svg>");
    svg
}

/// Runs of consecutive present values, with their x index.
fn segments(values: &[Option<f64>]) -> Vec<Vec<(usize, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (i, value) in values.iter().enumerate() {
        match value {
            Some(v) => current.push((i, *v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn monthly_svg(monthly: &[MonthlyTotal]) -> String {
    let labels: Vec<String> = monthly.iter().map(|m| m.month.to_string()).collect();
    let series = [Series {
        label: "Containers",
        color: ACTUAL_COLOR,
        dashed: false,
        values: monthly.iter().map(|m| Some(m.total as f64)).collect(),
    }];
    line_chart_svg(&labels, &series)
}

/// Actual months solid, forecast months dashed.
pub fn forecast_svg(points: &[MonthlyPoint]) -> String {
    let labels: Vec<String> = points.iter().map(|p| p.month.to_string()).collect();
    let series = [
        Series {
            label: "Actual",
            color: ACTUAL_COLOR,
            dashed: false,
            values: points.iter().map(|p| p.actual).collect(),
        },
        Series {
            label: "Forecast",
            color: FORECAST_COLOR,
            dashed: true,
            values: points.iter().map(|p| p.forecast).collect(),
        },
    ];
    line_chart_svg(&labels, &series)
}

pub fn trend_svg(pivot: &TrendPivot) -> String {
    let labels: Vec<String> = pivot.months.iter().map(|m| m.to_string()).collect();
    let series: Vec<Series<'_>> = pivot
        .values
        .iter()
        .enumerate()
        .map(|(j, value)| Series {
            label: value,
            color: PALETTE[j % PALETTE.len()],
            dashed: false,
            values: pivot.cells.iter().map(|row| Some(row[j] as f64)).collect(),
        })
        .collect();
    line_chart_svg(&labels, &series)
}

/// Colour used for the `j`th trend value, for the legend.
pub fn trend_color(j: usize) -> &'static str {
    PALETTE[j % PALETTE.len()]
}
