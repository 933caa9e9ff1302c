//! HTML report adapter implementing `ReportPort`.
//!
//! Renders the exporter analysis with an askama template and inline SVG
//! charts. Numbers are formatted here so the template stays logic-free.

pub mod chart_svg;

use std::fs;
use std::path::Path;

use askama::Template;

use crate::domain::analysis::{ExporterAnalysis, Narrative};
use crate::domain::error::ShipscopeError;
use crate::domain::forecast::ForecastOutcome;
use crate::ports::report_port::ReportPort;

struct Kpi {
    label: &'static str,
    value: String,
}

struct ShareLine {
    name: String,
    total: String,
    share: String,
}

struct NestedLine {
    group: String,
    name: String,
    total: String,
    share: String,
}

struct RouteLine {
    exporter: String,
    loading_port: String,
    arrival_country: String,
    arrival_port: String,
    total: String,
}

struct MonthLine {
    month: String,
    total: String,
}

struct TrendHeader {
    name: String,
    color: &'static str,
}

struct TrendLine {
    month: String,
    cells: Vec<String>,
}

struct ForecastLine {
    month: String,
    actual: String,
    forecast: String,
}

struct ForecastSection {
    last_observed: String,
    svg: String,
    rows: Vec<ForecastLine>,
    mae: Option<String>,
}

#[derive(Template)]
#[template(path = "analysis.html")]
struct AnalysisTemplate {
    title: String,
    period: String,
    kpis: Vec<Kpi>,
    country_shares: Vec<ShareLine>,
    routes: Vec<RouteLine>,
    route_total: String,
    carriers: Vec<NestedLine>,
    importers: Vec<NestedLine>,
    monthly: Vec<MonthLine>,
    monthly_svg: String,
    trend_headers: Vec<TrendHeader>,
    trend_rows: Vec<TrendLine>,
    trend_svg: String,
    forecast: Option<ForecastSection>,
    forecast_error: Option<String>,
    narrative: Option<String>,
    narrative_error: Option<String>,
}

/// Thousands-separated integer.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn format_signed(value: i64) -> String {
    if value < 0 {
        format!("-{}", format_count(value.unsigned_abs()))
    } else {
        format_count(value as u64)
    }
}

fn forecast_section(outcome: &ForecastOutcome) -> ForecastSection {
    ForecastSection {
        last_observed: outcome.last_observed.to_string(),
        svg: chart_svg::forecast_svg(&outcome.monthly),
        rows: outcome
            .monthly
            .iter()
            .map(|p| ForecastLine {
                month: p.month.to_string(),
                actual: p.actual_display().map(format_signed).unwrap_or_default(),
                forecast: p.forecast_display().map(format_signed).unwrap_or_default(),
            })
            .collect(),
        mae: outcome.backtest.map(|b| {
            format!(
                "{} (last {} observed dates)",
                format_signed(b.mae_display()),
                b.holdout_days
            )
        }),
    }
}

impl AnalysisTemplate {
    fn from_analysis(analysis: &ExporterAnalysis) -> Self {
        let o = &analysis.overview;
        let kpis = vec![
            Kpi {
                label: "Shipments",
                value: format_count(o.records as u64),
            },
            Kpi {
                label: "Containers",
                value: format_count(o.total_containers),
            },
            Kpi {
                label: "Importers",
                value: format_count(o.importers as u64),
            },
            Kpi {
                label: "Loading ports",
                value: format_count(o.loading_ports as u64),
            },
            Kpi {
                label: "Arrival countries",
                value: format_count(o.arrival_countries as u64),
            },
            Kpi {
                label: "Arrival ports",
                value: format_count(o.arrival_ports as u64),
            },
            Kpi {
                label: "Carriers",
                value: format_count(o.carriers as u64),
            },
        ];

        let pivot = &analysis.country_trend;
        let (narrative, narrative_error) = match &analysis.narrative {
            Narrative::NotRequested => (None, None),
            Narrative::Ready(text) => (Some(text.clone()), None),
            Narrative::Failed(reason) => (None, Some(reason.clone())),
        };

        Self {
            title: analysis.exporters.join(", "),
            period: format!("{} ~ {}", analysis.date_start, analysis.date_end),
            kpis,
            country_shares: analysis
                .country_shares
                .iter()
                .map(|r| ShareLine {
                    name: r.name.clone(),
                    total: format_count(r.total),
                    share: format!("{:.1}%", r.share_pct),
                })
                .collect(),
            routes: analysis
                .routes
                .rows
                .iter()
                .map(|r| RouteLine {
                    exporter: r.exporter.clone(),
                    loading_port: r.loading_port.clone(),
                    arrival_country: r.arrival_country.clone(),
                    arrival_port: r.arrival_port.clone(),
                    total: format_count(r.total),
                })
                .collect(),
            route_total: format_count(analysis.routes.grand_total),
            carriers: analysis
                .country_carriers
                .iter()
                .map(|r| NestedLine {
                    group: r.group.clone(),
                    name: r.name.clone(),
                    total: format_count(r.total),
                    share: format!("{:.1}%", r.share_pct),
                })
                .collect(),
            importers: analysis
                .country_importers
                .iter()
                .map(|r| NestedLine {
                    group: r.group.clone(),
                    name: r.name.clone(),
                    total: format_count(r.total),
                    share: String::new(),
                })
                .collect(),
            monthly: analysis
                .monthly
                .iter()
                .map(|m| MonthLine {
                    month: m.month.to_string(),
                    total: format_count(m.total),
                })
                .collect(),
            monthly_svg: chart_svg::monthly_svg(&analysis.monthly),
            trend_headers: pivot
                .values
                .iter()
                .enumerate()
                .map(|(j, name)| TrendHeader {
                    name: name.clone(),
                    color: chart_svg::trend_color(j),
                })
                .collect(),
            trend_rows: pivot
                .months
                .iter()
                .zip(&pivot.cells)
                .map(|(month, row)| TrendLine {
                    month: month.to_string(),
                    cells: row.iter().map(|&v| format_count(v)).collect(),
                })
                .collect(),
            trend_svg: chart_svg::trend_svg(pivot),
            forecast: analysis.forecast_outcome().map(forecast_section),
            forecast_error: analysis.forecast_error().map(|e| e.to_string()),
            narrative,
            narrative_error,
        }
    }
}

pub struct HtmlReportAdapter;

impl HtmlReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, analysis: &ExporterAnalysis) -> Result<String, ShipscopeError> {
        AnalysisTemplate::from_analysis(analysis)
            .render()
            .map_err(|e| ShipscopeError::Render {
                reason: e.to_string(),
            })
    }
}

impl Default for HtmlReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for HtmlReportAdapter {
    fn write(&self, analysis: &ExporterAnalysis, output_path: &str) -> Result<(), ShipscopeError> {
        let html = self.render(analysis)?;

        let path = Path::new(output_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, html)?;
        log::info!("wrote report to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::forecast::{ForecastError, Observation};
    use crate::domain::shipment::ShipmentRecord;
    use crate::ports::forecast_port::{FittedModel, ForecastModel};
    use chrono::{Duration, NaiveDate};
    use tempfile::tempdir;

    struct Flat;

    impl FittedModel for Flat {
        fn predict(&self, dates: &[NaiveDate]) -> Vec<f64> {
            vec![2.0; dates.len()]
        }
    }

    struct FlatModel;

    impl ForecastModel for FlatModel {
        fn fit(&self, history: &[Observation]) -> Result<Box<dyn FittedModel>, ForecastError> {
            if history.len() < 2 {
                return Err(ForecastError::InsufficientHistory {
                    distinct_dates: history.len(),
                    minimum: 2,
                });
            }
            Ok(Box::new(Flat))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_records() -> Vec<ShipmentRecord> {
        (0..45)
            .map(|i| ShipmentRecord {
                shipment_date: date(2024, 1, 1) + Duration::days(i * 2),
                exporter: "Hanil Steel".into(),
                importer: if i % 3 == 0 { "Pacific Metals" } else { "Tokyo Trade" }.into(),
                loading_port: "Busan".into(),
                arrival_port: if i % 2 == 0 { "Long Beach" } else { "Tokyo" }.into(),
                arrival_country: if i % 2 == 0 { "USA" } else { "Japan" }.into(),
                carrier: if i % 4 == 0 { "HMM" } else { "ONE" }.into(),
                container_count: 3,
            })
            .collect()
    }

    fn sample_analysis(model: Option<&dyn ForecastModel>) -> ExporterAnalysis {
        ExporterAnalysis::build(
            &sample_records(),
            &["Hanil Steel".to_string()],
            date(2024, 1, 1),
            date(2024, 12, 31),
            model,
        )
    }

    #[test]
    fn format_count_groups_thousands() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
        assert_eq!(format_signed(-1_500), "-1,500");
    }

    #[test]
    fn write_creates_file_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let output_path = dir.path().join("nested").join("analysis.html");
        let output_str = output_path.to_str().unwrap();

        HtmlReportAdapter::new()
            .write(&sample_analysis(Some(&FlatModel)), output_str)
            .unwrap();

        let contents = fs::read_to_string(&output_path).unwrap();
        assert!(contents.contains("Hanil Steel"));
        assert!(contents.contains("2024-01-01 ~ 2024-12-31"));
        assert!(contents.contains("<svg"));
    }

    #[test]
    fn report_includes_every_section() {
        let html = HtmlReportAdapter::new()
            .render(&sample_analysis(Some(&FlatModel)))
            .unwrap();
        assert!(html.contains("Destination Countries"));
        assert!(html.contains("Routes"));
        assert!(html.contains("Grand total"));
        assert!(html.contains("Carriers by Country"));
        assert!(html.contains("Importers by Country"));
        assert!(html.contains("Monthly Volume"));
        assert!(html.contains("Top Destination Trend"));
        assert!(html.contains("Forecast"));
        assert!(html.contains("Mean absolute error"));
    }

    #[test]
    fn forecast_failure_is_shown_as_notice() {
        let mut analysis = sample_analysis(None);
        analysis.forecast = Some(Err(ForecastError::InsufficientHistory {
            distinct_dates: 1,
            minimum: 2,
        }));
        let html = HtmlReportAdapter::new().render(&analysis).unwrap();
        assert!(html.contains("Forecast unavailable"));
        assert!(html.contains("Monthly Volume"));
    }

    #[test]
    fn narrative_text_is_escaped() {
        let mut analysis = sample_analysis(None);
        analysis.narrative = Narrative::Ready("Overview <script>x</script>".into());
        let html = HtmlReportAdapter::new().render(&analysis).unwrap();
        assert!(html.contains("Overview &lt;script&gt;"));
        assert!(!html.contains("<script>x"));
    }

    #[test]
    fn narrative_failure_suggests_retry() {
        let mut analysis = sample_analysis(None);
        analysis.narrative = Narrative::Failed("timeout".into());
        let html = HtmlReportAdapter::new().render(&analysis).unwrap();
        assert!(html.contains("timeout"));
        assert!(html.contains("try again"));
    }
}
