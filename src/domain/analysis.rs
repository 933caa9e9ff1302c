//! Exporter drill-down: every view the analysis screen and HTML report show.

use crate::domain::aggregate::{
    GroupTotal, MonthlyTotal, NestedShareRow, RouteBreakdown, ShareRow, TrendPivot,
    country_carrier_shares, country_importer_totals, country_shares, daily_series,
    monthly_rollup, route_breakdown, top_n_monthly_trend,
};
use crate::domain::forecast::{ForecastError, ForecastOutcome, run_forecast};
use crate::domain::overview::DatasetOverview;
use crate::domain::shipment::{Dimension, ShipmentRecord};
use crate::ports::forecast_port::ForecastModel;
use chrono::NaiveDate;

/// Number of arrival countries shown in the monthly trend.
pub const TREND_TOP_N: usize = 10;

/// State of the language-model narrative attached to an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Narrative {
    #[default]
    NotRequested,
    Ready(String),
    /// Request failed; holds a message suitable for a retry hint.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExporterAnalysis {
    pub exporters: Vec<String>,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub overview: DatasetOverview,
    pub country_shares: Vec<ShareRow>,
    pub routes: RouteBreakdown,
    pub country_carriers: Vec<NestedShareRow>,
    pub country_importers: Vec<GroupTotal>,
    pub monthly: Vec<MonthlyTotal>,
    pub country_trend: TrendPivot,
    /// `None` when forecasting was not requested.
    pub forecast: Option<Result<ForecastOutcome, ForecastError>>,
    pub narrative: Narrative,
}

impl ExporterAnalysis {
    /// Build all views over `subset`, the already-selected analysis rows.
    pub fn build(
        subset: &[ShipmentRecord],
        exporters: &[String],
        date_start: NaiveDate,
        date_end: NaiveDate,
        model: Option<&dyn ForecastModel>,
    ) -> Self {
        let forecast = model.map(|m| {
            let outcome = run_forecast(m, &daily_series(subset));
            if let Err(e) = &outcome {
                log::warn!("forecast unavailable: {e}");
            }
            outcome
        });

        Self {
            exporters: exporters.to_vec(),
            date_start,
            date_end,
            overview: DatasetOverview::compute(subset),
            country_shares: country_shares(subset),
            routes: route_breakdown(subset),
            country_carriers: country_carrier_shares(subset),
            country_importers: country_importer_totals(subset),
            monthly: monthly_rollup(subset),
            country_trend: top_n_monthly_trend(subset, Dimension::ArrivalCountry, TREND_TOP_N),
            forecast,
            narrative: Narrative::NotRequested,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.overview.is_empty()
    }

    pub fn forecast_outcome(&self) -> Option<&ForecastOutcome> {
        self.forecast.as_ref().and_then(|f| f.as_ref().ok())
    }

    pub fn forecast_error(&self) -> Option<&ForecastError> {
        self.forecast.as_ref().and_then(|f| f.as_ref().err())
    }
}
