//! Per-session dashboard state.
//!
//! Holds the filter criteria, the exporter selection, the active view and the
//! cached results for that view. Only one view's results are cached at a
//! time; `reset` restores every field in one assignment.

use crate::domain::aggregate::{RankedTotal, rank_carriers, rank_exporters};
use crate::domain::analysis::{ExporterAnalysis, Narrative};
use crate::domain::error::ShipscopeError;
use crate::domain::filter::{FilterCriteria, apply_filter, select_exporters};
use crate::domain::overview::DatasetOverview;
use crate::domain::shipment::ShipmentRecord;
use crate::ports::forecast_port::ForecastModel;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("dataset is empty; no default date range")]
    EmptyDataset,

    #[error("no exporter selected")]
    NoExporterSelected,

    #[error("no analysis has been run")]
    NoAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Home,
    Search,
    Analysis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    pub records: Vec<ShipmentRecord>,
    pub exporters: Vec<RankedTotal>,
    pub carriers: Vec<RankedTotal>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    defaults: FilterCriteria,
    criteria: FilterCriteria,
    selected_exporters: Vec<String>,
    view: View,
    search: Option<SearchResults>,
    analysis: Option<ExporterAnalysis>,
}

impl SessionContext {
    /// Defaults: the dataset's full date range, all wildcards, threshold 0.
    pub fn new(overview: &DatasetOverview) -> Result<Self, ShipscopeError> {
        let (first, last) = overview.date_bounds().ok_or(SessionError::EmptyDataset)?;
        let defaults = FilterCriteria::new(first, last)?;
        Ok(Self::with_defaults(defaults))
    }

    fn with_defaults(defaults: FilterCriteria) -> Self {
        Self {
            criteria: defaults.clone(),
            defaults,
            selected_exporters: Vec::new(),
            view: View::Home,
            search: None,
            analysis: None,
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn defaults(&self) -> &FilterCriteria {
        &self.defaults
    }

    /// Replace the criteria after validating them. Cached results stay until
    /// the next `search` or `analyze`.
    pub fn set_criteria(&mut self, criteria: FilterCriteria) -> Result<(), ShipscopeError> {
        criteria.validate()?;
        self.criteria = criteria;
        Ok(())
    }

    pub fn select_exporter(&mut self, exporter: impl Into<String>) {
        let exporter = exporter.into();
        if !self.selected_exporters.contains(&exporter) {
            self.selected_exporters.push(exporter);
        }
    }

    pub fn selected_exporters(&self) -> &[String] {
        &self.selected_exporters
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn search_results(&self) -> Option<&SearchResults> {
        self.search.as_ref()
    }

    pub fn analysis(&self) -> Option<&ExporterAnalysis> {
        self.analysis.as_ref()
    }

    /// Filter and rank; switches to `View::Search`.
    pub fn search(&mut self, records: &[ShipmentRecord]) -> Result<&SearchResults, ShipscopeError> {
        let filtered = apply_filter(records, &self.criteria)?;
        log::info!(
            "search kept {} of {} records (threshold {})",
            filtered.len(),
            records.len(),
            self.criteria.min_container_threshold
        );

        let results = SearchResults {
            exporters: rank_exporters(&filtered),
            carriers: rank_carriers(&filtered),
            records: filtered,
        };
        self.analysis = None;
        self.view = View::Search;
        Ok(self.search.insert(results))
    }

    /// Drill into the selected exporters over the current date range;
    /// switches to `View::Analysis`. `model` is `None` to skip the forecast.
    pub fn analyze(
        &mut self,
        records: &[ShipmentRecord],
        model: Option<&dyn ForecastModel>,
    ) -> Result<&ExporterAnalysis, ShipscopeError> {
        if self.selected_exporters.is_empty() {
            return Err(SessionError::NoExporterSelected.into());
        }
        self.criteria.validate()?;

        let start = self.criteria.date_start;
        let end = self.criteria.date_end;
        let subset = select_exporters(records, start, end, &self.selected_exporters);
        log::info!(
            "analysis subset for {}: {} records",
            self.selected_exporters.join(", "),
            subset.len()
        );

        let analysis =
            ExporterAnalysis::build(&subset, &self.selected_exporters, start, end, model);
        self.search = None;
        self.view = View::Analysis;
        Ok(self.analysis.insert(analysis))
    }

    pub fn set_narrative(&mut self, narrative: Narrative) -> Result<(), SessionError> {
        let analysis = self.analysis.as_mut().ok_or(SessionError::NoAnalysis)?;
        analysis.narrative = narrative;
        Ok(())
    }

    /// Back to the home view with default criteria and nothing cached.
    pub fn reset(&mut self) {
        *self = Self::with_defaults(self.defaults.clone());
    }
}
