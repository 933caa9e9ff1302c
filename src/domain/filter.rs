//! Filter engine: date range, dimension equality and exporter threshold.
//!
//! The threshold applies to each exporter's aggregate over the date and
//! dimension filtered rows, so an exporter is kept or dropped as a whole.

use crate::domain::error::ShipscopeError;
use crate::domain::shipment::ShipmentRecord;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Wildcard token used by the dashboard selectors.
pub const WILDCARD: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DimensionFilter {
    #[default]
    All,
    Exact(String),
}

impl DimensionFilter {
    /// Parse a selector value; empty input and "All" both mean unconstrained.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == WILDCARD {
            DimensionFilter::All
        } else {
            DimensionFilter::Exact(trimmed.to_string())
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            DimensionFilter::All => true,
            DimensionFilter::Exact(expected) => expected == value,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, DimensionFilter::All)
    }
}

impl fmt::Display for DimensionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionFilter::All => f.write_str(WILDCARD),
            DimensionFilter::Exact(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub loading_port: DimensionFilter,
    pub arrival_country: DimensionFilter,
    pub arrival_port: DimensionFilter,
    pub min_container_threshold: u64,
}

impl FilterCriteria {
    /// Unconstrained criteria over `[date_start, date_end]`.
    pub fn new(date_start: NaiveDate, date_end: NaiveDate) -> Result<Self, ShipscopeError> {
        let criteria = Self {
            date_start,
            date_end,
            loading_port: DimensionFilter::All,
            arrival_country: DimensionFilter::All,
            arrival_port: DimensionFilter::All,
            min_container_threshold: 0,
        };
        criteria.validate()?;
        Ok(criteria)
    }

    pub fn validate(&self) -> Result<(), ShipscopeError> {
        if self.date_start > self.date_end {
            return Err(ShipscopeError::InvalidCriteria {
                reason: format!(
                    "start date {} is after end date {}",
                    self.date_start, self.date_end
                ),
            });
        }
        Ok(())
    }

    pub fn in_range(&self, date: NaiveDate) -> bool {
        date >= self.date_start && date <= self.date_end
    }

    fn matches_dimensions(&self, record: &ShipmentRecord) -> bool {
        self.loading_port.matches(&record.loading_port)
            && self.arrival_country.matches(&record.arrival_country)
            && self.arrival_port.matches(&record.arrival_port)
    }
}

/// Records within `[start, end]`, inclusive on both ends.
pub fn filter_by_date(
    records: &[ShipmentRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<ShipmentRecord> {
    records
        .iter()
        .filter(|r| r.shipment_date >= start && r.shipment_date <= end)
        .cloned()
        .collect()
}

/// Apply the full filter: date range, dimensions, then the exporter threshold.
pub fn apply_filter(
    records: &[ShipmentRecord],
    criteria: &FilterCriteria,
) -> Result<Vec<ShipmentRecord>, ShipscopeError> {
    criteria.validate()?;

    let candidates: Vec<&ShipmentRecord> = records
        .iter()
        .filter(|r| criteria.in_range(r.shipment_date) && criteria.matches_dimensions(r))
        .collect();

    let mut totals: HashMap<&str, u64> = HashMap::new();
    for record in &candidates {
        let total = totals.entry(record.exporter.as_str()).or_default();
        *total = total.saturating_add(record.container_count);
    }

    let qualifying: HashSet<&str> = totals
        .into_iter()
        .filter(|(_, total)| *total >= criteria.min_container_threshold)
        .map(|(exporter, _)| exporter)
        .collect();

    Ok(candidates
        .into_iter()
        .filter(|r| qualifying.contains(r.exporter.as_str()))
        .cloned()
        .collect())
}

/// Drill-down subset for exporter analysis: date range and exporter
/// membership only. Dimension filters do not apply here.
pub fn select_exporters(
    records: &[ShipmentRecord],
    start: NaiveDate,
    end: NaiveDate,
    exporters: &[String],
) -> Vec<ShipmentRecord> {
    let wanted: HashSet<&str> = exporters.iter().map(String::as_str).collect();
    records
        .iter()
        .filter(|r| r.shipment_date >= start && r.shipment_date <= end)
        .filter(|r| wanted.contains(r.exporter.as_str()))
        .cloned()
        .collect()
}
