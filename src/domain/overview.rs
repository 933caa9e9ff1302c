//! Dataset KPIs and selector option lists.

use crate::domain::aggregate::total_containers;
use crate::domain::filter::{DimensionFilter, WILDCARD};
use crate::domain::shipment::ShipmentRecord;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Headline counts for a record set: the whole table or an analysis subset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatasetOverview {
    pub records: usize,
    pub exporters: usize,
    pub importers: usize,
    pub loading_ports: usize,
    pub arrival_countries: usize,
    pub arrival_ports: usize,
    pub carriers: usize,
    pub total_containers: u64,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl DatasetOverview {
    pub fn compute(records: &[ShipmentRecord]) -> Self {
        fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> usize {
            values.filter(|v| !v.is_empty()).collect::<BTreeSet<_>>().len()
        }

        Self {
            records: records.len(),
            exporters: distinct(records.iter().map(|r| r.exporter.as_str())),
            importers: distinct(records.iter().map(|r| r.importer.as_str())),
            loading_ports: distinct(records.iter().map(|r| r.loading_port.as_str())),
            arrival_countries: distinct(records.iter().map(|r| r.arrival_country.as_str())),
            arrival_ports: distinct(records.iter().map(|r| r.arrival_port.as_str())),
            carriers: distinct(records.iter().map(|r| r.carrier.as_str())),
            total_containers: total_containers(records),
            first_date: records.iter().map(|r| r.shipment_date).min(),
            last_date: records.iter().map(|r| r.shipment_date).max(),
        }
    }

    /// `(first, last)` when the set is non-empty.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.first_date.zip(self.last_date)
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

/// Choices offered by the search selectors. Each list starts with "All".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    pub loading_ports: Vec<String>,
    pub arrival_countries: Vec<String>,
    pub arrival_ports: Vec<String>,
}

impl FilterOptions {
    /// Arrival ports are narrowed to `country` when it is not the wildcard.
    pub fn from_records(records: &[ShipmentRecord], country: &DimensionFilter) -> Self {
        fn with_wildcard<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
            let set: BTreeSet<&str> = values.filter(|v| !v.is_empty()).collect();
            std::iter::once(WILDCARD)
                .chain(set.into_iter().filter(|v| *v != WILDCARD))
                .map(str::to_string)
                .collect()
        }

        Self {
            loading_ports: with_wildcard(records.iter().map(|r| r.loading_port.as_str())),
            arrival_countries: with_wildcard(records.iter().map(|r| r.arrival_country.as_str())),
            arrival_ports: with_wildcard(
                records
                    .iter()
                    .filter(|r| country.matches(&r.arrival_country))
                    .map(|r| r.arrival_port.as_str()),
            ),
        }
    }
}
