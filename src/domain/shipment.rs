//! Shipment record representation.

use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Largest container count accepted for a single shipment line.
pub const MAX_CONTAINER_COUNT: u64 = 1_000_000;

/// One export shipment line. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentRecord {
    pub shipment_date: NaiveDate,
    pub exporter: String,
    pub importer: String,
    pub loading_port: String,
    pub arrival_port: String,
    pub arrival_country: String,
    pub carrier: String,
    pub container_count: u64,
}

impl ShipmentRecord {
    pub fn month(&self) -> YearMonth {
        YearMonth::from_date(self.shipment_date)
    }

    pub fn dimension(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Exporter => &self.exporter,
            Dimension::Importer => &self.importer,
            Dimension::LoadingPort => &self.loading_port,
            Dimension::ArrivalPort => &self.arrival_port,
            Dimension::ArrivalCountry => &self.arrival_country,
            Dimension::Carrier => &self.carrier,
        }
    }
}

/// The string-valued columns a record can be grouped or filtered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Exporter,
    Importer,
    LoadingPort,
    ArrivalPort,
    ArrivalCountry,
    Carrier,
}

/// Calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
