//! CSV shipment file adapter.
//!
//! Accepts either English or the original Korean column headers, in any
//! order. All eight columns must be present; this is checked once per load.

use crate::domain::error::ShipscopeError;
use crate::domain::shipment::{MAX_CONTAINER_COUNT, ShipmentRecord};
use crate::ports::data_port::ShipmentSource;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::Path;
use std::sync::Arc;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    ShipmentDate,
    Exporter,
    Importer,
    LoadingPort,
    ArrivalPort,
    ArrivalCountry,
    Carrier,
    ContainerCount,
}

impl Column {
    const ALL: [Column; 8] = [
        Column::ShipmentDate,
        Column::Exporter,
        Column::Importer,
        Column::LoadingPort,
        Column::ArrivalPort,
        Column::ArrivalCountry,
        Column::Carrier,
        Column::ContainerCount,
    ];

    fn english(&self) -> &'static str {
        match self {
            Column::ShipmentDate => "shipment_date",
            Column::Exporter => "exporter",
            Column::Importer => "importer",
            Column::LoadingPort => "loading_port",
            Column::ArrivalPort => "arrival_port",
            Column::ArrivalCountry => "arrival_country",
            Column::Carrier => "carrier",
            Column::ContainerCount => "container_count",
        }
    }

    fn korean(&self) -> &'static str {
        match self {
            Column::ShipmentDate => "선적일",
            Column::Exporter => "수출자",
            Column::Importer => "수입자",
            Column::LoadingPort => "선적항",
            Column::ArrivalPort => "도착항",
            Column::ArrivalCountry => "도착지국가",
            Column::Carrier => "컨테이너선사",
            Column::ContainerCount => "컨테이너수",
        }
    }

    fn matches(&self, header: &str) -> bool {
        let header = header.trim();
        header.eq_ignore_ascii_case(self.english()) || header == self.korean()
    }
}

/// Header position of each column, indexed like `Column::ALL`.
struct ColumnIndex([usize; 8]);

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord, path: &Path) -> Result<Self, ShipscopeError> {
        let mut positions = [0usize; 8];
        for (slot, column) in positions.iter_mut().zip(Column::ALL) {
            *slot = headers
                .iter()
                .position(|h| column.matches(h))
                .ok_or_else(|| ShipscopeError::MissingColumn {
                    path: path.display().to_string(),
                    column: column.english().to_string(),
                })?;
        }
        Ok(Self(positions))
    }

    fn get<'r>(&self, record: &'r csv::StringRecord, column: Column) -> &'r str {
        let idx = Column::ALL
            .iter()
            .position(|c| *c == column)
            .map(|i| self.0[i])
            .unwrap_or(usize::MAX);
        record.get(idx).unwrap_or("").trim()
    }
}

pub struct CsvShipmentAdapter;

impl CsvShipmentAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(content: &str, path: &Path) -> Result<Vec<ShipmentRecord>, ShipscopeError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = rdr.headers().map_err(|e| ShipscopeError::DataLoad {
            path: path.display().to_string(),
            reason: format!("CSV header error: {}", e),
        })?;
        let index = ColumnIndex::resolve(headers, path)?;

        let mut records = Vec::new();
        for result in rdr.records() {
            let row = result.map_err(|e| ShipscopeError::DataLoad {
                path: path.display().to_string(),
                reason: format!("CSV parse error: {}", e),
            })?;
            let line = row.position().map(|p| p.line()).unwrap_or(0);

            if row.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            let shipment_date = parse_date(index.get(&row, Column::ShipmentDate)).ok_or_else(|| {
                ShipscopeError::InvalidRecord {
                    line,
                    reason: format!(
                        "invalid shipment date '{}'",
                        index.get(&row, Column::ShipmentDate)
                    ),
                }
            })?;
            let container_count = parse_count(index.get(&row, Column::ContainerCount))
                .map_err(|reason| ShipscopeError::InvalidRecord { line, reason })?;

            records.push(ShipmentRecord {
                shipment_date,
                exporter: index.get(&row, Column::Exporter).to_string(),
                importer: index.get(&row, Column::Importer).to_string(),
                loading_port: index.get(&row, Column::LoadingPort).to_string(),
                arrival_port: index.get(&row, Column::ArrivalPort).to_string(),
                arrival_country: index.get(&row, Column::ArrivalCountry).to_string(),
                carrier: index.get(&row, Column::Carrier).to_string(),
                container_count,
            });
        }

        records.sort_by_key(|r| r.shipment_date);
        Ok(records)
    }
}

impl Default for CsvShipmentAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ShipmentSource for CsvShipmentAdapter {
    fn load_shipments(&self, path: &Path) -> Result<Arc<[ShipmentRecord]>, ShipscopeError> {
        let content = fs::read_to_string(path).map_err(|e| ShipscopeError::DataLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let records = Self::parse(&content, path)?;
        log::info!("loaded {} shipment records from {}", records.len(), path.display());
        Ok(records.into())
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Blank counts read as zero; spreadsheet exports often write "12.0".
fn parse_count(value: &str) -> Result<u64, String> {
    if value.is_empty() {
        return Ok(0);
    }
    let cleaned = value.replace(',', "");
    let too_large = || format!("container count '{}' exceeds {}", value, MAX_CONTAINER_COUNT);
    if let Ok(n) = cleaned.parse::<u64>() {
        return if n <= MAX_CONTAINER_COUNT { Ok(n) } else { Err(too_large()) };
    }
    match cleaned.parse::<f64>() {
        Ok(f) if f < 0.0 => Err(format!("negative container count '{}'", value)),
        Ok(f) if f.is_finite() && f.fract() == 0.0 => {
            if f <= MAX_CONTAINER_COUNT as f64 {
                Ok(f as u64)
            } else {
                Err(too_large())
            }
        }
        _ => Err(format!("invalid container count '{}'", value)),
    }
}
