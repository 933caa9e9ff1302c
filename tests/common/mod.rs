#![allow(dead_code)]

use chrono::NaiveDate;
use shipscope::domain::error::ShipscopeError;
pub use shipscope::domain::shipment::ShipmentRecord;
use shipscope::ports::data_port::ShipmentSource;
use shipscope::ports::language_model_port::LanguageModelPort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CSV_HEADER: &str =
    "shipment_date,exporter,importer,loading_port,arrival_port,arrival_country,carrier,container_count";

pub struct MockShipmentSource {
    pub tables: HashMap<PathBuf, Vec<ShipmentRecord>>,
    pub loads: RefCell<usize>,
}

impl MockShipmentSource {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            loads: RefCell::new(0),
        }
    }

    pub fn with_table(mut self, path: &str, records: Vec<ShipmentRecord>) -> Self {
        self.tables.insert(PathBuf::from(path), records);
        self
    }
}

impl ShipmentSource for MockShipmentSource {
    fn load_shipments(&self, path: &Path) -> Result<Arc<[ShipmentRecord]>, ShipscopeError> {
        *self.loads.borrow_mut() += 1;
        self.tables
            .get(path)
            .map(|rows| Arc::from(rows.clone()))
            .ok_or_else(|| ShipscopeError::DataLoad {
                path: path.display().to_string(),
                reason: "no such table".into(),
            })
    }
}

/// Replies with a fixed text (or error) and records every prompt.
pub struct MockLanguageModel {
    pub reply: Result<String, String>,
    pub calls: RefCell<Vec<(String, String)>>,
}

impl MockLanguageModel {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            reply: Err(reason.to_string()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl LanguageModelPort for MockLanguageModel {
    fn complete(&self, system: &str, prompt: &str) -> Result<String, ShipscopeError> {
        self.calls
            .borrow_mut()
            .push((system.to_string(), prompt.to_string()));
        self.reply
            .clone()
            .map_err(|reason| ShipscopeError::LanguageModel { reason })
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_record(shipment_date: &str, exporter: &str, count: u64) -> ShipmentRecord {
    RecordBuilder::new(shipment_date, exporter).count(count).build()
}

pub struct RecordBuilder {
    record: ShipmentRecord,
}

impl RecordBuilder {
    pub fn new(shipment_date: &str, exporter: &str) -> Self {
        Self {
            record: ShipmentRecord {
                shipment_date: date(shipment_date),
                exporter: exporter.to_string(),
                importer: "Pacific Metals".to_string(),
                loading_port: "Busan".to_string(),
                arrival_port: "Long Beach".to_string(),
                arrival_country: "USA".to_string(),
                carrier: "HMM".to_string(),
                container_count: 1,
            },
        }
    }

    pub fn importer(mut self, v: &str) -> Self {
        self.record.importer = v.to_string();
        self
    }

    pub fn loading_port(mut self, v: &str) -> Self {
        self.record.loading_port = v.to_string();
        self
    }

    pub fn destination(mut self, country: &str, port: &str) -> Self {
        self.record.arrival_country = country.to_string();
        self.record.arrival_port = port.to_string();
        self
    }

    pub fn carrier(mut self, v: &str) -> Self {
        self.record.carrier = v.to_string();
        self
    }

    pub fn count(mut self, v: u64) -> Self {
        self.record.container_count = v;
        self
    }

    pub fn build(self) -> ShipmentRecord {
        self.record
    }
}

/// The three-row filter scenario: A ships 10 and 5 in January, B ships 100
/// on 2024-02-01.
pub fn scenario_records() -> Vec<ShipmentRecord> {
    vec![
        make_record("2024-01-05", "A", 10),
        make_record("2024-01-20", "A", 5),
        RecordBuilder::new("2024-02-01", "B")
            .loading_port("Incheon")
            .destination("Japan", "Tokyo")
            .carrier("ONE")
            .count(100)
            .build(),
    ]
}

/// Roughly four months of daily shipments for two exporters across three
/// countries, enough history for the forecast and backtest.
pub fn season_records() -> Vec<ShipmentRecord> {
    let start = date("2024-01-01");
    let mut rows = Vec::new();
    for i in 0..120i64 {
        let d = start + chrono::Duration::days(i);
        let day = d.format("%Y-%m-%d").to_string();
        let (country, port) = match i % 3 {
            0 => ("USA", "Long Beach"),
            1 => ("Japan", "Tokyo"),
            _ => ("Vietnam", "Hai Phong"),
        };
        rows.push(
            RecordBuilder::new(&day, "Hanil Steel")
                .destination(country, port)
                .carrier(if i % 2 == 0 { "HMM" } else { "ONE" })
                .importer(if i % 4 == 0 { "Tokyo Trade" } else { "Pacific Metals" })
                .count(5 + (i % 7) as u64)
                .build(),
        );
        if i % 5 == 0 {
            rows.push(
                RecordBuilder::new(&day, "Busan Sea & Air")
                    .loading_port("Incheon")
                    .destination("Japan", "Osaka")
                    .carrier("ONE")
                    .count(3)
                    .build(),
            );
        }
    }
    rows
}

pub fn to_csv(records: &[ShipmentRecord]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for r in records {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            r.shipment_date,
            r.exporter,
            r.importer,
            r.loading_port,
            r.arrival_port,
            r.arrival_country,
            r.carrier,
            r.container_count
        ));
    }
    out
}
