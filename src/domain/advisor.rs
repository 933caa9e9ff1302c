//! Language-model requests: exporter sales report and shipper classification.
//!
//! Prompts are assembled here from aggregate views; the transport lives
//! behind `LanguageModelPort`. Failures are returned as recoverable errors
//! and never retried.

use crate::domain::aggregate::{RankedTotal, top_totals, total_containers, totals_by};
use crate::domain::error::ShipscopeError;
use crate::domain::shipment::{Dimension, ShipmentRecord};
use crate::ports::language_model_port::LanguageModelPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt::Write;

const BRIEF_TOP_N: usize = 5;

const REPORT_SYSTEM: &str =
    "You are an assistant that generates export container analysis reports.";
const CLASSIFY_SYSTEM: &str = "You are a helpful assistant for analyzing export companies.";

/// Facts about one exporter that the narrative report is grounded on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterBrief {
    pub exporter: String,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub total_containers: u64,
    pub loading_ports: Vec<(String, u64)>,
    pub destination_countries: Vec<String>,
    pub top_countries: Vec<RankedTotal>,
    pub top_arrival_ports: Vec<RankedTotal>,
    pub top_carriers: Vec<RankedTotal>,
}

impl ExporterBrief {
    /// Uses every record of `exporter`, regardless of any date filter.
    /// `None` when the exporter has no records.
    pub fn build(exporter: &str, records: &[ShipmentRecord]) -> Option<Self> {
        let own: Vec<ShipmentRecord> = records
            .iter()
            .filter(|r| r.exporter == exporter)
            .cloned()
            .collect();
        let first_date = own.iter().map(|r| r.shipment_date).min()?;
        let last_date = own.iter().map(|r| r.shipment_date).max()?;

        let mut seen = HashSet::new();
        let destination_countries = own
            .iter()
            .filter(|r| seen.insert(r.arrival_country.as_str()))
            .map(|r| r.arrival_country.clone())
            .collect();

        Some(Self {
            exporter: exporter.to_string(),
            first_date,
            last_date,
            total_containers: total_containers(&own),
            loading_ports: totals_by(&own, Dimension::LoadingPort).into_iter().collect(),
            destination_countries,
            top_countries: top_totals(&own, Dimension::ArrivalCountry, BRIEF_TOP_N),
            top_arrival_ports: top_totals(&own, Dimension::ArrivalPort, BRIEF_TOP_N),
            top_carriers: top_totals(&own, Dimension::Carrier, BRIEF_TOP_N),
        })
    }

    pub fn to_prompt(&self) -> String {
        let mut prompt = String::new();
        let _ = writeln!(
            prompt,
            "Write a container export analysis report for '{}' based on the data below.",
            self.exporter
        );
        prompt.push_str(
            "You are an international freight forwarder preparing to sell container logistics \
             services to this exporter.\n\
             Split the report into four parts: company overview, container export status, \
             logistics sales strategy, and carrier partnership strategy.\n\
             Keep the company overview to a short description of its main business or products.\n\n",
        );

        let _ = writeln!(
            prompt,
            "- Shipment period: {} ~ {}",
            self.first_date, self.last_date
        );
        let _ = writeln!(prompt, "- Total containers exported: {}", self.total_containers);
        let _ = writeln!(
            prompt,
            "- Containers by loading port: {}",
            join_pairs(self.loading_ports.iter().map(|(n, t)| (n.as_str(), *t)))
        );
        let _ = writeln!(
            prompt,
            "- Destination countries: {}",
            self.destination_countries.join(", ")
        );
        let _ = writeln!(
            prompt,
            "- Top {} destination countries: {}",
            BRIEF_TOP_N,
            join_ranked(&self.top_countries)
        );
        let _ = writeln!(
            prompt,
            "- Top {} arrival ports: {}",
            BRIEF_TOP_N,
            join_ranked(&self.top_arrival_ports)
        );
        let _ = writeln!(
            prompt,
            "- Top {} carriers by bookings: {}",
            BRIEF_TOP_N,
            join_ranked(&self.top_carriers)
        );

        prompt.push_str(
            "\nExpress container volumes as a count of containers, not TEU.\n\
             Always state the shipment period.\n\
             Group destination countries by region (Asia, Europe, Africa, North America, \
             South America, Oceania).\n\
             For the sales strategy, propose target countries and ports based on the main \
             destinations.\n\
             For the carrier strategy, recommend carriers to partner with based on the booking \
             carriers above.\n",
        );
        prompt
    }
}

fn join_pairs<'a>(pairs: impl Iterator<Item = (&'a str, u64)>) -> String {
    pairs
        .map(|(name, total)| format!("{name}: {total}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_ranked(rows: &[RankedTotal]) -> String {
    join_pairs(rows.iter().map(|r| (r.name.as_str(), r.total)))
}

/// Ask for the narrative report; the reply text is returned verbatim.
pub fn request_report(
    port: &dyn LanguageModelPort,
    brief: &ExporterBrief,
) -> Result<String, ShipscopeError> {
    log::info!("requesting report for {}", brief.exporter);
    port.complete(REPORT_SYSTEM, &brief.to_prompt())
}

pub fn classification_prompt(names: &[String]) -> String {
    let list = serde_json::to_string(names).unwrap_or_else(|_| names.join(", "));
    format!(
        "The following is a list of Korean exporters. Classify each one as either a logistics \
         company or an actual shipper.\n\
         An actual shipper manufactures or directly exports its own products.\n\
         Logistics companies include freight forwarders, shipping companies, logistics and \
         sea & air agents.\n\n\
         Exporter list:\n{list}\n\n\
         Output only the actual shippers, as a pure JSON array of strings.\n\
         Do not add any explanation or preamble. Do not include any text other than the JSON.\n\n\
         Format: [\"Shipper A\", \"Shipper B\", ...]\n"
    )
}

/// Names from `names` that the model classifies as actual shippers, in the
/// model's order. The reply must be a JSON array of strings.
pub fn classify_shippers(
    port: &dyn LanguageModelPort,
    names: &[String],
) -> Result<Vec<String>, ShipscopeError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    log::info!("classifying {} exporters", names.len());
    let reply = port.complete(CLASSIFY_SYSTEM, &classification_prompt(names))?;
    parse_classification(&reply, names)
}

pub fn parse_classification(reply: &str, names: &[String]) -> Result<Vec<String>, ShipscopeError> {
    let body = strip_code_fence(reply.trim());
    let parsed: Vec<String> =
        serde_json::from_str(body).map_err(|e| ShipscopeError::MalformedResponse {
            reason: format!("expected a JSON array of strings: {e}"),
        })?;

    let known: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut shippers = Vec::new();
    for name in parsed {
        let name = name.trim().to_string();
        if !known.contains(name.as_str()) {
            log::debug!("dropping unknown name from classification: {name}");
            continue;
        }
        if seen.insert(name.clone()) {
            shippers.push(name);
        }
    }
    Ok(shippers)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
