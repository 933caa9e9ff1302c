//! Aggregation views over a filtered record subset.
//!
//! Every function here is pure: records in, derived table out. Ordering is
//! deterministic so the same subset in any row order yields the same table.

use crate::domain::shipment::{Dimension, ShipmentRecord, YearMonth};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// One row of a ranking table (exporters, carriers, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedTotal {
    pub rank: usize,
    pub name: String,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShareRow {
    pub name: String,
    pub total: u64,
    pub share_pct: f64,
}

/// Row of a two-level breakdown; `share_pct` is relative to the group subtotal.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedShareRow {
    pub group: String,
    pub name: String,
    pub total: u64,
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTotal {
    pub group: String,
    pub name: String,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRow {
    pub exporter: String,
    pub loading_port: String,
    pub arrival_country: String,
    pub arrival_port: String,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteBreakdown {
    pub rows: Vec<RouteRow>,
    pub grand_total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyTotal {
    pub month: YearMonth,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub total: u64,
}

/// Months x dimension values, zero-filled. `cells[i][j]` is the total of
/// `values[j]` in `months[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendPivot {
    pub values: Vec<String>,
    pub months: Vec<YearMonth>,
    pub cells: Vec<Vec<u64>>,
}

/// Round a percentage to one decimal place.
pub fn round_share(pct: f64) -> f64 {
    (pct * 10.0).round() / 10.0
}

fn share_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round_share(part as f64 / whole as f64 * 100.0)
    }
}

pub fn total_containers(records: &[ShipmentRecord]) -> u64 {
    records
        .iter()
        .fold(0, |acc, r| acc.saturating_add(r.container_count))
}

/// Sum of container counts per value of `dimension`.
pub fn totals_by(records: &[ShipmentRecord], dimension: Dimension) -> BTreeMap<String, u64> {
    let mut totals = BTreeMap::new();
    for record in records {
        let total = totals
            .entry(record.dimension(dimension).to_string())
            .or_insert(0u64);
        *total = total.saturating_add(record.container_count);
    }
    totals
}

/// Sort totals descending (name ascending on ties) and assign "min" ranks:
/// equal totals share the lowest eligible rank and the next rank skips.
pub fn assign_min_ranks(totals: impl IntoIterator<Item = (String, u64)>) -> Vec<RankedTotal> {
    let mut sorted: Vec<(String, u64)> = totals.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut ranked = Vec::with_capacity(sorted.len());
    let mut current_rank = 0;
    let mut previous: Option<u64> = None;
    for (position, (name, total)) in sorted.into_iter().enumerate() {
        if previous != Some(total) {
            current_rank = position + 1;
            previous = Some(total);
        }
        ranked.push(RankedTotal {
            rank: current_rank,
            name,
            total,
        });
    }
    ranked
}

pub fn rank_by(records: &[ShipmentRecord], dimension: Dimension) -> Vec<RankedTotal> {
    assign_min_ranks(totals_by(records, dimension))
}

pub fn rank_exporters(records: &[ShipmentRecord]) -> Vec<RankedTotal> {
    rank_by(records, Dimension::Exporter)
}

pub fn rank_carriers(records: &[ShipmentRecord]) -> Vec<RankedTotal> {
    rank_by(records, Dimension::Carrier)
}

/// First `n` entries of the ranking for `dimension`.
pub fn top_totals(records: &[ShipmentRecord], dimension: Dimension, n: usize) -> Vec<RankedTotal> {
    let mut ranked = rank_by(records, dimension);
    ranked.truncate(n);
    ranked
}

/// Per-country totals with share of the grand total, largest first.
pub fn country_shares(records: &[ShipmentRecord]) -> Vec<ShareRow> {
    let grand_total = total_containers(records);
    rank_by(records, Dimension::ArrivalCountry)
        .into_iter()
        .map(|r| ShareRow {
            share_pct: share_of(r.total, grand_total),
            name: r.name,
            total: r.total,
        })
        .collect()
}

fn nested_totals(
    records: &[ShipmentRecord],
    outer: Dimension,
    inner: Dimension,
) -> Vec<(String, String, u64)> {
    let mut totals: BTreeMap<(String, String), u64> = BTreeMap::new();
    for record in records {
        let key = (
            record.dimension(outer).to_string(),
            record.dimension(inner).to_string(),
        );
        let total = totals.entry(key).or_insert(0);
        *total = total.saturating_add(record.container_count);
    }
    let mut rows: Vec<(String, String, u64)> =
        totals.into_iter().map(|((g, n), t)| (g, n, t)).collect();
    rows.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| b.2.cmp(&a.2))
            .then_with(|| a.1.cmp(&b.1))
    });
    rows
}

/// Carrier totals within each country; shares are of the country subtotal.
pub fn country_carrier_shares(records: &[ShipmentRecord]) -> Vec<NestedShareRow> {
    let subtotals = totals_by(records, Dimension::ArrivalCountry);
    nested_totals(records, Dimension::ArrivalCountry, Dimension::Carrier)
        .into_iter()
        .map(|(group, name, total)| {
            let subtotal = subtotals.get(&group).copied().unwrap_or(0);
            NestedShareRow {
                share_pct: share_of(total, subtotal),
                group,
                name,
                total,
            }
        })
        .collect()
}

pub fn country_importer_totals(records: &[ShipmentRecord]) -> Vec<GroupTotal> {
    nested_totals(records, Dimension::ArrivalCountry, Dimension::Importer)
        .into_iter()
        .map(|(group, name, total)| GroupTotal { group, name, total })
        .collect()
}

/// Exporter / loading port / country / arrival port totals plus grand total.
pub fn route_breakdown(records: &[ShipmentRecord]) -> RouteBreakdown {
    let mut totals: BTreeMap<(&str, &str, &str, &str), u64> = BTreeMap::new();
    for r in records {
        let key = (
            r.exporter.as_str(),
            r.loading_port.as_str(),
            r.arrival_country.as_str(),
            r.arrival_port.as_str(),
        );
        let total = totals.entry(key).or_insert(0);
        *total = total.saturating_add(r.container_count);
    }

    let mut rows: Vec<RouteRow> = totals
        .into_iter()
        .map(|((exporter, loading_port, country, port), total)| RouteRow {
            exporter: exporter.to_string(),
            loading_port: loading_port.to_string(),
            arrival_country: country.to_string(),
            arrival_port: port.to_string(),
            total,
        })
        .collect();
    // BTreeMap order already breaks ties; the stable sort keeps it.
    rows.sort_by(|a, b| b.total.cmp(&a.total));

    RouteBreakdown {
        grand_total: rows.iter().fold(0, |acc, r| acc.saturating_add(r.total)),
        rows,
    }
}

pub fn monthly_rollup(records: &[ShipmentRecord]) -> Vec<MonthlyTotal> {
    let mut totals: BTreeMap<YearMonth, u64> = BTreeMap::new();
    for record in records {
        let total = totals.entry(record.month()).or_insert(0);
        *total = total.saturating_add(record.container_count);
    }
    totals
        .into_iter()
        .map(|(month, total)| MonthlyTotal { month, total })
        .collect()
}

/// Monthly sums of dated fractional values, ascending by month.
pub fn monthly_rollup_of(
    values: impl IntoIterator<Item = (NaiveDate, f64)>,
) -> Vec<(YearMonth, f64)> {
    let mut totals: BTreeMap<YearMonth, f64> = BTreeMap::new();
    for (date, value) in values {
        *totals.entry(YearMonth::from_date(date)).or_insert(0.0) += value;
    }
    totals.into_iter().collect()
}

/// Per-date totals, ascending. Dates without shipments are absent.
pub fn daily_series(records: &[ShipmentRecord]) -> Vec<DailyCount> {
    let mut totals: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for record in records {
        let total = totals.entry(record.shipment_date).or_insert(0);
        *total = total.saturating_add(record.container_count);
    }
    totals
        .into_iter()
        .map(|(date, total)| DailyCount { date, total })
        .collect()
}

/// Rank values of `dimension` over the whole subset, keep the top `n`, and
/// pivot their monthly totals.
pub fn top_n_monthly_trend(
    records: &[ShipmentRecord],
    dimension: Dimension,
    n: usize,
) -> TrendPivot {
    let top: Vec<String> = top_totals(records, dimension, n)
        .into_iter()
        .map(|r| r.name)
        .collect();
    let column: HashMap<&str, usize> = top
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    let mut by_month: BTreeMap<YearMonth, Vec<u64>> = BTreeMap::new();
    for record in records {
        if let Some(&j) = column.get(record.dimension(dimension)) {
            let row = by_month
                .entry(record.month())
                .or_insert_with(|| vec![0; top.len()]);
            row[j] = row[j].saturating_add(record.container_count);
        }
    }

    let (months, cells) = by_month.into_iter().unzip();
    TrendPivot {
        values: top,
        months,
        cells,
    }
}

impl TrendPivot {
    pub fn column_totals(&self) -> Vec<u64> {
        (0..self.values.len())
            .map(|j| self.cells.iter().fold(0u64, |acc, row| acc.saturating_add(row[j])))
            .collect()
    }

    /// Keep the `n` columns with the largest totals, re-ranked the same way
    /// `top_n_monthly_trend` ranks values. All months are kept; a month where
    /// none of the kept values shipped reads as zeros.
    pub fn restrict_top(&self, n: usize) -> TrendPivot {
        let ranked = assign_min_ranks(
            self.values
                .iter()
                .cloned()
                .zip(self.column_totals()),
        );
        let kept: Vec<usize> = ranked
            .iter()
            .take(n)
            .filter_map(|r| self.values.iter().position(|v| *v == r.name))
            .collect();

        TrendPivot {
            values: kept.iter().map(|&j| self.values[j].clone()).collect(),
            months: self.months.clone(),
            cells: self
                .cells
                .iter()
                .map(|row| kept.iter().map(|&j| row[j]).collect())
                .collect(),
        }
    }
}
