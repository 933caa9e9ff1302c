//! Forecast pipeline: daily series in, monthly projection and holdout error out.
//!
//! Dates without shipments stay absent from the history; the model sees the
//! real calendar offsets. Values are kept as `f64` throughout and rounded only
//! by the display helpers.

use crate::domain::aggregate::{DailyCount, monthly_rollup_of};
use crate::domain::shipment::YearMonth;
use crate::ports::forecast_port::ForecastModel;
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

pub const FORECAST_HORIZON_DAYS: i64 = 90;
pub const BACKTEST_HOLDOUT_DAYS: usize = 30;
pub const MIN_HISTORY_DATES: usize = 2;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForecastError {
    #[error("need at least {minimum} distinct dates, have {distinct_dates}")]
    InsufficientHistory {
        distinct_dates: usize,
        minimum: usize,
    },

    #[error("degenerate series: {reason}")]
    Degenerate { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl From<&DailyCount> for Observation {
    fn from(d: &DailyCount) -> Self {
        Self {
            date: d.date,
            value: d.total as f64,
        }
    }
}

/// One month of the combined actual/forecast table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyPoint {
    pub month: YearMonth,
    pub actual: Option<f64>,
    pub forecast: Option<f64>,
}

impl MonthlyPoint {
    pub fn actual_display(&self) -> Option<i64> {
        self.actual.map(|v| v.round() as i64)
    }

    pub fn forecast_display(&self) -> Option<i64> {
        self.forecast.map(|v| v.round() as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestScore {
    pub holdout_days: usize,
    pub mae: f64,
}

impl BacktestScore {
    pub fn mae_display(&self) -> i64 {
        self.mae.round() as i64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOutcome {
    pub last_observed: NaiveDate,
    /// Daily projection for the days after `last_observed`.
    pub projection: Vec<Observation>,
    pub monthly: Vec<MonthlyPoint>,
    /// `None` when the shortened history could not be fitted.
    pub backtest: Option<BacktestScore>,
}

pub fn to_observations(series: &[DailyCount]) -> Vec<Observation> {
    series.iter().map(Observation::from).collect()
}

/// Fit on the full history and predict every calendar day in
/// `(last_date, last_date + horizon_days]`.
pub fn project(
    model: &dyn ForecastModel,
    history: &[Observation],
    horizon_days: i64,
) -> Result<Vec<Observation>, ForecastError> {
    let last = history.last().ok_or(ForecastError::InsufficientHistory {
        distinct_dates: 0,
        minimum: MIN_HISTORY_DATES,
    })?;
    let fitted = model.fit(history)?;

    let dates: Vec<NaiveDate> = (1..=horizon_days)
        .map(|offset| last.date + Duration::days(offset))
        .collect();
    let values = fitted.predict(&dates);
    check_finite(&values)?;

    Ok(dates
        .into_iter()
        .zip(values)
        .map(|(date, value)| Observation { date, value })
        .collect())
}

/// Merge monthly actual sums with monthly projected sums. Only the month that
/// contains the last observed date can hold both.
pub fn combine_monthly(history: &[Observation], projection: &[Observation]) -> Vec<MonthlyPoint> {
    let mut table: BTreeMap<YearMonth, MonthlyPoint> = BTreeMap::new();

    for (month, total) in monthly_rollup_of(history.iter().map(|o| (o.date, o.value))) {
        table.insert(
            month,
            MonthlyPoint {
                month,
                actual: Some(total),
                forecast: None,
            },
        );
    }

    for (month, total) in monthly_rollup_of(projection.iter().map(|o| (o.date, o.value))) {
        table
            .entry(month)
            .or_insert(MonthlyPoint {
                month,
                actual: None,
                forecast: None,
            })
            .forecast = Some(total);
    }

    table.into_values().collect()
}

/// Hold out the last `holdout` observed dates, refit on the rest, and score
/// the predictions for the held-out dates.
pub fn backtest(
    model: &dyn ForecastModel,
    history: &[Observation],
    holdout: usize,
) -> Result<BacktestScore, ForecastError> {
    if holdout == 0 || history.len() <= holdout {
        return Err(ForecastError::InsufficientHistory {
            distinct_dates: history.len().saturating_sub(holdout),
            minimum: MIN_HISTORY_DATES,
        });
    }

    let split = history.len() - holdout;
    let (train, test) = history.split_at(split);
    let fitted = model.fit(train)?;

    let dates: Vec<NaiveDate> = test.iter().map(|o| o.date).collect();
    let predicted = fitted.predict(&dates);
    check_finite(&predicted)?;
    let actual: Vec<f64> = test.iter().map(|o| o.value).collect();

    Ok(BacktestScore {
        holdout_days: test.len(),
        mae: mean_absolute_error(&actual, &predicted),
    })
}

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / n as f64
}

/// Full forecast view for a daily series. A failed main fit is an error; a
/// failed backtest only leaves `backtest` empty.
pub fn run_forecast(
    model: &dyn ForecastModel,
    series: &[DailyCount],
) -> Result<ForecastOutcome, ForecastError> {
    let history = to_observations(series);
    if history.len() < MIN_HISTORY_DATES {
        return Err(ForecastError::InsufficientHistory {
            distinct_dates: history.len(),
            minimum: MIN_HISTORY_DATES,
        });
    }

    let projection = project(model, &history, FORECAST_HORIZON_DAYS)?;
    let monthly = combine_monthly(&history, &projection);

    let backtest = match backtest(model, &history, BACKTEST_HOLDOUT_DAYS) {
        Ok(score) => Some(score),
        Err(e) => {
            log::warn!("backtest skipped: {e}");
            None
        }
    };

    Ok(ForecastOutcome {
        last_observed: history[history.len() - 1].date,
        projection,
        monthly,
        backtest,
    })
}

fn check_finite(values: &[f64]) -> Result<(), ForecastError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ForecastError::Degenerate {
            reason: "model produced non-finite predictions".into(),
        })
    }
}
