//! Linear trend plus weekday seasonality, implementing `ForecastModel`.
//!
//! The trend is an OLS fit of value on calendar-day offset, so gaps in the
//! history keep their real spacing. Weekday factors are the mean detrended
//! residual per weekday, centred to sum to zero.

use crate::domain::forecast::{ForecastError, MIN_HISTORY_DATES, Observation};
use crate::ports::config_port::ConfigPort;
use crate::ports::forecast_port::{FittedModel, ForecastModel};
use chrono::{Datelike, NaiveDate};

const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Clone)]
pub struct SeasonalTrendModel {
    weekly_seasonality: bool,
}

impl SeasonalTrendModel {
    pub fn new(weekly_seasonality: bool) -> Self {
        Self { weekly_seasonality }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Self {
        Self::new(config.get_bool("forecast", "weekly_seasonality", true))
    }
}

impl Default for SeasonalTrendModel {
    fn default() -> Self {
        Self::new(true)
    }
}

#[derive(Debug, Clone)]
struct FittedSeasonalTrend {
    origin: NaiveDate,
    intercept: f64,
    slope: f64,
    weekday_factors: [f64; DAYS_PER_WEEK],
}

impl FittedSeasonalTrend {
    fn offset(&self, date: NaiveDate) -> f64 {
        (date - self.origin).num_days() as f64
    }
}

impl FittedModel for FittedSeasonalTrend {
    fn predict(&self, dates: &[NaiveDate]) -> Vec<f64> {
        dates
            .iter()
            .map(|&date| {
                let weekday = date.weekday().num_days_from_monday() as usize;
                let value = self.intercept
                    + self.slope * self.offset(date)
                    + self.weekday_factors[weekday];
                value.max(0.0)
            })
            .collect()
    }
}

impl ForecastModel for SeasonalTrendModel {
    fn fit(&self, history: &[Observation]) -> Result<Box<dyn FittedModel>, ForecastError> {
        if history.len() < MIN_HISTORY_DATES {
            return Err(ForecastError::InsufficientHistory {
                distinct_dates: history.len(),
                minimum: MIN_HISTORY_DATES,
            });
        }
        if history.iter().any(|o| !o.value.is_finite()) {
            return Err(ForecastError::Degenerate {
                reason: "history contains non-finite values".into(),
            });
        }

        let origin = history[0].date;
        let t: Vec<f64> = history
            .iter()
            .map(|o| (o.date - origin).num_days() as f64)
            .collect();
        let y: Vec<f64> = history.iter().map(|o| o.value).collect();

        let n = history.len() as f64;
        let sum_t: f64 = t.iter().sum();
        let sum_y: f64 = y.iter().sum();
        let sum_t2: f64 = t.iter().map(|v| v * v).sum();
        let sum_ty: f64 = t.iter().zip(&y).map(|(a, b)| a * b).sum();

        let denominator = n * sum_t2 - sum_t * sum_t;
        if denominator.abs() < 1e-10 {
            return Err(ForecastError::Degenerate {
                reason: "history spans a single day".into(),
            });
        }

        let slope = (n * sum_ty - sum_t * sum_y) / denominator;
        let intercept = (sum_y - slope * sum_t) / n;

        let mut weekday_factors = [0.0; DAYS_PER_WEEK];
        if self.weekly_seasonality && history.len() >= DAYS_PER_WEEK * 2 {
            let mut sums = [0.0; DAYS_PER_WEEK];
            let mut counts = [0usize; DAYS_PER_WEEK];
            for (obs, offset) in history.iter().zip(&t) {
                let weekday = obs.date.weekday().num_days_from_monday() as usize;
                sums[weekday] += obs.value - (intercept + slope * offset);
                counts[weekday] += 1;
            }

            let observed: Vec<usize> = (0..DAYS_PER_WEEK).filter(|&d| counts[d] > 0).collect();
            for &d in &observed {
                weekday_factors[d] = sums[d] / counts[d] as f64;
            }
            let mean_factor =
                observed.iter().map(|&d| weekday_factors[d]).sum::<f64>() / observed.len() as f64;
            for &d in &observed {
                weekday_factors[d] -= mean_factor;
            }
        }

        Ok(Box::new(FittedSeasonalTrend {
            origin,
            intercept,
            slope,
            weekday_factors,
        }))
    }
}
