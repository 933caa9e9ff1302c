//! Time-series forecasting port.
//!
//! Mirrors a forecasting library boundary: fit a model on daily history,
//! then ask it for point estimates on arbitrary calendar dates.

use crate::domain::forecast::{ForecastError, Observation};
use chrono::NaiveDate;

pub trait ForecastModel {
    /// Fit on `history`, which is sorted by date with one entry per date.
    fn fit(&self, history: &[Observation]) -> Result<Box<dyn FittedModel>, ForecastError>;
}

pub trait FittedModel {
    /// Point estimate for each date, in the same order as `dates`.
    fn predict(&self, dates: &[NaiveDate]) -> Vec<f64>;
}
