//! Forecasting models for annual sales totals
//!
//! Each model is trained on a [`Series`] and yields one point forecast for
//! the period after the last observation. The [`Forecaster`] capability
//! wraps train-then-forecast and rounds to whole pairs, so new estimators
//! slot in without touching allocation or reporting.

use crate::error::Result;
use crate::series::Series;
use serde::{Deserialize, Serialize};
use size_math::rounding::to_whole;
use std::fmt::{self, Debug};
use tracing::debug;

pub mod moving_average;
pub mod trend;

pub use moving_average::MovingAverageForecaster;
pub use trend::TrendForecaster;

/// The estimators reported side by side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    Trend,
    MovingAverage,
}

impl ForecastMethod {
    /// Every method, in report column order
    pub const ALL: [ForecastMethod; 2] = [ForecastMethod::Trend, ForecastMethod::MovingAverage];

    /// Short display label
    pub fn label(&self) -> &'static str {
        match self {
            ForecastMethod::Trend => "Trend",
            ForecastMethod::MovingAverage => "SMA",
        }
    }

    /// Header of this method's column in exported tables
    pub fn column_header(&self) -> String {
        format!("{} Forecast", self.label())
    }
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Point forecast for the period after the training data
    fn forecast_next(&self) -> Result<f64>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a sales series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a series
    fn train(&self, series: &Series) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;

    /// Which report slot this model fills
    fn method(&self) -> ForecastMethod;
}

/// Anything that turns a series into a whole-number forecast
pub trait Forecaster {
    fn forecast(&self, series: &Series) -> Result<i64>;
}

impl<M: ForecastModel> Forecaster for M {
    fn forecast(&self, series: &Series) -> Result<i64> {
        let trained = self.train(series)?;
        let point = trained.forecast_next()?;
        debug!(model = trained.name(), point, "point forecast");
        Ok(to_whole(point)?)
    }
}
