//! Damped trend forecaster for annual totals
//!
//! Dates are mapped onto `t` in `[0, 1]` across the observed history and
//! totals are divided by their largest magnitude before fitting, so the
//! prior scales in [`TrendConfig`] mean the same thing for a boutique and a
//! chain. Seasonality is not modelled: with one point per year there is
//! nothing within a year to fit.

use crate::config::TrendConfig;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastMethod, ForecastModel, TrainedForecastModel};
use crate::series::Series;
use chrono::NaiveDate;
use size_math::trend::{changepoint_indices, FittedTrend, PiecewiseLinearTrend};
use size_math::MathError;
use tracing::debug;

/// Piecewise-linear trend with strongly damped changepoints
#[derive(Debug, Clone)]
pub struct TrendForecaster {
    name: String,
    config: TrendConfig,
}

/// Trend fitted to one series
#[derive(Debug, Clone)]
pub struct TrainedTrend {
    name: String,
    fitted: FittedTrend,
    start: NaiveDate,
    span_days: f64,
    y_scale: f64,
    target: NaiveDate,
}

fn fit_failed(err: MathError) -> ForecastError {
    ForecastError::FitFailed(err.to_string())
}

impl TrendForecaster {
    pub fn new(config: TrendConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.changepoint_range) {
            return Err(ForecastError::InvalidParameter(format!(
                "Changepoint range must be within [0, 1], got {}",
                config.changepoint_range
            )));
        }

        Ok(Self {
            name: "Damped Trend".to_string(),
            config,
        })
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Changepoints allowed for `n` observations
    pub fn changepoint_cap(&self, n: usize) -> usize {
        self.config.max_changepoints.min(n.saturating_sub(1))
    }
}

impl Default for TrendForecaster {
    fn default() -> Self {
        Self {
            name: "Damped Trend".to_string(),
            config: TrendConfig::default(),
        }
    }
}

impl ForecastModel for TrendForecaster {
    type Trained = TrainedTrend;

    fn train(&self, series: &Series) -> Result<Self::Trained> {
        let totals = series.totals();
        let first_total = totals[0];
        if totals.iter().all(|&y| y == first_total) {
            return Err(ForecastError::FitFailed(format!(
                "degenerate series: every total equals {}",
                first_total
            )));
        }

        let start = series.first_date();
        let span_days = (series.last_date() - start).num_days() as f64;
        if span_days <= 0.0 {
            return Err(ForecastError::FitFailed(
                "series covers no time span".to_string(),
            ));
        }

        let t: Vec<f64> = series
            .dates()
            .iter()
            .map(|d| (*d - start).num_days() as f64 / span_days)
            .collect();
        let y_scale = totals.iter().fold(0.0_f64, |acc, y| acc.max(y.abs()));
        let y: Vec<f64> = totals.iter().map(|v| v / y_scale).collect();

        let cap = self.changepoint_cap(series.len());
        let changepoints: Vec<f64> =
            changepoint_indices(series.len(), cap, self.config.changepoint_range)
                .into_iter()
                .map(|i| t[i])
                .collect();

        let trend = PiecewiseLinearTrend::new(changepoints, self.config.prior())
            .map_err(fit_failed)?;
        let fitted = trend.fit(&t, &y).map_err(fit_failed)?;

        debug!(
            institution = series.institution(),
            changepoints = trend.changepoint_count(),
            final_slope = fitted.slope_at(1.0),
            r_squared = ?fitted.r_squared(&t, &y).ok(),
            "fitted trend"
        );

        Ok(TrainedTrend {
            name: self.name.clone(),
            fitted,
            start,
            span_days,
            y_scale,
            target: series.next_period_date()?,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn method(&self) -> ForecastMethod {
        ForecastMethod::Trend
    }
}

impl TrainedTrend {
    /// Date the forecast is made for
    pub fn target_date(&self) -> NaiveDate {
        self.target
    }

    /// Fitted parameters on the normalised scale
    pub fn fitted(&self) -> &FittedTrend {
        &self.fitted
    }

    /// Trend value at `date`, in sales units
    pub fn predict_at(&self, date: NaiveDate) -> f64 {
        let t = (date - self.start).num_days() as f64 / self.span_days;
        self.fitted.predict(t) * self.y_scale
    }
}

impl TrainedForecastModel for TrainedTrend {
    fn forecast_next(&self) -> Result<f64> {
        let value = self.predict_at(self.target);
        if !value.is_finite() {
            return Err(ForecastError::FitFailed(format!(
                "non-finite prediction for {}",
                self.target
            )));
        }
        Ok(value)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Forecaster;
    use crate::series::Observation;
    use std::collections::BTreeMap;

    fn series(totals: &[f64]) -> Series {
        let observations = totals
            .iter()
            .enumerate()
            .map(|(i, &total)| {
                let date = NaiveDate::from_ymd_opt(2019 + i as i32, 6, 1).unwrap();
                Observation::new(date, total, BTreeMap::new())
            })
            .collect();
        Series::new("Online Store", observations).unwrap()
    }

    #[test]
    fn test_two_point_series_extends_line() {
        let forecast = TrendForecaster::default()
            .forecast(&series(&[100.0, 120.0]))
            .unwrap();
        assert!((138..=141).contains(&forecast), "got {}", forecast);
    }

    #[test]
    fn test_linear_growth() {
        let forecast = TrendForecaster::default()
            .forecast(&series(&[100.0, 110.0, 120.0, 130.0]))
            .unwrap();
        assert!((137..=142).contains(&forecast), "got {}", forecast);
    }

    #[test]
    fn test_declining_series() {
        let forecast = TrendForecaster::default()
            .forecast(&series(&[300.0, 250.0, 200.0]))
            .unwrap();
        assert!((148..=158).contains(&forecast), "got {}", forecast);
    }

    #[test]
    fn test_constant_series_fails() {
        let result = TrendForecaster::default().forecast(&series(&[80.0, 80.0, 80.0]));
        assert!(matches!(result, Err(ForecastError::FitFailed(_))));
    }

    #[test]
    fn test_changepoint_cap() {
        let model = TrendForecaster::default();
        assert_eq!(model.changepoint_cap(2), 1);
        assert_eq!(model.changepoint_cap(3), 2);
        assert_eq!(model.changepoint_cap(8), 2);
    }

    #[test]
    fn test_target_date() {
        let trained = TrendForecaster::default()
            .train(&series(&[10.0, 20.0]))
            .unwrap();
        assert_eq!(
            trained.target_date(),
            NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()
        );
        assert_eq!(trained.name(), "Damped Trend");
    }

    #[test]
    fn test_invalid_range() {
        let config = TrendConfig {
            changepoint_range: 1.2,
            ..TrendConfig::default()
        };
        assert!(TrendForecaster::new(config).is_err());
    }
}
