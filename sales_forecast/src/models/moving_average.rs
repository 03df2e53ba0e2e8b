//! Simple moving average over annual totals

use crate::error::{ForecastError, Result};
use crate::models::{ForecastMethod, ForecastModel, TrainedForecastModel};
use crate::series::Series;
use size_math::moving_averages::trailing_mean;

/// Unweighted mean of the last `window` totals
#[derive(Debug, Clone)]
pub struct MovingAverageForecaster {
    /// Name of the model
    name: String,
    /// Window size
    window: usize,
}

/// Trained moving average
#[derive(Debug, Clone)]
pub struct TrainedMovingAverage {
    name: String,
    window: usize,
    average: f64,
}

impl MovingAverageForecaster {
    /// Create a new moving average forecaster
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window size must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: format!("{}-Year SMA", window),
            window,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl ForecastModel for MovingAverageForecaster {
    type Trained = TrainedMovingAverage;

    fn train(&self, series: &Series) -> Result<Self::Trained> {
        let totals = series.totals();
        if totals.len() < self.window {
            return Err(ForecastError::InvalidParameter(format!(
                "Window of {} exceeds the {} observations available",
                self.window,
                totals.len()
            )));
        }

        let average = trailing_mean(&totals, self.window)?;

        Ok(TrainedMovingAverage {
            name: self.name.clone(),
            window: self.window,
            average,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn method(&self) -> ForecastMethod {
        ForecastMethod::MovingAverage
    }
}

impl TrainedMovingAverage {
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn average(&self) -> f64 {
        self.average
    }
}

impl TrainedForecastModel for TrainedMovingAverage {
    fn forecast_next(&self) -> Result<f64> {
        // A moving average forecasts its own level
        Ok(self.average)
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
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn series(totals: &[f64]) -> Series {
        let observations = totals
            .iter()
            .enumerate()
            .map(|(i, &total)| {
                let date = NaiveDate::from_ymd_opt(2018 + i as i32, 1, 1).unwrap();
                Observation::new(date, total, BTreeMap::new())
            })
            .collect();
        Series::new("Retail Store A", observations).unwrap()
    }

    #[test]
    fn test_moving_average_forecast() {
        let s = series(&[100.0, 120.0, 151.0]);

        assert_eq!(MovingAverageForecaster::new(1).unwrap().forecast(&s).unwrap(), 151);
        // (120 + 151) / 2 = 135.5 rounds to the even neighbour
        assert_eq!(MovingAverageForecaster::new(2).unwrap().forecast(&s).unwrap(), 136);
        assert_eq!(MovingAverageForecaster::new(3).unwrap().forecast(&s).unwrap(), 124);
    }

    #[test]
    fn test_half_rounds_to_even() {
        let s = series(&[100.0, 121.0]);
        assert_eq!(MovingAverageForecaster::new(2).unwrap().forecast(&s).unwrap(), 110);
    }

    #[test]
    fn test_window_validation() {
        assert!(MovingAverageForecaster::new(0).is_err());

        let s = series(&[1.0, 2.0]);
        let too_wide = MovingAverageForecaster::new(3).unwrap();
        assert!(matches!(
            too_wide.train(&s),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_model_metadata() {
        let model = MovingAverageForecaster::new(2).unwrap();
        assert_eq!(model.name(), "2-Year SMA");
        assert_eq!(model.method(), ForecastMethod::MovingAverage);

        let trained = model.train(&series(&[4.0, 6.0])).unwrap();
        assert_eq!(trained.window(), 2);
        assert_eq!(trained.average(), 5.0);
    }
}
