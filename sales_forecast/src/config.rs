//! Engine and tracking configuration, loaded from TOML

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use size_math::trend::TrendPrior;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub forecast: MovingAverageConfig,
    pub trend: TrendConfig,
    pub tracking: TrackingConfig,
    pub data: DataConfig,
}

/// Moving-average settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovingAverageConfig {
    /// Number of trailing years averaged by the SMA forecast
    pub sma_window: usize,
}

impl Default for MovingAverageConfig {
    fn default() -> Self {
        Self { sma_window: 2 }
    }
}

/// Trend model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Upper bound on changepoints; the model also caps it at `n - 1`
    pub max_changepoints: usize,
    /// Prior scale on slope changes; smaller means stiffer
    pub changepoint_prior_scale: f64,
    /// Fraction of the history in which changepoints may sit
    pub changepoint_range: f64,
    /// Observation noise assumed on the normalised series
    pub noise_scale: f64,
    /// Prior scale on the base slope and offset
    pub param_prior_scale: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        let prior = TrendPrior::default();
        Self {
            max_changepoints: 2,
            changepoint_prior_scale: prior.changepoint_scale,
            changepoint_range: 0.8,
            noise_scale: prior.noise_scale,
            param_prior_scale: prior.base_scale,
        }
    }
}

impl TrendConfig {
    /// Prior scales for the trend fit
    pub fn prior(&self) -> TrendPrior {
        TrendPrior {
            changepoint_scale: self.changepoint_prior_scale,
            base_scale: self.param_prior_scale,
            noise_scale: self.noise_scale,
        }
    }
}

/// Daily tracking ledger settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub size_min: u32,
    pub size_max: u32,
    pub institutions: Vec<String>,
    pub data_file: PathBuf,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            size_min: 4,
            size_max: 15,
            institutions: vec![
                "Retail Store A".to_string(),
                "Online Store".to_string(),
                "Outlet Store".to_string(),
            ],
            data_file: PathBuf::from("daily_sales.csv"),
        }
    }
}

impl TrackingConfig {
    /// Tracked sizes, inclusive on both ends
    pub fn sizes(&self) -> RangeInclusive<u32> {
        self.size_min..=self.size_max
    }
}

/// Historical data locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub sales_file: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            sales_file: PathBuf::from("actual_sales.csv"),
        }
    }
}

impl ForecastConfig {
    /// Load and validate a TOML config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ForecastError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate config from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ForecastConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every setting is in range
    pub fn validate(&self) -> Result<()> {
        if self.forecast.sma_window == 0 {
            return Err(ForecastError::ConfigError(
                "forecast.sma_window must be at least 1".to_string(),
            ));
        }

        let trend = &self.trend;
        for (name, value) in [
            ("trend.changepoint_prior_scale", trend.changepoint_prior_scale),
            ("trend.noise_scale", trend.noise_scale),
            ("trend.param_prior_scale", trend.param_prior_scale),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ForecastError::ConfigError(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !(0.0..=1.0).contains(&trend.changepoint_range) {
            return Err(ForecastError::ConfigError(format!(
                "trend.changepoint_range must be within [0, 1], got {}",
                trend.changepoint_range
            )));
        }

        if self.tracking.size_min > self.tracking.size_max {
            return Err(ForecastError::ConfigError(format!(
                "tracking.size_min ({}) exceeds tracking.size_max ({})",
                self.tracking.size_min, self.tracking.size_max
            )));
        }

        Ok(())
    }
}
