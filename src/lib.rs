//! # Shoe Sales
//!
//! Workspace facade over the shoe sales forecasting crates.
//!
//! - [`size_math`]: moving averages, the damped trend fit and rounding rules
//! - [`sales_forecast`]: series, forecasters, size allocation, reports and
//!   the daily tracking ledger
//!
//! ## Example
//!
//! ```
//! use shoe_sales_workspace::sales_forecast::{forecast, Observation, Series};
//! use std::collections::BTreeMap;
//!
//! let year = |y| chrono::NaiveDate::from_ymd_opt(y, 1, 1).unwrap();
//! let series = Series::new(
//!     "Retail Store A",
//!     vec![
//!         Observation::new(year(2021), 100.0, BTreeMap::from([(8, 20.0), (9, 30.0), (10, 50.0)])),
//!         Observation::new(year(2022), 120.0, BTreeMap::from([(8, 24.0), (9, 36.0), (10, 60.0)])),
//!     ],
//! )
//! .unwrap();
//!
//! let report = forecast(&series, 2).unwrap();
//! assert_eq!(report.moving_average().total(), 110);
//! assert_eq!(report.moving_average().size(9), Some(33));
//! ```

pub use sales_forecast;
pub use size_math;

/// Load an annual sales table and forecast one institution with the given
/// configuration.
pub fn forecast_from_csv<P: AsRef<std::path::Path>>(
    path: P,
    institution: &str,
    config: &sales_forecast::ForecastConfig,
) -> sales_forecast::Result<sales_forecast::ForecastReport> {
    let table = sales_forecast::DataLoader::from_csv(path)?;
    let store = sales_forecast::SeriesStore::from_table(table);
    sales_forecast::forecast_institution(&store, institution, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_from_missing_csv() {
        let result = forecast_from_csv(
            "/nonexistent/actual_sales.csv",
            "Retail Store A",
            &sales_forecast::ForecastConfig::default(),
        );
        assert!(result.is_err());
    }
}
