//! # Sales Forecast
//!
//! Next-year shoe sales forecasts per institution, in aggregate and by size.
//!
//! ## Features
//!
//! - Loading annual sales tables (`Institution, Sale_Date, Total_Sales, Size_<n>`)
//! - Per-institution series with last-write-wins deduplication
//! - Two estimators side by side: a damped piecewise-linear trend and a
//!   simple moving average
//! - Allocation of each aggregate forecast over sizes by historical size mix
//! - CSV and JSON export of the comparison
//! - A daily tracking ledger that feeds the same series store
//!
//! ## Quick Start
//!
//! ```no_run
//! use sales_forecast::data::DataLoader;
//! use sales_forecast::report::forecast;
//! use sales_forecast::store::SeriesStore;
//!
//! let table = DataLoader::from_csv("actual_sales.csv")?;
//! let store = SeriesStore::from_table(table);
//! let series = store.series("Retail Store A")?;
//!
//! let report = forecast(&series, 2)?;
//! println!("SMA total: {}", report.moving_average().total());
//! if let Some(trend) = report.trend() {
//!     println!("Trend total: {}", trend.total());
//! }
//! report.write_csv(report.export_file_name())?;
//! # Ok::<(), sales_forecast::ForecastError>(())
//! ```

pub mod allocation;
pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod report;
pub mod series;
pub mod store;
pub mod tracking;

// Re-export commonly used types
pub use crate::allocation::{SizeAllocator, SizeRatioProfile};
pub use crate::config::ForecastConfig;
pub use crate::data::{DataLoader, SalesRecord, SalesTable};
pub use crate::error::{ForecastError, Result};
pub use crate::models::{ForecastMethod, ForecastModel, Forecaster};
pub use crate::report::{forecast, forecast_institution, Diagnostic, ForecastReport, ForecastResult};
pub use crate::series::{Observation, Series};
pub use crate::store::SeriesStore;
pub use crate::tracking::{DailyEntry, TrackingLedger};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
