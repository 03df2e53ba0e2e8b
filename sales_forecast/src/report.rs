//! Side-by-side forecast report
//!
//! A report always carries the moving-average result. The trend result is
//! optional: when the trend fit fails the slot is `None` and a
//! [`Diagnostic::TrendUnavailable`] explains why, so a missing forecast is
//! never confused with a forecast of zero.

use crate::allocation::{SizeAllocator, SizeRatioProfile};
use crate::config::{ForecastConfig, TrendConfig};
use crate::error::{ForecastError, Result};
use crate::models::{
    ForecastMethod, ForecastModel, Forecaster, MovingAverageForecaster, TrendForecaster,
};
use crate::series::Series;
use crate::store::SeriesStore;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Aggregate and per-size forecast of one method
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    method: ForecastMethod,
    total: i64,
    per_size: BTreeMap<u32, i64>,
}

impl ForecastResult {
    /// Allocate `total` over `profile` for `method`
    pub fn allocate(method: ForecastMethod, total: i64, profile: &SizeRatioProfile) -> Self {
        Self {
            method,
            total,
            per_size: SizeAllocator.allocate(total, profile),
        }
    }

    pub fn method(&self) -> ForecastMethod {
        self.method
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn per_size(&self) -> &BTreeMap<u32, i64> {
        &self.per_size
    }

    /// Forecast for one size
    pub fn size(&self, size: u32) -> Option<i64> {
        self.per_size.get(&size).copied()
    }

    /// Per-size sum minus the aggregate
    pub fn drift(&self) -> i64 {
        SizeAllocator::drift(self.total, &self.per_size)
    }
}

/// Non-fatal findings attached to a report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The trend fit failed; only the moving average is reported
    TrendUnavailable { reason: String },
    /// Rounded sizes do not add up to the aggregate
    AllocationDrift { method: ForecastMethod, residual: i64 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::TrendUnavailable { reason } => {
                write!(f, "Trend forecast unavailable: {}", reason)
            }
            Diagnostic::AllocationDrift { method, residual } => write!(
                f,
                "{} size forecasts sum to {:+} pairs versus the total",
                method, residual
            ),
        }
    }
}

/// One row of the per-size comparison table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub size: u32,
    pub trend: Option<i64>,
    pub moving_average: i64,
}

impl ReportRow {
    /// The method with the larger forecast; `None` on a tie
    pub fn highlight_max(&self) -> Option<ForecastMethod> {
        match self.trend {
            None => Some(ForecastMethod::MovingAverage),
            Some(trend) if trend > self.moving_average => Some(ForecastMethod::Trend),
            Some(trend) if trend < self.moving_average => Some(ForecastMethod::MovingAverage),
            Some(_) => None,
        }
    }
}

/// Both forecasts for one institution and one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    institution: String,
    window: usize,
    target_date: NaiveDate,
    profile: SizeRatioProfile,
    trend: Option<ForecastResult>,
    moving_average: ForecastResult,
    diagnostics: Vec<Diagnostic>,
}

impl ForecastReport {
    pub fn institution(&self) -> &str {
        &self.institution
    }

    /// Moving-average window actually used, after clamping
    pub fn window(&self) -> usize {
        self.window
    }

    /// Date the forecasts are for
    pub fn target_date(&self) -> NaiveDate {
        self.target_date
    }

    pub fn profile(&self) -> &SizeRatioProfile {
        &self.profile
    }

    pub fn trend(&self) -> Option<&ForecastResult> {
        self.trend.as_ref()
    }

    pub fn moving_average(&self) -> &ForecastResult {
        &self.moving_average
    }

    pub fn result(&self, method: ForecastMethod) -> Option<&ForecastResult> {
        match method {
            ForecastMethod::Trend => self.trend(),
            ForecastMethod::MovingAverage => Some(self.moving_average()),
        }
    }

    /// Present results in column order
    pub fn results(&self) -> impl Iterator<Item = &ForecastResult> + '_ {
        ForecastMethod::ALL
            .into_iter()
            .filter_map(move |method| self.result(method))
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Per-size comparison rows, ascending by size
    pub fn rows(&self) -> Vec<ReportRow> {
        self.profile
            .sizes()
            .into_iter()
            .map(|size| ReportRow {
                size,
                trend: self.trend.as_ref().and_then(|r| r.size(size)),
                moving_average: self.moving_average.size(size).unwrap_or_default(),
            })
            .collect()
    }

    /// Write the comparison table as CSV with a header row.
    ///
    /// Columns are `Size`, `Trend Forecast`, `SMA Forecast`; an absent trend
    /// leaves its cells empty.
    pub fn to_csv_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record([
            "Size".to_string(),
            ForecastMethod::Trend.column_header(),
            ForecastMethod::MovingAverage.column_header(),
        ])?;

        for row in self.rows() {
            csv_writer.write_record([
                row.size.to_string(),
                row.trend.map(|v| v.to_string()).unwrap_or_default(),
                row.moving_average.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// The CSV export as a UTF-8 string
    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.to_csv_writer(&mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| ForecastError::SerializationError(e.to_string()))
    }

    /// Write the CSV export to `path`
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.to_csv_writer(file)
    }

    /// Default export file name, e.g. `Outlet Store_forecast.csv`
    pub fn export_file_name(&self) -> String {
        format!("{}_forecast.csv", self.institution)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Forecast `series` with the default trend settings
pub fn forecast(series: &Series, window_size: usize) -> Result<ForecastReport> {
    forecast_with(series, window_size, &TrendConfig::default())
}

/// Forecast `series` with explicit trend settings.
///
/// Fails only with [`ForecastError::InsufficientData`]; a failing trend fit
/// yields a report without the trend result.
pub fn forecast_with(
    series: &Series,
    window_size: usize,
    trend_config: &TrendConfig,
) -> Result<ForecastReport> {
    if series.len() < 2 {
        return Err(ForecastError::InsufficientData {
            institution: series.institution().to_string(),
            found: series.len(),
        });
    }

    let window = window_size.clamp(1, series.len());
    if window != window_size {
        debug!(
            requested = window_size,
            used = window,
            "clamped moving average window"
        );
    }

    let profile = SizeRatioProfile::from_series(series);
    let mut diagnostics = Vec::new();

    let moving_average = run_model(&MovingAverageForecaster::new(window)?, series, &profile)?;

    let trend = match TrendForecaster::new(trend_config.clone())
        .and_then(|model| run_model(&model, series, &profile))
    {
        Ok(result) => Some(result),
        Err(err) => {
            warn!(
                institution = series.institution(),
                error = %err,
                "trend forecast unavailable, reporting moving average only"
            );
            diagnostics.push(Diagnostic::TrendUnavailable {
                reason: err.to_string(),
            });
            None
        }
    };

    for result in trend.iter().chain(std::iter::once(&moving_average)) {
        let residual = result.drift();
        if residual != 0 {
            debug!(method = %result.method(), residual, "allocation drift");
            diagnostics.push(Diagnostic::AllocationDrift {
                method: result.method(),
                residual,
            });
        }
    }

    Ok(ForecastReport {
        institution: series.institution().to_string(),
        window,
        target_date: series.next_period_date()?,
        profile,
        trend,
        moving_average,
        diagnostics,
    })
}

/// Forecast with `model` and allocate the total into the model's report slot
fn run_model<M: ForecastModel>(
    model: &M,
    series: &Series,
    profile: &SizeRatioProfile,
) -> Result<ForecastResult> {
    let total = model.forecast(series)?;
    debug!(model = model.name(), total, "aggregate forecast");
    Ok(ForecastResult::allocate(model.method(), total, profile))
}

/// Build the series for `institution` from `store` and forecast it
pub fn forecast_institution(
    store: &SeriesStore,
    institution: &str,
    config: &ForecastConfig,
) -> Result<ForecastReport> {
    let series = store.series(institution)?;
    forecast_with(&series, config.forecast.sma_window, &config.trend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Observation;
    use pretty_assertions::assert_eq;

    fn series(totals: &[f64]) -> Series {
        let observations = totals
            .iter()
            .enumerate()
            .map(|(i, &total)| {
                Observation::new(
                    NaiveDate::from_ymd_opt(2020 + i as i32, 1, 1).unwrap(),
                    total,
                    BTreeMap::from([(7, total * 0.25), (8, total * 0.75)]),
                )
            })
            .collect();
        Series::new("Retail Store A", observations).unwrap()
    }

    #[test]
    fn test_report_has_both_methods() {
        let report = forecast(&series(&[100.0, 120.0, 140.0]), 2).unwrap();

        assert_eq!(report.moving_average().total(), 130);
        assert_eq!(report.moving_average().per_size(), &BTreeMap::from([(7, 32), (8, 98)]));
        assert!(report.trend().is_some());
        assert_eq!(report.results().count(), 2);
        assert_eq!(report.target_date(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
    }

    #[test]
    fn test_results_fill_model_slots() {
        let report = forecast(&series(&[100.0, 120.0, 140.0]), 2).unwrap();

        let sma = MovingAverageForecaster::new(2).unwrap();
        let trend = TrendForecaster::default();
        assert_eq!(report.moving_average().method(), sma.method());
        assert_eq!(report.trend().map(|r| r.method()), Some(trend.method()));
        assert_eq!(
            report.result(trend.method()).map(|r| r.total()),
            Some(trend.forecast(&series(&[100.0, 120.0, 140.0])).unwrap())
        );
    }

    #[test]
    fn test_window_clamped() {
        let report = forecast(&series(&[100.0, 200.0]), 5).unwrap();
        assert_eq!(report.window(), 2);
        assert_eq!(report.moving_average().total(), 150);

        let report = forecast(&series(&[100.0, 200.0]), 0).unwrap();
        assert_eq!(report.window(), 1);
        assert_eq!(report.moving_average().total(), 200);
    }

    #[test]
    fn test_allocation_drift() {
        let even_thirds = BTreeMap::from([(6, 10.0), (7, 10.0), (8, 10.0)]);
        let observations = vec![
            Observation::new(
                NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                30.0,
                even_thirds.clone(),
            ),
            Observation::new(
                NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
                30.0,
                even_thirds,
            ),
        ];
        let flat = Series::new("Outlet Store", observations).unwrap();

        let report = forecast(&flat, 2).unwrap();

        assert_eq!(report.moving_average().total(), 30);
        assert_eq!(report.moving_average().drift(), 0);

        let result = ForecastResult::allocate(
            ForecastMethod::MovingAverage,
            100,
            report.profile(),
        );
        assert_eq!(result.drift(), -1);
    }

    #[test]
    fn test_highlight_max() {
        let row = ReportRow {
            size: 8,
            trend: Some(10),
            moving_average: 9,
        };
        assert_eq!(row.highlight_max(), Some(ForecastMethod::Trend));

        let tie = ReportRow {
            trend: Some(9),
            ..row
        };
        assert_eq!(tie.highlight_max(), None);

        let absent = ReportRow { trend: None, ..row };
        assert_eq!(absent.highlight_max(), Some(ForecastMethod::MovingAverage));
    }

    #[test]
    fn test_diagnostic_display() {
        let drift = Diagnostic::AllocationDrift {
            method: ForecastMethod::Trend,
            residual: -1,
        };
        assert_eq!(
            drift.to_string(),
            "Trend size forecasts sum to -1 pairs versus the total"
        );
    }
}
