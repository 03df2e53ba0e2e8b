//! Per-institution sales series

use crate::error::{ForecastError, Result};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Largest quantity that still rounds to a whole-pair `i64`
pub const MAX_QUANTITY: f64 = i64::MAX as f64;

/// One historical record for an institution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    /// Stated total sales; assumed, not checked, to equal the size sum
    pub total: f64,
    /// Quantity sold per shoe size
    pub per_size: BTreeMap<u32, f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, total: f64, per_size: BTreeMap<u32, f64>) -> Self {
        Self {
            date,
            total,
            per_size,
        }
    }

    /// Sum of the per-size quantities
    pub fn size_sum(&self) -> f64 {
        self.per_size.values().sum()
    }

    /// Stated total minus the size sum; zero for a consistent row
    pub fn size_sum_mismatch(&self) -> f64 {
        self.total - self.size_sum()
    }
}

/// Chronologically ordered observations for one institution.
///
/// A `Series` always holds at least two observations with strictly
/// ascending dates and non-negative finite quantities below
/// [`MAX_QUANTITY`], so any mean of its totals converts to whole pairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    institution: String,
    observations: Vec<Observation>,
}

impl Series {
    /// Build a series from observations already sorted by date
    pub fn new(institution: impl Into<String>, observations: Vec<Observation>) -> Result<Self> {
        let institution = institution.into();
        if observations.len() < 2 {
            return Err(ForecastError::InsufficientData {
                institution,
                found: observations.len(),
            });
        }

        if let Some(pair) = observations.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(ForecastError::DataError(format!(
                "Observations for '{}' are not strictly ascending: {} then {}",
                institution, pair[0].date, pair[1].date
            )));
        }

        let out_of_range = |q: f64| !q.is_finite() || q < 0.0 || q >= MAX_QUANTITY;
        for obs in &observations {
            if out_of_range(obs.total) || obs.per_size.values().any(|&q| out_of_range(q)) {
                return Err(ForecastError::DataError(format!(
                    "Sales for '{}' on {} must be finite, non-negative and below {:e}",
                    institution, obs.date, MAX_QUANTITY
                )));
            }
        }

        Ok(Self {
            institution,
            observations,
        })
    }

    pub fn institution(&self) -> &str {
        &self.institution
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Total sales in date order
    pub fn totals(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.total).collect()
    }

    /// Observation dates in ascending order
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.observations[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.observations[self.observations.len() - 1].date
    }

    /// Date of the period being forecast: one calendar year after the last
    /// observation, with 29 February falling back to the 28th.
    pub fn next_period_date(&self) -> Result<NaiveDate> {
        self.last_date()
            .checked_add_months(Months::new(12))
            .ok_or_else(|| {
                ForecastError::DataError(format!(
                    "Cannot step one year past {}",
                    self.last_date()
                ))
            })
    }

    /// Every size id seen in any observation
    pub fn sizes(&self) -> Vec<u32> {
        let mut sizes: Vec<u32> = self
            .observations
            .iter()
            .flat_map(|o| o.per_size.keys().copied())
            .collect();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(y: i32, m: u32, d: u32, total: f64) -> Observation {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        Observation::new(date, total, BTreeMap::from([(8, total)]))
    }

    #[test]
    fn test_series_requires_two_points() {
        let err = Series::new("Outlet", vec![obs(2021, 1, 1, 10.0)]).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientData { found: 1, .. }
        ));
    }

    #[test]
    fn test_series_rejects_unordered_dates() {
        let result = Series::new(
            "Outlet",
            vec![obs(2022, 1, 1, 10.0), obs(2021, 1, 1, 12.0)],
        );
        assert!(matches!(result, Err(ForecastError::DataError(_))));
    }

    #[test]
    fn test_series_rejects_negative_sales() {
        let result = Series::new("Outlet", vec![obs(2021, 1, 1, 10.0), obs(2022, 1, 1, -1.0)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_series_rejects_totals_beyond_whole_pairs() {
        let result = Series::new("Outlet", vec![obs(2021, 1, 1, 1e19), obs(2022, 1, 1, 1e19)]);
        assert!(matches!(result, Err(ForecastError::DataError(_))));

        let largest = Series::new("Outlet", vec![obs(2021, 1, 1, 1e18), obs(2022, 1, 1, 9e18)]);
        assert!(largest.is_ok());
    }

    #[test]
    fn test_next_period_date_clamps_leap_day() {
        let series = Series::new(
            "Outlet",
            vec![obs(2023, 3, 1, 10.0), obs(2024, 2, 29, 12.0)],
        )
        .unwrap();

        assert_eq!(
            series.next_period_date().unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
        assert_eq!(series.totals(), vec![10.0, 12.0]);
        assert_eq!(series.sizes(), vec![8]);
    }

    #[test]
    fn test_size_sum_mismatch() {
        let date = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let o = Observation::new(date, 100.0, BTreeMap::from([(8, 20.0), (9, 70.0)]));
        assert_eq!(o.size_sum(), 90.0);
        assert_eq!(o.size_sum_mismatch(), 10.0);
    }
}
