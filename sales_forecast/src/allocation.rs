//! Size-mix ratios and per-size allocation of aggregate forecasts

use crate::error::{ForecastError, Result};
use crate::series::Series;
use serde::{Deserialize, Serialize};
use size_math::rounding::{max_allocation_drift, round_half_even};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Historical share of total sales per size.
///
/// Each ratio is the mean over observations of `quantity / total`.
/// Observations with a zero total say nothing about the mix and are skipped;
/// a size never seen next to a positive total gets ratio zero. Ratios are
/// not renormalised and need not sum to exactly one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SizeRatioProfile {
    ratios: BTreeMap<u32, f64>,
}

impl SizeRatioProfile {
    /// Wrap explicit ratios
    pub fn new(ratios: BTreeMap<u32, f64>) -> Result<Self> {
        if let Some((size, ratio)) = ratios.iter().find(|(_, r)| !r.is_finite() || **r < 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Ratio for size {} must be non-negative and finite, got {}",
                size, ratio
            )));
        }
        Ok(Self { ratios })
    }

    /// Average the per-observation size mix of a series
    pub fn from_series(series: &Series) -> Self {
        let ratios = series
            .sizes()
            .into_iter()
            .map(|size| {
                let shares: Vec<f64> = series
                    .observations()
                    .iter()
                    .filter(|obs| obs.total > 0.0)
                    .filter_map(|obs| obs.per_size.get(&size).map(|q| q / obs.total))
                    .collect();
                let ratio = if shares.is_empty() {
                    0.0
                } else {
                    shares.iter().mean()
                };
                (size, ratio)
            })
            .collect();

        Self { ratios }
    }

    pub fn ratio(&self, size: u32) -> Option<f64> {
        self.ratios.get(&size).copied()
    }

    pub fn sizes(&self) -> Vec<u32> {
        self.ratios.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }

    /// Sum of all ratios; one for a self-consistent history
    pub fn total_ratio(&self) -> f64 {
        self.ratios.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.ratios.iter().map(|(&size, &ratio)| (size, ratio))
    }
}

/// Splits an aggregate forecast across sizes
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeAllocator;

impl SizeAllocator {
    /// `round_half_even(ratio * total)` for every size in the profile.
    ///
    /// The parts are rounded independently and not corrected afterwards, so
    /// their sum can miss `total`; see [`SizeAllocator::drift`].
    pub fn allocate(&self, total: i64, profile: &SizeRatioProfile) -> BTreeMap<u32, i64> {
        profile
            .iter()
            .map(|(size, ratio)| (size, round_half_even(ratio * total as f64) as i64))
            .collect()
    }

    /// Sum of the allocation minus the total it was allocated from
    pub fn drift(total: i64, allocation: &BTreeMap<u32, i64>) -> i64 {
        allocation
            .values()
            .fold(0i64, |acc, &pairs| acc.saturating_add(pairs))
            .saturating_sub(total)
    }

    /// Worst-case drift for a profile whose ratios sum to one
    pub fn drift_bound(profile: &SizeRatioProfile) -> i64 {
        max_allocation_drift(profile.len())
    }
}
