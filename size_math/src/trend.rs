//! Damped piecewise-linear trend
//!
//! The trend is `k * t + m` plus one hinge `delta_j * max(t - s_j, 0)` per
//! changepoint `s_j`. Fitting is maximum a posteriori under Gaussian priors:
//! each parameter with prior scale `tau` contributes a ridge penalty
//! `(noise_scale / tau)^2` to the normal equations. A tiny changepoint scale
//! pins the hinges near zero and leaves an almost straight line, which is
//! what a two to five point annual series can support.

use crate::linalg;
use crate::rounding::round_half_even;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Prior scales of the trend parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPrior {
    /// Scale of the slope change at each changepoint
    pub changepoint_scale: f64,
    /// Scale of the base slope and offset
    pub base_scale: f64,
    /// Assumed observation noise on the normalised series
    pub noise_scale: f64,
}

impl Default for TrendPrior {
    fn default() -> Self {
        Self {
            changepoint_scale: 0.001,
            base_scale: 5.0,
            noise_scale: 0.5,
        }
    }
}

impl TrendPrior {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("changepoint_scale", self.changepoint_scale),
            ("base_scale", self.base_scale),
            ("noise_scale", self.noise_scale),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MathError::InvalidInput(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    fn penalty(&self, scale: f64) -> f64 {
        (self.noise_scale / scale).powi(2)
    }
}

/// Indexes of the observations that become changepoints.
///
/// Candidates are spread evenly over the first `range` fraction of the
/// `n` observations, never including the first one. Fewer than `requested`
/// are returned when the history is too short to hold them.
pub fn changepoint_indices(n: usize, requested: usize, range: f64) -> Vec<usize> {
    let history = ((n as f64) * range.clamp(0.0, 1.0)).floor() as usize;
    let count = requested.min(history.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }

    let last = (history - 1) as f64;
    let mut indices: Vec<usize> = (1..=count)
        .map(|i| round_half_even(last * i as f64 / count as f64) as usize)
        .collect();
    indices.dedup();
    indices
}

/// Unfitted piecewise-linear trend with fixed changepoints
#[derive(Debug, Clone)]
pub struct PiecewiseLinearTrend {
    changepoints: Vec<f64>,
    prior: TrendPrior,
}

/// Fitted trend parameters
#[derive(Debug, Clone, PartialEq)]
pub struct FittedTrend {
    /// Slope before the first changepoint
    pub base_slope: f64,
    /// Value at `t = 0`
    pub offset: f64,
    /// Slope change at each changepoint
    pub deltas: Vec<f64>,
    /// Changepoint locations
    pub changepoints: Vec<f64>,
}

impl PiecewiseLinearTrend {
    /// Create a trend with changepoints at the given (ascending) locations
    pub fn new(changepoints: Vec<f64>, prior: TrendPrior) -> Result<Self> {
        prior.validate()?;
        if changepoints.iter().any(|s| !s.is_finite()) {
            return Err(MathError::InvalidInput(
                "Changepoints must be finite".to_string(),
            ));
        }
        if changepoints.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MathError::InvalidInput(
                "Changepoints must be strictly ascending".to_string(),
            ));
        }

        Ok(Self {
            changepoints,
            prior,
        })
    }

    /// A straight line with no changepoints
    pub fn linear(prior: TrendPrior) -> Result<Self> {
        Self::new(Vec::new(), prior)
    }

    /// Number of changepoints
    pub fn changepoint_count(&self) -> usize {
        self.changepoints.len()
    }

    fn features(&self, t: f64) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.changepoints.len() + 2);
        row.push(t);
        row.push(1.0);
        row.extend(self.changepoints.iter().map(|&s| (t - s).max(0.0)));
        row
    }

    /// Fit the trend to `(t, y)` pairs
    pub fn fit(&self, t: &[f64], y: &[f64]) -> Result<FittedTrend> {
        if t.len() != y.len() {
            return Err(MathError::InvalidInput(format!(
                "Time ({}) and value ({}) lengths differ",
                t.len(),
                y.len()
            )));
        }
        if t.len() < 2 {
            return Err(MathError::InsufficientData(
                "Not enough data for a trend fit. Need at least 2 points.".to_string(),
            ));
        }
        if t.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Trend inputs must be finite".to_string(),
            ));
        }

        let dim = self.changepoints.len() + 2;
        let mut normal = vec![vec![0.0; dim]; dim];
        let mut rhs = vec![0.0; dim];

        for (&ti, &yi) in t.iter().zip(y.iter()) {
            let row = self.features(ti);
            for i in 0..dim {
                rhs[i] += row[i] * yi;
                for j in 0..dim {
                    normal[i][j] += row[i] * row[j];
                }
            }
        }

        let base_penalty = self.prior.penalty(self.prior.base_scale);
        let changepoint_penalty = self.prior.penalty(self.prior.changepoint_scale);
        for (i, row) in normal.iter_mut().enumerate() {
            row[i] += if i < 2 { base_penalty } else { changepoint_penalty };
        }

        let params = linalg::solve(&normal, &rhs)?;

        Ok(FittedTrend {
            base_slope: params[0],
            offset: params[1],
            deltas: params[2..].to_vec(),
            changepoints: self.changepoints.clone(),
        })
    }
}

impl FittedTrend {
    /// Trend value at `t`
    pub fn predict(&self, t: f64) -> f64 {
        let hinges: f64 = self
            .changepoints
            .iter()
            .zip(self.deltas.iter())
            .map(|(&s, &delta)| delta * (t - s).max(0.0))
            .sum();
        self.base_slope * t + self.offset + hinges
    }

    /// Slope of the trend at `t`
    pub fn slope_at(&self, t: f64) -> f64 {
        self.base_slope
            + self
                .changepoints
                .iter()
                .zip(self.deltas.iter())
                .filter(|(&s, _)| t > s)
                .map(|(_, &delta)| delta)
                .sum::<f64>()
    }

    /// Coefficient of determination on the given points
    pub fn r_squared(&self, t: &[f64], y: &[f64]) -> Result<f64> {
        if t.len() != y.len() || y.len() < 2 {
            return Err(MathError::InsufficientData(
                "Not enough data to calculate R-squared. Need at least 2 points.".to_string(),
            ));
        }

        let y_mean = y.iter().sum::<f64>() / y.len() as f64;
        let mut ss_total = 0.0;
        let mut ss_residual = 0.0;
        for (&ti, &yi) in t.iter().zip(y.iter()) {
            ss_total += (yi - y_mean).powi(2);
            ss_residual += (yi - self.predict(ti)).powi(2);
        }

        if ss_total.abs() < 1e-10 {
            return Err(MathError::CalculationError(
                "Cannot calculate R-squared: total sum of squares is too small".to_string(),
            ));
        }

        Ok(1.0 - ss_residual / ss_total)
    }
}
