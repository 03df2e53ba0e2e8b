//! Moving average calculations
//!
//! The simple moving average is the fallback estimator for annual sales:
//! it cannot fail numerically once it has seen a full window.

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Rolling window over the most recent yearly totals
#[derive(Debug, Clone)]
pub struct YearWindow {
    window: usize,
    totals: VecDeque<f64>,
    running_sum: f64,
}

impl YearWindow {
    /// Window covering the last `window` periods
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(MathError::InvalidInput(
                "Moving average window must cover at least one period".to_string(),
            ));
        }

        Ok(Self {
            window,
            totals: VecDeque::with_capacity(window),
            running_sum: 0.0,
        })
    }

    /// Push the next period's total, evicting the oldest once full
    pub fn push(&mut self, total: f64) -> Result<()> {
        if !total.is_finite() {
            return Err(MathError::InvalidInput(format!(
                "Cannot average non-finite total {}",
                total
            )));
        }

        self.totals.push_back(total);
        self.running_sum += total;
        while self.totals.len() > self.window {
            match self.totals.pop_front() {
                Some(evicted) => self.running_sum -= evicted,
                None => break,
            }
        }

        Ok(())
    }

    /// Mean of the window; errors until the window is full
    pub fn mean(&self) -> Result<f64> {
        match self.totals.len() {
            n if n < self.window => Err(MathError::InsufficientData(format!(
                "Window of {} periods has only {}",
                self.window, n
            ))),
            _ => Ok(self.running_sum / self.window as f64),
        }
    }
}

/// Mean of the last `window` values of `values`.
///
/// Only the trailing slice goes through the window, so the running sum never
/// carries cancellation error from evicted totals.
pub fn trailing_mean(values: &[f64], window: usize) -> Result<f64> {
    let mut rolling = YearWindow::new(window)?;
    let start = values.len().checked_sub(window).ok_or_else(|| {
        MathError::InsufficientData(format!(
            "Need {} values for a trailing mean, have {}",
            window,
            values.len()
        ))
    })?;

    for &total in &values[start..] {
        rolling.push(total)?;
    }

    rolling.mean()
}
