//! # Size Math
//!
//! Numerical building blocks for forecasting short annual sales series.
//! This crate provides a rolling moving-average window, a ridge-penalised
//! piecewise-linear trend fit, a small dense linear solver and the rounding
//! rules used when turning forecasts into whole pairs of shoes.

use thiserror::Error;

pub mod linalg;
pub mod moving_averages;
pub mod rounding;
pub mod trend;

/// Errors that can occur in forecasting calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Singular matrix: {0}")]
    SingularMatrix(String),
}

/// Result type for forecasting math operations
pub type Result<T> = std::result::Result<T, MathError>;
