//! Dense linear algebra for the small normal-equation systems of the trend fit

use crate::{MathError, Result};

const PIVOT_EPSILON: f64 = 1e-12;

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
///
/// `a` must be square with one row per entry of `b`.
pub fn solve(a: &[Vec<f64>], b: &[f64]) -> Result<Vec<f64>> {
    let n = b.len();
    if n == 0 {
        return Err(MathError::InvalidInput("Empty linear system".to_string()));
    }
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(format!(
            "Linear system must be {}x{} to match the right-hand side",
            n, n
        )));
    }

    // Augmented matrix [a | b]
    let mut m: Vec<Vec<f64>> = a
        .iter()
        .zip(b.iter())
        .map(|(row, &rhs)| {
            let mut augmented = row.clone();
            augmented.push(rhs);
            augmented
        })
        .collect();

    let scale = m
        .iter()
        .flat_map(|row| row[..n].iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if !scale.is_finite() || scale == 0.0 {
        return Err(MathError::SingularMatrix(
            "Coefficient matrix is zero or non-finite".to_string(),
        ));
    }

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))
            .unwrap_or(col);

        if m[pivot_row][col].abs() < PIVOT_EPSILON * scale {
            return Err(MathError::SingularMatrix(format!(
                "No usable pivot in column {}",
                col
            )));
        }
        m.swap(col, pivot_row);

        for row in col + 1..n {
            let factor = m[row][col] / m[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| m[row][k] * x[k]).sum();
        x[row] = (m[row][n] - tail) / m[row][row];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(MathError::CalculationError(
            "Linear solve produced non-finite values".to_string(),
        ));
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_two_by_two() {
        // 2x + y = 5, x + 3y = 10 -> x = 1, y = 3
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve(&a, &[5.0, 10.0]).unwrap();

        assert!((x[0] - 1.0).abs() < 1e-10);
        assert!((x[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_solve_needs_pivoting() {
        let a = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let x = solve(&a, &[4.0, 7.0]).unwrap();

        assert!((x[0] - 7.0).abs() < 1e-10);
        assert!((x[1] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_singular_system() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(matches!(
            solve(&a, &[1.0, 2.0]),
            Err(MathError::SingularMatrix(_))
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let a = vec![vec![1.0, 2.0]];
        assert!(matches!(
            solve(&a, &[1.0, 2.0]),
            Err(MathError::InvalidInput(_))
        ));
    }
}
