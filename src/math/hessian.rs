//! Curvature-based standard errors.
//!
//! Near a minimum the objective is approximately quadratic, and for an objective
//! with error level `up` the parameter covariance is
//!
//! ```text
//! V = 2 · up · H⁻¹
//! ```
//!
//! where `H` is the Hessian of the objective. We estimate `H` by central finite
//! differences over the free parameters only and invert it with nalgebra.

use nalgebra::DMatrix;

use crate::models::Objective;

/// Relative finite-difference step.
const REL_STEP: f64 = 1e-4;

/// Central-difference Hessian of `objective` at `params`, restricted to `free`.
pub fn finite_diff_hessian<O: Objective + ?Sized>(
    objective: &O,
    params: &[f64],
    free: &[usize],
) -> DMatrix<f64> {
    let n = free.len();
    let steps: Vec<f64> = free.iter().map(|&i| REL_STEP * params[i].abs().max(1.0)).collect();
    let f0 = objective.value(params);
    let mut x = params.to_vec();
    let mut eval = |shifts: &[(usize, f64)]| -> f64 {
        for &(i, d) in shifts {
            x[i] = params[i] + d;
        }
        let v = objective.value(&x);
        for &(i, _) in shifts {
            x[i] = params[i];
        }
        v
    };

    let mut h = DMatrix::<f64>::zeros(n, n);
    for a in 0..n {
        let (i, hi) = (free[a], steps[a]);
        h[(a, a)] = (eval(&[(i, hi)]) - 2.0 * f0 + eval(&[(i, -hi)])) / (hi * hi);
        for b in 0..a {
            let (j, hj) = (free[b], steps[b]);
            let v = (eval(&[(i, hi), (j, hj)]) - eval(&[(i, hi), (j, -hj)]) - eval(&[(i, -hi), (j, hj)])
                + eval(&[(i, -hi), (j, -hj)]))
                / (4.0 * hi * hj);
            h[(a, b)] = v;
            h[(b, a)] = v;
        }
    }
    h
}

/// Standard errors for every parameter (zero for parameters not in `free`).
///
/// Returns `None` when the Hessian is non-finite, singular, or its inverse has a
/// non-positive diagonal (not a minimum).
pub fn curvature_errors<O: Objective + ?Sized>(
    objective: &O,
    params: &[f64],
    free: &[usize],
    up: f64,
) -> Option<Vec<f64>> {
    let mut errors = vec![0.0; params.len()];
    if free.is_empty() {
        return Some(errors);
    }

    let hessian = finite_diff_hessian(objective, params, free);
    if hessian.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let inverse = hessian.try_inverse()?;
    for (a, &i) in free.iter().enumerate() {
        let variance = 2.0 * up * inverse[(a, a)];
        if !(variance.is_finite() && variance > 0.0) {
            return None;
        }
        errors[i] = variance.sqrt();
    }
    Some(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_hessian_is_exact() {
        // f = 2x² + 3xy + 5y²  →  H = [[4, 3], [3, 10]]
        let f = |p: &[f64]| 2.0 * p[0] * p[0] + 3.0 * p[0] * p[1] + 5.0 * p[1] * p[1];
        let h = finite_diff_hessian(&f, &[0.3, -0.2], &[0, 1]);
        assert!((h[(0, 0)] - 4.0).abs() < 1e-5, "h00 = {}", h[(0, 0)]);
        assert!((h[(0, 1)] - 3.0).abs() < 1e-5, "h01 = {}", h[(0, 1)]);
        assert!((h[(1, 1)] - 10.0).abs() < 1e-5, "h11 = {}", h[(1, 1)]);
    }

    #[test]
    fn chi_squared_errors_match_sigma() {
        // χ² = ((a - 1)/0.2)² + ((b + 2)/0.5)²  →  errors 0.2 and 0.5 at up = 1.
        let chi = |p: &[f64]| ((p[0] - 1.0) / 0.2).powi(2) + ((p[1] + 2.0) / 0.5).powi(2);
        let errors = curvature_errors(&chi, &[1.0, -2.0], &[0, 1], 1.0).unwrap();
        assert!((errors[0] - 0.2).abs() < 1e-6);
        assert!((errors[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn fixed_parameters_get_zero_error() {
        let nll = |p: &[f64]| 0.5 * (p[0] / 0.1).powi(2) + 0.5 * (p[1] / 0.3).powi(2);
        let errors = curvature_errors(&nll, &[0.0, 0.0], &[1], 0.5).unwrap();
        assert_eq!(errors[0], 0.0);
        assert!((errors[1] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn maximum_yields_no_errors() {
        let hill = |p: &[f64]| -p[0] * p[0];
        assert!(curvature_errors(&hill, &[0.0], &[0], 0.5).is_none());
    }
}
