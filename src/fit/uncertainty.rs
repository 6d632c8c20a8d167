//! Parameter error estimation.
//!
//! Two estimators are provided:
//!
//! - grid-scan: sample the objective along one parameter (others held at the best
//!   fit) and read off where it rises by the error level
//! - profile: walk one parameter away from the best fit, re-minimizing the others
//!   at every step, until the objective has risen by the engine's threshold
//!
//! The profile estimate accounts for correlations; the grid scan does not.

use rayon::prelude::*;

use crate::domain::{Bound, ObjectiveCurve, ParamIndex, ProfileStep};
use crate::error::{FitError, FitResultT};
use crate::fit::backend::Minimizer;
use crate::fit::convergence::is_exceeded;
use crate::fit::minimiser::Minimiser;
use crate::models::Objective;

/// Distance from `best_value` to the curve sample closest to `objective_at_min + level`.
///
/// Ties go to the first sample. Samples with a non-finite parameter or objective
/// value are ignored.
pub fn grid_error(level: f64, curve: &ObjectiveCurve, objective_at_min: f64, best_value: f64) -> FitResultT<f64> {
    let target = objective_at_min + level;
    let mut closest: Option<(f64, f64)> = None;
    for &(param, value) in curve.samples() {
        if !(param.is_finite() && value.is_finite()) {
            continue;
        }
        let distance = (value - target).abs();
        if closest.is_none_or(|(d, _)| distance < d) {
            closest = Some((distance, param));
        }
    }
    closest
        .map(|(_, param)| (param - best_value).abs())
        .ok_or(FitError::EmptyCurve)
}

/// `points` evenly spaced values from `lo` to `hi` (inclusive).
pub fn lin_space(lo: f64, hi: f64, points: usize) -> FitResultT<Vec<f64>> {
    if !(lo.is_finite() && hi.is_finite() && hi > lo) {
        return Err(FitError::Configuration(format!(
            "Invalid scan range: lo={lo}, hi={hi} (must be finite and hi>lo)."
        )));
    }
    if points < 2 {
        return Err(FitError::Configuration("Scan points must be >= 2.".to_string()));
    }
    let step = (hi - lo) / (points as f64 - 1.0);
    Ok((0..points).map(|k| lo + step * k as f64).collect())
}

/// Scan range around `best_value`: `best_value ± span·|best_value|`, clipped to `bound`.
///
/// A zero best value falls back to a half-width of `span`.
pub fn scan_window(best_value: f64, span: f64, bound: &Bound) -> (f64, f64) {
    let mut half = span * best_value.abs();
    if !(half.is_finite() && half > 0.0) {
        half = span;
    }
    let lo = (best_value - half).max(bound.lower);
    let hi = (best_value + half).min(bound.upper);
    (lo, hi)
}

/// Objective sampled along parameter `index` with the others held at `best`.
///
/// Grid points are evaluated in parallel; samples come back in grid order.
pub fn scan_curve(
    objective: &dyn Objective,
    best: &[f64],
    index: ParamIndex,
    lo: f64,
    hi: f64,
    points: usize,
) -> FitResultT<ObjectiveCurve> {
    let i = index.position();
    if i >= best.len() {
        return Err(FitError::Configuration(format!(
            "Cannot scan parameter {i} of a {}-parameter vector.",
            best.len()
        )));
    }
    let grid = lin_space(lo, hi, points)?;
    let samples: Vec<(f64, f64)> = grid
        .par_iter()
        .map(|&x| {
            let mut params = best.to_vec();
            params[i] = x;
            (x, objective.value(&params))
        })
        .collect();
    Ok(ObjectiveCurve::from_samples(samples))
}

/// Profile error of parameter `index` around the best fit `best`.
///
/// On step `k` the parameter moves a further `base_step * k` in the step's
/// direction and the remaining parameters are re-minimized with it fixed. The walk
/// stops once the re-minimized objective differs from `objective(best)` by at least
/// the engine's threshold; use an engine whose threshold is the error level.
pub fn profile_error<M: Minimizer>(
    engine: &Minimiser<M>,
    index: ParamIndex,
    objective: &dyn Objective,
    best: &[f64],
    step: &ProfileStep,
) -> FitResultT<f64> {
    if !(step.base_step.is_finite() && step.base_step > 0.0) {
        return Err(FitError::Configuration(format!(
            "Profile step must be finite and > 0 (got {}).",
            step.base_step
        )));
    }
    if step.max_steps == 0 {
        return Err(FitError::Configuration("Profile max_steps must be >= 1.".to_string()));
    }
    let i = index.position();
    let bound = match engine.bounds().get(i) {
        Some(b) if i < best.len() => *b,
        _ => {
            return Err(FitError::Configuration(format!(
                "Cannot profile parameter {i} of a {}-parameter vector.",
                best.len()
            )));
        }
    };

    let reference = objective.value(best);
    let mut params = best.to_vec();
    let mut last_change = 0.0;
    for k in 1..=step.max_steps {
        params[i] += step.direction.sign() * step.base_step * k as f64;
        if !bound.contains(params[i]) {
            return Err(FitError::BoundReached {
                index: i,
                value: params[i],
            });
        }

        let out = engine.minimize_with_fixed(index, objective, &params)?;
        last_change = (out.value - reference).abs();
        params = out.params;
        if is_exceeded(Some(reference), out.value, engine.threshold()) {
            let error = (params[i] - best[i]).abs();
            tracing::debug!(index = i, steps = k, error, "profile walk finished");
            return Ok(error);
        }
    }

    Err(FitError::ConvergenceFailure {
        iterations: step.max_steps,
        last_change,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, ObjectiveKind};
    use crate::fit::backend::NelderMeadBackend;

    fn nll_engine(bounds: Vec<Bound>) -> Minimiser<NelderMeadBackend> {
        Minimiser::new(NelderMeadBackend::default(), bounds, 0.5, ObjectiveKind::Nll).unwrap()
    }

    #[test]
    fn grid_error_takes_first_of_tied_samples() {
        let curve = ObjectiveCurve::from_samples(vec![(0.0, 5.0), (1.0, 3.0), (2.0, 3.0)]);
        let err = grid_error(2.0, &curve, 1.0, 0.0).unwrap();
        assert_eq!(err, 1.0);
        let err = grid_error(2.0, &curve, 1.0, 1.5).unwrap();
        assert_eq!(err, 0.5);
    }

    #[test]
    fn grid_error_skips_non_finite_samples() {
        let curve = ObjectiveCurve::from_samples(vec![(0.0, f64::NAN), (1.0, f64::INFINITY), (4.0, 9.0)]);
        assert_eq!(grid_error(0.5, &curve, 0.0, 3.0).unwrap(), 1.0);
    }

    #[test]
    fn empty_curve_is_an_error() {
        let empty = ObjectiveCurve::default();
        assert_eq!(grid_error(0.5, &empty, 0.0, 0.0), Err(FitError::EmptyCurve));
        let all_nan = ObjectiveCurve::from_samples(vec![(0.0, f64::NAN), (f64::NAN, 1.0)]);
        assert_eq!(grid_error(0.5, &all_nan, 0.0, 0.0), Err(FitError::EmptyCurve));
    }

    #[test]
    fn scan_keeps_grid_order_and_holds_other_parameters() {
        let f = |p: &[f64]| 10.0 * p[0] + p[1];
        let curve = scan_curve(&f, &[1.0, 7.0], ParamIndex::Second, 0.0, 4.0, 5).unwrap();
        let expected: Vec<(f64, f64)> = (0..5).map(|k| (k as f64, 10.0 + k as f64)).collect();
        assert_eq!(curve.samples(), expected.as_slice());
        assert!(scan_curve(&f, &[1.0, 7.0], ParamIndex::Third, 0.0, 1.0, 5).is_err());
        assert!(scan_curve(&f, &[1.0, 7.0], ParamIndex::First, 1.0, 1.0, 5).is_err());
    }

    #[test]
    fn scan_grid_error_of_parabola() {
        // χ² = ((a - 2)/0.1)²: Δχ² = 1 at a = 2 ± 0.1.
        let chi = |p: &[f64]| ((p[0] - 2.0) / 0.1).powi(2);
        let (lo, hi) = scan_window(2.0, 0.25, &Bound::unbounded());
        assert_eq!((lo, hi), (1.5, 2.5));
        let curve = scan_curve(&chi, &[2.0], ParamIndex::First, lo, hi, 201).unwrap();
        let err = grid_error(1.0, &curve, 0.0, 2.0).unwrap();
        assert!((err - 0.1).abs() < 1e-9, "err = {err}");
    }

    #[test]
    fn scan_window_is_clipped_to_bounds() {
        let (lo, hi) = scan_window(0.5, 1.0, &Bound::new(0.2, 0.8));
        assert_eq!((lo, hi), (0.2, 0.8));
        let (lo, hi) = scan_window(0.0, 0.5, &Bound::unbounded());
        assert_eq!((lo, hi), (-0.5, 0.5));
    }

    #[test]
    fn profile_error_matches_fisher_information() {
        // Gaussian NLL with known width: error on the mean is sigma / sqrt(n).
        let xs = [0.9, 1.1, 1.0, 0.95, 1.05, 1.02, 0.98, 1.0];
        let sigma = 0.1;
        let nll = move |p: &[f64]| xs.iter().map(|x| (x - p[0]).powi(2) / (2.0 * sigma * sigma)).sum::<f64>();
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        let expected = sigma / (xs.len() as f64).sqrt();

        let engine = nll_engine(vec![Bound::new(0.0, 2.0)]);
        let step = ProfileStep {
            base_step: 1e-6,
            ..ProfileStep::default()
        };
        let err = profile_error(&engine, ParamIndex::First, &nll, &[mean], &step).unwrap();
        assert!(err >= expected - 1e-12, "err = {err}, expected {expected}");
        assert!((err - expected) / expected < 0.02, "err = {err}, expected {expected}");
    }

    #[test]
    fn profile_error_accounts_for_correlation() {
        // NLL = ½ xᵀ V⁻¹ x with σa = 0.2, σb = 0.3, ρ = 0.5. The profile error of `a`
        // is its marginal σ, larger than the conditional 0.2·sqrt(1 - ρ²).
        let (saa, sab, sbb) = (0.04, 0.03, 0.09);
        let det = saa * sbb - sab * sab;
        let nll = move |p: &[f64]| {
            let (a, b) = (p[0] - 1.0, p[1] + 1.0);
            0.5 * (sbb * a * a - 2.0 * sab * a * b + saa * b * b) / det
        };
        let engine = nll_engine(vec![Bound::unbounded(), Bound::unbounded()]);
        let step = ProfileStep {
            base_step: 1e-4,
            ..ProfileStep::default()
        };
        let err = profile_error(&engine, ParamIndex::First, &nll, &[1.0, -1.0], &step).unwrap();
        assert!((err - 0.2).abs() < 0.01, "err = {err}");
    }

    #[test]
    fn profile_walk_reports_bound_and_can_go_down() {
        let nll = |p: &[f64]| 0.5 * ((p[0] - 1.0) / 0.05).powi(2);
        let engine = nll_engine(vec![Bound::new(0.0, 1.02)]);
        let up = ProfileStep {
            base_step: 1e-4,
            ..ProfileStep::default()
        };
        match profile_error(&engine, ParamIndex::First, &nll, &[1.0], &up) {
            Err(FitError::BoundReached { index, value }) => {
                assert_eq!(index, 0);
                assert!(value > 1.02);
            }
            other => panic!("expected BoundReached, got {other:?}"),
        }

        let down = ProfileStep {
            direction: Direction::Down,
            ..up
        };
        let err = profile_error(&engine, ParamIndex::First, &nll, &[1.0], &down).unwrap();
        assert!(err >= 0.05 && err < 0.055, "err = {err}");
    }

    #[test]
    fn profile_walk_is_capped() {
        let nll = |p: &[f64]| 0.5 * (p[0] / 10.0).powi(2);
        let engine = nll_engine(vec![Bound::unbounded()]);
        let step = ProfileStep {
            base_step: 1e-6,
            max_steps: 5,
            direction: Direction::Up,
        };
        assert!(matches!(
            profile_error(&engine, ParamIndex::First, &nll, &[0.0], &step),
            Err(FitError::ConvergenceFailure { iterations: 5, .. })
        ));
        let bad = ProfileStep { base_step: 0.0, ..step };
        assert!(matches!(
            profile_error(&engine, ParamIndex::First, &nll, &[0.0], &bad),
            Err(FitError::Configuration(_))
        ));
    }
}
