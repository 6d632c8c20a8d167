//! Shared fit pipeline used by every fit subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! fit loop -> grid scans -> profile walks -> summary
//!
//! The subcommand handlers then only differ in how they load data and which
//! objective, bounds and starting point they pass in.

use crate::domain::{Bound, FitConfig, FitSummary, ObjectiveKind, ParamIndex, ParameterEstimate, ProfileStep};
use crate::error::{AppError, FitError, FitResultT};
use crate::fit::{Minimiser, Minimizer, NelderMeadBackend, grid_error, profile_error, scan_curve, scan_window};
use crate::models::Objective;

/// What to fit: everything except the objective itself.
#[derive(Debug, Clone)]
pub struct FitProblem {
    pub title: String,
    pub kind: ObjectiveKind,
    pub names: Vec<String>,
    pub bounds: Vec<Bound>,
    pub start: Vec<f64>,
    pub n_records: usize,
}

impl FitProblem {
    pub fn new(
        title: impl Into<String>,
        kind: ObjectiveKind,
        names: &[&str],
        bounds: Vec<Bound>,
        start: Vec<f64>,
        n_records: usize,
    ) -> Self {
        Self {
            title: title.into(),
            kind,
            names: names.iter().map(|n| n.to_string()).collect(),
            bounds,
            start,
            n_records,
        }
    }
}

/// Backend configured from the run's simplex options.
pub fn backend_from_config(config: &FitConfig) -> NelderMeadBackend {
    NelderMeadBackend::new(config.backend)
}

/// Fit `objective`, then estimate grid, curvature and profile errors per parameter.
pub fn run_fit<M: Minimizer>(
    backend: &M,
    problem: &FitProblem,
    objective: &dyn Objective,
    config: &FitConfig,
) -> Result<FitSummary, AppError> {
    if problem.names.len() != problem.start.len() {
        return Err(AppError::new(
            2,
            format!("{} names for {} parameters.", problem.names.len(), problem.start.len()),
        ));
    }

    let engine = Minimiser::new(backend, problem.bounds.clone(), config.threshold, problem.kind)?
        .with_max_iterations(config.max_iterations)?;
    let fit = engine.fit(objective, &problem.start)?;
    tracing::info!(
        title = %problem.title,
        objective = fit.objective,
        minimizations = fit.minimizations,
        "fit finished"
    );

    // Profile walks stop once the objective has risen by the error level.
    let level = problem.kind.error_level();
    let profile_engine = if config.skip_profile {
        None
    } else {
        Some(Minimiser::new(backend, problem.bounds.clone(), level, problem.kind)?)
    };

    let mut estimates = Vec::with_capacity(fit.params.len());
    for (&slot, name) in ParamIndex::slots(fit.params.len()).iter().zip(&problem.names) {
        let i = slot.position();
        let best = fit.params[i];

        let (lo, hi) = scan_window(best, config.scan_span, &problem.bounds[i]);
        let grid = scan_curve(objective, &fit.params, slot, lo, hi, config.scan_points)
            .and_then(|curve| grid_error(level, &curve, fit.objective, best));
        let grid_error = match grid {
            Ok(err) => Some(err),
            Err(e) => {
                tracing::warn!(param = %name, error = %e, "grid-scan error unavailable");
                None
            }
        };

        let profile_error = match &profile_engine {
            Some(eng) => profile_with_retry(eng, slot, objective, &fit.params, &config.profile, name)?,
            None => None,
        };

        estimates.push(ParameterEstimate {
            name: name.clone(),
            value: best,
            grid_error,
            curvature_error: fit.errors.as_ref().and_then(|e| e.get(i).copied()),
            profile_error,
        });
    }

    let dof = match problem.kind {
        ObjectiveKind::ChiSquared => problem.n_records.checked_sub(fit.params.len()).filter(|&d| d > 0),
        ObjectiveKind::Nll => None,
    };

    Ok(FitSummary {
        title: problem.title.clone(),
        kind: problem.kind,
        n_records: problem.n_records,
        objective_min: fit.objective,
        dof,
        estimates,
        minimizations: fit.minimizations,
    })
}

/// Profile error, walking the other way if the first direction hits a bound.
///
/// A walk that fails in both directions (bound or step cap) is reported as
/// `None`; other failures are propagated.
fn profile_with_retry<M: Minimizer>(
    engine: &Minimiser<M>,
    slot: ParamIndex,
    objective: &dyn Objective,
    best: &[f64],
    step: &ProfileStep,
    name: &str,
) -> FitResultT<Option<f64>> {
    let first = match profile_error(engine, slot, objective, best, step) {
        Err(FitError::BoundReached { value, .. }) => {
            tracing::warn!(param = %name, value, direction = ?step.direction, "profile walk hit bound, retrying reversed");
            let reversed = ProfileStep {
                direction: step.direction.reversed(),
                ..*step
            };
            profile_error(engine, slot, objective, best, &reversed)
        }
        other => other,
    };

    match first {
        Ok(err) => Ok(Some(err)),
        Err(e @ (FitError::BoundReached { .. } | FitError::ConvergenceFailure { .. })) => {
            tracing::warn!(param = %name, error = %e, "profile error unavailable");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        DecaySampleConfig, LifetimeSampleConfig, LineSampleConfig, generate_decay_events, generate_lifetimes,
        generate_line_data,
    };
    use crate::domain::{BackendOptions, Direction};
    use crate::models::{DecayNll, DecayWindow, LifetimeNll, LineChiSquared};

    fn config() -> FitConfig {
        FitConfig {
            data_path: "memory".into(),
            threshold: 1e-6,
            max_iterations: 100,
            profile: ProfileStep {
                base_step: 1e-6,
                max_steps: 10_000,
                direction: Direction::Up,
            },
            skip_profile: false,
            scan_points: 200,
            scan_span: 1.0,
            backend: BackendOptions::default(),
            export: None,
        }
    }

    #[test]
    fn straight_line_fit_recovers_parameters() {
        let data = generate_line_data(&LineSampleConfig {
            n_points: 200,
            ..LineSampleConfig::default()
        })
        .unwrap();
        let chi = LineChiSquared::new(&data);
        let problem = FitProblem::new(
            "Straight Line",
            LineChiSquared::KIND,
            &LineChiSquared::NAMES,
            vec![Bound::new(-1.0, 0.0), Bound::new(0.0, 1.0)],
            vec![0.0, 0.0],
            data.len(),
        );
        let cfg = config();
        let summary = run_fit(&backend_from_config(&cfg), &problem, &chi, &cfg).unwrap();

        assert_eq!(summary.dof, Some(198));
        let reduced = summary.reduced_objective().unwrap();
        assert!((reduced - 1.0).abs() < 0.4, "chi2/dof = {reduced}");

        let m = &summary.estimates[0];
        let c = &summary.estimates[1];
        assert_eq!((m.name.as_str(), c.name.as_str()), ("m", "c"));
        let m_err = m.curvature_error.unwrap();
        let c_err = c.curvature_error.unwrap();
        assert!((m.value + 0.5).abs() < 4.0 * m_err, "m = {} ± {m_err}", m.value);
        assert!((c.value - 0.3).abs() < 4.0 * c_err, "c = {} ± {c_err}", c.value);

        // m and c are correlated, so the profile error (others re-minimized) is
        // at least the conditional grid-scan error and matches the curvature error.
        let m_profile = m.profile_error.unwrap();
        let m_grid = m.grid_error.unwrap();
        assert!(m_grid <= m_profile * 1.05, "grid {m_grid} vs profile {m_profile}");
        assert!((m_profile - m_err).abs() < 0.1 * m_err, "profile {m_profile} vs curvature {m_err}");
    }

    #[test]
    fn lifetime_fit_without_profile() {
        let times = generate_lifetimes(&LifetimeSampleConfig {
            n_events: 2_000,
            ..LifetimeSampleConfig::default()
        })
        .unwrap();
        let nll = LifetimeNll::new(&times);
        let problem = FitProblem::new(
            "Lifetime",
            LifetimeNll::KIND,
            &LifetimeNll::NAMES,
            vec![Bound::new(1.0, 3.0)],
            vec![2.0],
            times.len(),
        );
        let cfg = FitConfig {
            skip_profile: true,
            ..config()
        };
        let summary = run_fit(&backend_from_config(&cfg), &problem, &nll, &cfg).unwrap();

        // The exponential MLE is the sample mean, with error tau / sqrt(n).
        let mean = times.iter().sum::<f64>() / times.len() as f64;
        let tau = &summary.estimates[0];
        assert!((tau.value - mean).abs() < 1e-4, "tau = {} vs mean {mean}", tau.value);
        let expected = mean / (times.len() as f64).sqrt();
        let curv = tau.curvature_error.unwrap();
        assert!((curv - expected).abs() < 0.02 * expected, "curvature {curv} vs {expected}");
        // 200 points over [0, 2 tau] resolve the error to about tau / 100.
        let grid = tau.grid_error.unwrap();
        assert!((grid - expected).abs() < mean / 100.0, "grid {grid} vs {expected}");
        assert!(tau.profile_error.is_none());
        assert_eq!(summary.dof, None);
    }

    #[test]
    fn two_component_decay_fit_recovers_generated_parameters() {
        let truth = DecaySampleConfig {
            n_events: 3_000,
            seed: 11,
            ..DecaySampleConfig::default()
        };
        let events = generate_decay_events(&truth).unwrap();
        let nll = DecayNll::new(&events, DecayWindow::default());
        let problem = FitProblem::new(
            "Two-Component Decay",
            DecayNll::KIND,
            &DecayNll::NAMES,
            vec![Bound::new(0.0, 1.0), Bound::new(0.0, 5.0), Bound::new(0.0, 5.0)],
            vec![0.5, 1.0, 2.0],
            events.len(),
        );
        let cfg = FitConfig {
            skip_profile: true,
            ..config()
        };
        let summary = run_fit(&backend_from_config(&cfg), &problem, &nll, &cfg).unwrap();

        let expected = [truth.fraction, truth.tau1, truth.tau2];
        for (estimate, truth) in summary.estimates.iter().zip(expected) {
            let err = estimate.curvature_error.unwrap();
            assert!(err > 0.0 && err < 0.5, "{}: error {err}", estimate.name);
            assert!(
                (estimate.value - truth).abs() < 5.0 * err,
                "{} = {} ± {err}, generated with {truth}",
                estimate.name,
                estimate.value
            );
        }
    }

    #[test]
    fn bound_hit_retries_in_the_other_direction() {
        // Best fit sits just below the upper bound, closer than one error.
        let nll = |p: &[f64]| 0.5 * ((p[0] - 2.95) / 0.1).powi(2);
        let problem = FitProblem::new("Edge", ObjectiveKind::Nll, &["tau"], vec![Bound::new(1.0, 3.0)], vec![2.0], 1);
        let cfg = FitConfig {
            profile: ProfileStep {
                base_step: 1e-4,
                ..config().profile
            },
            ..config()
        };
        let summary = run_fit(&backend_from_config(&cfg), &problem, &nll, &cfg).unwrap();
        let err = summary.estimates[0].profile_error.unwrap();
        assert!((err - 0.1).abs() < 0.01, "profile error {err}");
    }

    #[test]
    fn configuration_errors_surface_with_exit_code_2() {
        let f = |p: &[f64]| p[0] * p[0];
        let problem = FitProblem::new("Bad", ObjectiveKind::Nll, &["x"], vec![Bound::new(1.0, -1.0)], vec![0.0], 1);
        let cfg = config();
        let err = run_fit(&backend_from_config(&cfg), &problem, &f, &cfg).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
