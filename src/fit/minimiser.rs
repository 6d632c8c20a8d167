//! The minimization engine.
//!
//! A [`Minimiser`] owns the bounds, the convergence threshold and the objective
//! kind for one fit, plus the injected backend that does the numeric work. It
//! validates every request before the backend sees it and runs the outer
//! convergence loop: full minimizations are repeated until the objective stops
//! changing by more than the threshold between two of them.

use crate::domain::{Bound, FitResult, MAX_PARAMS, ObjectiveKind, ParamIndex};
use crate::error::{FitError, FitResultT};
use crate::fit::backend::{MinimizeRequest, Minimizer, MinimizerOutput};
use crate::fit::convergence::is_converged;
use crate::models::Objective;

/// Default cap on outer loop iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Check that `bounds` can describe a 1 to 3 parameter fit.
pub fn validate_bounds(bounds: &[Bound]) -> FitResultT<()> {
    if bounds.is_empty() || bounds.len() > MAX_PARAMS {
        return Err(FitError::Configuration(format!(
            "Expected 1 to {MAX_PARAMS} bounds, got {}.",
            bounds.len()
        )));
    }
    for (i, b) in bounds.iter().enumerate() {
        if b.lower.is_nan() || b.upper.is_nan() {
            return Err(FitError::Configuration(format!("Bound {i} contains NaN.")));
        }
        if b.lower > b.upper {
            return Err(FitError::Configuration(format!(
                "Bound {i} is inverted: lower={} > upper={}.",
                b.lower, b.upper
            )));
        }
    }
    Ok(())
}

fn validate_threshold(threshold: f64) -> FitResultT<()> {
    if !(threshold.is_finite() && threshold >= 0.0) {
        return Err(FitError::Configuration(format!(
            "Threshold must be finite and >= 0 (got {threshold})."
        )));
    }
    Ok(())
}

/// Minimization engine over an injected backend `M`.
#[derive(Debug, Clone)]
pub struct Minimiser<M> {
    backend: M,
    bounds: Vec<Bound>,
    threshold: f64,
    kind: ObjectiveKind,
    max_iterations: usize,
}

impl<M: Minimizer> Minimiser<M> {
    /// Build an engine. Bounds and threshold are validated here, before any
    /// numeric work can happen.
    pub fn new(backend: M, bounds: Vec<Bound>, threshold: f64, kind: ObjectiveKind) -> FitResultT<Self> {
        validate_bounds(&bounds)?;
        validate_threshold(threshold)?;
        Ok(Self {
            backend,
            bounds,
            threshold,
            kind,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        })
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> FitResultT<Self> {
        if max_iterations == 0 {
            return Err(FitError::Configuration("max_iterations must be >= 1.".to_string()));
        }
        self.max_iterations = max_iterations;
        Ok(self)
    }

    pub fn bounds(&self) -> &[Bound] {
        &self.bounds
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn kind(&self) -> ObjectiveKind {
        self.kind
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    fn check_params(&self, params: &[f64]) -> FitResultT<()> {
        if params.len() != self.bounds.len() {
            return Err(FitError::Configuration(format!(
                "Got {} parameters but {} bounds.",
                params.len(),
                self.bounds.len()
            )));
        }
        if let Some(i) = params.iter().position(|v| !v.is_finite()) {
            return Err(FitError::Configuration(format!(
                "Parameter {i} is not finite ({}).",
                params[i]
            )));
        }
        Ok(())
    }

    fn run_backend(
        &self,
        objective: &dyn Objective,
        params: &[f64],
        fixed: Option<ParamIndex>,
    ) -> FitResultT<MinimizerOutput> {
        self.check_params(params)?;
        if let Some(index) = fixed {
            if index.position() >= params.len() {
                return Err(FitError::Configuration(format!(
                    "Cannot fix parameter {} of a {}-parameter vector.",
                    index.position(),
                    params.len()
                )));
            }
        }
        self.backend.minimize(&MinimizeRequest {
            objective,
            start: params,
            bounds: &self.bounds,
            fixed,
            error_level: self.kind.error_level(),
        })
    }

    /// One backend minimization from `params`.
    pub fn minimize(&self, objective: &dyn Objective, params: &[f64]) -> FitResultT<MinimizerOutput> {
        self.run_backend(objective, params, None)
    }

    /// One backend minimization with parameter `index` held at `params[index]`.
    pub fn minimize_with_fixed(
        &self,
        index: ParamIndex,
        objective: &dyn Objective,
        params: &[f64],
    ) -> FitResultT<MinimizerOutput> {
        self.run_backend(objective, params, Some(index))
    }

    /// Minimize repeatedly from `initial` until the objective settles.
    pub fn fit(&self, objective: &dyn Objective, initial: &[f64]) -> FitResultT<FitResult> {
        self.fit_from(objective, initial, None)
    }

    /// Like [`Minimiser::fit`], but resuming with a known previous objective value.
    ///
    /// If `objective(initial)` is already within the threshold of `previous`, no
    /// minimization is performed.
    pub fn fit_from(
        &self,
        objective: &dyn Objective,
        initial: &[f64],
        previous: Option<f64>,
    ) -> FitResultT<FitResult> {
        self.check_params(initial)?;

        let mut current = initial.to_vec();
        let mut value = objective.value(&current);
        let mut previous = previous;
        let mut errors = None;
        let mut minimizations = 0usize;

        while !is_converged(previous, value, self.threshold) {
            if minimizations >= self.max_iterations {
                let last_change = previous.map_or(f64::INFINITY, |p| (p - value).abs());
                tracing::warn!(minimizations, last_change, "fit loop hit its iteration cap");
                return Err(FitError::ConvergenceFailure {
                    iterations: minimizations,
                    last_change,
                });
            }

            let out = self.minimize(objective, &current)?;
            minimizations += 1;
            previous = Some(value);
            value = out.value;
            current = out.params;
            errors = out.errors;
            tracing::debug!(
                iteration = minimizations,
                objective = value,
                change = previous.map(|p| (p - value).abs()),
                params = ?current,
                "minimization step"
            );
        }

        tracing::info!(minimizations, objective = value, params = ?current, "fit converged");
        Ok(FitResult {
            params: current,
            objective: value,
            errors,
            minimizations,
        })
    }
}
