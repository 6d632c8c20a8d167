//! Numeric minimizer backends.
//!
//! The engine never talks to a solver directly: it hands a [`MinimizeRequest`] to
//! whatever [`Minimizer`] it was constructed with. The default backend wraps
//! argmin's Nelder–Mead simplex solver.
//!
//! Box constraints are handled by solving in an internal, unbounded coordinate `u`
//! and mapping each parameter back through a smooth transform:
//!
//! - both ends finite: `x = lo + (hi - lo) · sigmoid(u)`
//! - lower end only:   `x = lo + exp(u)`
//! - upper end only:   `x = hi - exp(u)`
//! - unbounded:        `x = u`
//!
//! Fixed parameters (and parameters with `lo == hi`) are removed from the problem
//! entirely, so the simplex only spans the free dimensions.

use argmin::core::{CostFunction, Executor, State};
use argmin::solver::neldermead::NelderMead;

use crate::domain::{BackendOptions, Bound, ParamIndex};
use crate::error::{FitError, FitResultT};
use crate::math::curvature_errors;
use crate::models::Objective;

/// Fraction of a finite interval kept between a start value and either end.
///
/// Starting exactly on a bound would put the sigmoid in its flat tail.
const START_MARGIN: f64 = 1e-3;

const EPS: f64 = 1e-12;

/// One minimization problem.
#[derive(Clone, Copy)]
pub struct MinimizeRequest<'a> {
    pub objective: &'a dyn Objective,
    pub start: &'a [f64],
    pub bounds: &'a [Bound],
    /// Parameter held at its `start` value.
    pub fixed: Option<ParamIndex>,
    /// Objective rise per standard deviation, used for curvature errors.
    pub error_level: f64,
}

/// Local optimum reported by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimizerOutput {
    pub params: Vec<f64>,
    pub value: f64,
    pub errors: Option<Vec<f64>>,
}

/// A local optimizer with box constraints and optional parameter fixing.
///
/// Requests reaching a backend have already been validated by the engine: bounds
/// match the parameter count, `lower <= upper` everywhere, and a fixed index lies
/// inside the vector.
pub trait Minimizer {
    fn minimize(&self, request: &MinimizeRequest<'_>) -> FitResultT<MinimizerOutput>;
}

impl<M: Minimizer + ?Sized> Minimizer for &M {
    fn minimize(&self, request: &MinimizeRequest<'_>) -> FitResultT<MinimizerOutput> {
        (**self).minimize(request)
    }
}

#[derive(Debug, Clone, Copy)]
enum BoundTransform {
    Identity,
    Finite { lo: f64, hi: f64 },
    Lower { lo: f64 },
    Upper { hi: f64 },
}

impl BoundTransform {
    fn for_bound(bound: &Bound) -> Self {
        match (bound.lower.is_finite(), bound.upper.is_finite()) {
            (false, false) => BoundTransform::Identity,
            (true, false) => BoundTransform::Lower { lo: bound.lower },
            (false, true) => BoundTransform::Upper { hi: bound.upper },
            (true, true) => BoundTransform::Finite {
                lo: bound.lower,
                hi: bound.upper,
            },
        }
    }

    fn forward(self, u: f64) -> f64 {
        match self {
            BoundTransform::Identity => u,
            BoundTransform::Finite { lo, hi } => lo + (hi - lo) * sigmoid(u),
            BoundTransform::Lower { lo } => lo + u.exp(),
            BoundTransform::Upper { hi } => hi - u.exp(),
        }
    }

    /// Map a start value into `u`, pulling it off the edges of the box first.
    fn inverse(self, x: f64) -> f64 {
        match self {
            BoundTransform::Identity => x,
            BoundTransform::Finite { lo, hi } => {
                let t = ((x - lo) / (hi - lo)).clamp(START_MARGIN, 1.0 - START_MARGIN);
                (t / (1.0 - t)).ln()
            }
            BoundTransform::Lower { lo } => (x - lo).max(EPS).ln(),
            BoundTransform::Upper { hi } => (hi - x).max(EPS).ln(),
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

/// The free-parameter sub-problem seen by argmin.
#[derive(Clone)]
struct ReducedProblem<'a> {
    objective: &'a dyn Objective,
    template: Vec<f64>,
    free: Vec<usize>,
    transforms: Vec<BoundTransform>,
}

impl ReducedProblem<'_> {
    fn to_params(&self, u: &[f64]) -> Vec<f64> {
        let mut x = self.template.clone();
        for ((&i, &ui), t) in self.free.iter().zip(u).zip(&self.transforms) {
            x[i] = t.forward(ui);
        }
        x
    }

    fn to_internal(&self) -> Vec<f64> {
        self.free
            .iter()
            .zip(&self.transforms)
            .map(|(&i, t)| t.inverse(self.template[i]))
            .collect()
    }
}

impl CostFunction for ReducedProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, u: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let value = self.objective.value(&self.to_params(u));
        // NaN would break the simplex ordering.
        Ok(if value.is_nan() { f64::INFINITY } else { value })
    }
}

/// Nelder–Mead simplex backend (argmin).
#[derive(Debug, Clone, Default)]
pub struct NelderMeadBackend {
    options: BackendOptions,
}

impl NelderMeadBackend {
    pub fn new(options: BackendOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BackendOptions {
        &self.options
    }

    fn initial_simplex(&self, u0: &[f64]) -> Vec<Vec<f64>> {
        let mut simplex = Vec::with_capacity(u0.len() + 1);
        simplex.push(u0.to_vec());
        for i in 0..u0.len() {
            let mut vertex = u0.to_vec();
            vertex[i] += self.options.initial_step.max(0.1 * u0[i].abs());
            simplex.push(vertex);
        }
        simplex
    }
}

impl Minimizer for NelderMeadBackend {
    fn minimize(&self, request: &MinimizeRequest<'_>) -> FitResultT<MinimizerOutput> {
        let fixed = request.fixed.map(ParamIndex::position);
        let mut template = request.start.to_vec();
        let mut free = Vec::with_capacity(template.len());
        for (i, bound) in request.bounds.iter().enumerate() {
            if bound.lower == bound.upper {
                template[i] = bound.lower;
            } else if Some(i) != fixed {
                free.push(i);
            }
        }

        if free.is_empty() {
            let value = request.objective.value(&template);
            return Ok(MinimizerOutput {
                errors: Some(vec![0.0; template.len()]),
                params: template,
                value,
            });
        }

        let problem = ReducedProblem {
            objective: request.objective,
            transforms: free.iter().map(|&i| BoundTransform::for_bound(&request.bounds[i])).collect(),
            free,
            template,
        };
        let simplex = self.initial_simplex(&problem.to_internal());

        let solver: NelderMead<Vec<f64>, f64> = NelderMead::new(simplex)
            .with_sd_tolerance(self.options.sd_tolerance)
            .map_err(|e| FitError::Minimizer(e.to_string()))?;
        let result = Executor::new(problem.clone(), solver)
            .configure(|state| state.max_iters(self.options.max_iters))
            .run()
            .map_err(|e| FitError::Minimizer(e.to_string()))?;

        let state = &result.state;
        tracing::debug!(
            iterations = state.get_iter(),
            status = ?state.get_termination_status(),
            cost = state.get_best_cost(),
            "Nelder-Mead finished"
        );
        let best_u = state
            .get_best_param()
            .ok_or_else(|| FitError::Minimizer("Solver returned no parameters.".to_string()))?;
        let params = problem.to_params(best_u);
        let value = request.objective.value(&params);
        if !value.is_finite() {
            return Err(FitError::Minimizer(format!(
                "Objective is not finite at the reported optimum ({value})."
            )));
        }
        let errors = curvature_errors(request.objective, &params, &problem.free, request.error_level);

        Ok(MinimizerOutput { params, value, errors })
    }
}
