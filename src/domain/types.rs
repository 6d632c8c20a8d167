//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON
//! - printed by the report module without further conversion

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Ordered parameter values for one fit, e.g. `[fraction, τ1, τ2]` or `[m, c]`.
pub type ParameterVector = Vec<f64>;

/// Largest parameter vector the engine accepts.
pub const MAX_PARAMS: usize = 3;

/// Which goodness-of-fit statistic an objective computes.
///
/// The statistic fixes the error level `up`: the rise in objective value that
/// corresponds to a one-standard-deviation move of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveKind {
    Nll,
    ChiSquared,
}

impl ObjectiveKind {
    pub fn error_level(self) -> f64 {
        match self {
            ObjectiveKind::Nll => 0.5,
            ObjectiveKind::ChiSquared => 1.0,
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ObjectiveKind::Nll => "Negative Log Likelihood",
            ObjectiveKind::ChiSquared => "Chi-Squared",
        }
    }
}

/// A parameter slot within a [`ParameterVector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamIndex {
    First,
    Second,
    Third,
}

impl ParamIndex {
    pub const ALL: [ParamIndex; MAX_PARAMS] = [ParamIndex::First, ParamIndex::Second, ParamIndex::Third];

    pub fn position(self) -> usize {
        match self {
            ParamIndex::First => 0,
            ParamIndex::Second => 1,
            ParamIndex::Third => 2,
        }
    }

    /// Slots for a vector of `len` parameters (at most three).
    pub fn slots(len: usize) -> &'static [ParamIndex] {
        &Self::ALL[..len.min(MAX_PARAMS)]
    }
}

/// Box constraint for one parameter.
///
/// Either end may be infinite. `lower == upper` pins the parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub lower: f64,
    pub upper: f64,
}

impl Bound {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn unbounded() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn is_finite(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite()
    }
}

/// Best fit produced by one convergence loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub params: ParameterVector,
    /// Objective value at `params`.
    pub objective: f64,
    /// Per-parameter standard errors from the backend's curvature estimate.
    pub errors: Option<Vec<f64>>,
    /// Number of backend minimizations the loop performed.
    pub minimizations: usize,
}

/// Objective values sampled along one parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectiveCurve {
    samples: Vec<(f64, f64)>,
}

impl ObjectiveCurve {
    /// Build from `(parameter value, objective value)` pairs, order preserved.
    pub fn from_samples(samples: Vec<(f64, f64)>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[(f64, f64)] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Direction in which a profile walk moves the fixed parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// Step policy for profile error estimation.
///
/// On walk step `k` the fixed parameter moves by a further `base_step * k`, so the
/// total displacement after `k` steps is `base_step * k(k+1)/2`. Steps get coarser
/// as the walk proceeds; the reported error is only as precise as the last step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileStep {
    pub base_step: f64,
    pub max_steps: usize,
    pub direction: Direction,
}

impl Default for ProfileStep {
    fn default() -> Self {
        Self {
            base_step: 1e-6,
            max_steps: 100_000,
            direction: Direction::Up,
        }
    }
}

/// Tuning for the Nelder–Mead backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackendOptions {
    /// Cap on simplex iterations per minimization.
    pub max_iters: u64,
    /// Standard deviation of simplex costs below which a minimization stops.
    pub sd_tolerance: f64,
    /// Initial simplex edge length in the internal (transformed) parameter space.
    pub initial_step: f64,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            max_iters: 5_000,
            sd_tolerance: 1e-10,
            initial_step: 0.5,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub data_path: PathBuf,
    /// Convergence threshold of the outer fit loop.
    pub threshold: f64,
    /// Cap on outer fit loop iterations.
    pub max_iterations: usize,
    pub profile: ProfileStep,
    /// Skip profile errors entirely (they are the slow part of a 3-parameter fit).
    pub skip_profile: bool,
    /// Number of samples in each grid scan.
    pub scan_points: usize,
    /// Half-width of each grid scan as a multiple of the best-fit value.
    pub scan_span: f64,
    pub backend: BackendOptions,
    pub export: Option<PathBuf>,
}

/// Three-column `(x, y, error)` data for a straight-line fit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineData {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub y_err: Vec<f64>,
}

impl LineData {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Decay events: time and emission angle per event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecayEvents {
    pub times: Vec<f64>,
    pub angles: Vec<f64>,
}

impl DecayEvents {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Final estimate for one named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEstimate {
    pub name: String,
    pub value: f64,
    pub grid_error: Option<f64>,
    pub curvature_error: Option<f64>,
    pub profile_error: Option<f64>,
}

/// Everything reported for one fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub title: String,
    pub kind: ObjectiveKind,
    /// Number of events or data points in the fit.
    pub n_records: usize,
    pub objective_min: f64,
    /// Degrees of freedom (`n_records - n_params`), when positive.
    pub dof: Option<usize>,
    pub estimates: Vec<ParameterEstimate>,
    pub minimizations: usize,
}

impl FitSummary {
    /// Objective minimum per degree of freedom (meaningful for chi-squared).
    pub fn reduced_objective(&self) -> Option<f64> {
        self.dof.map(|dof| self.objective_min / dof as f64)
    }
}

/// JSON export schema for one fit run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub data_path: PathBuf,
    pub threshold: f64,
    pub profile: Option<ProfileStep>,
    pub summary: FitSummary,
}
