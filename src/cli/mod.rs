//! Command-line parsing for the decay fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting/math code. Default bounds and starting points mirror
//! the classic exercise setups for each fit.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::Direction;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "decay-fit",
    version,
    about = "Iterative minimisation fits with grid-scan and profile errors"
)]
pub struct Cli {
    /// Log level for diagnostics on stderr (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a straight line `y = m x + c` to `(x, y, error)` data by chi-squared.
    Line(LineArgs),
    /// Fit a single exponential lifetime to decay times by likelihood.
    Lifetime(LifetimeArgs),
    /// Fit the two-component time/angle decay density to `(t, θ)` events.
    Decay(DecayArgs),
    /// Write a synthetic dataset.
    #[command(subcommand)]
    Generate(GenerateKind),
}

/// Options shared by every fit.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Whitespace-separated data file.
    #[arg(short = 'd', long, value_name = "FILE")]
    pub data: PathBuf,

    /// Stop refitting once the objective changes by no more than this.
    #[arg(long, default_value_t = 1e-6)]
    pub threshold: f64,

    /// Maximum number of full minimizations in the fit loop.
    #[arg(long, default_value_t = 100)]
    pub max_iterations: usize,

    /// Base step of the profile walk (step k moves a further base*k).
    #[arg(long, default_value_t = 1e-6)]
    pub profile_step: f64,

    /// Maximum number of profile walk steps.
    #[arg(long, default_value_t = 100_000)]
    pub profile_max_steps: usize,

    /// Initial direction of the profile walk.
    #[arg(long, value_enum, default_value_t = Direction::Up)]
    pub profile_direction: Direction,

    /// Skip profile errors.
    #[arg(long)]
    pub no_profile: bool,

    /// Points per grid scan.
    #[arg(long, default_value_t = 200)]
    pub scan_points: usize,

    /// Grid scan half-width as a multiple of the best-fit value.
    #[arg(long, default_value_t = 1.0)]
    pub scan_span: f64,

    /// Maximum simplex iterations per minimization.
    #[arg(long, default_value_t = 5_000)]
    pub simplex_iters: u64,

    /// Simplex cost standard deviation at which a minimization stops.
    #[arg(long, default_value_t = 1e-10)]
    pub simplex_tolerance: f64,

    /// Initial simplex edge in internal coordinates.
    #[arg(long, default_value_t = 0.5)]
    pub simplex_step: f64,

    /// Export the fit report to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct LineArgs {
    #[command(flatten)]
    pub fit: FitArgs,

    /// Gradient range.
    #[arg(long, num_args = 2, value_names = ["LO", "HI"], default_values_t = [-1.0, 0.0], allow_negative_numbers = true)]
    pub m_range: Vec<f64>,

    /// Intercept range.
    #[arg(long, num_args = 2, value_names = ["LO", "HI"], default_values_t = [0.0, 1.0], allow_negative_numbers = true)]
    pub c_range: Vec<f64>,

    /// Starting gradient.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub m_start: f64,

    /// Starting intercept.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub c_start: f64,
}

#[derive(Debug, Args, Clone)]
pub struct LifetimeArgs {
    #[command(flatten)]
    pub fit: FitArgs,

    /// Lifetime range.
    #[arg(long, num_args = 2, value_names = ["LO", "HI"], default_values_t = [1.0, 3.0])]
    pub tau_range: Vec<f64>,

    /// Starting lifetime.
    #[arg(long, default_value_t = 2.0)]
    pub tau_start: f64,
}

/// Observation window of the decay density.
#[derive(Debug, Args, Clone, Copy)]
pub struct WindowArgs {
    #[arg(long, default_value_t = 0.0)]
    pub t_min: f64,
    #[arg(long, default_value_t = 10.0)]
    pub t_max: f64,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub theta_min: f64,
    #[arg(long, default_value_t = 2.0 * std::f64::consts::PI, allow_negative_numbers = true)]
    pub theta_max: f64,
}

#[derive(Debug, Args, Clone)]
pub struct DecayArgs {
    #[command(flatten)]
    pub fit: FitArgs,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Range of the first component's fraction.
    #[arg(long, num_args = 2, value_names = ["LO", "HI"], default_values_t = [0.0, 1.0])]
    pub fraction_range: Vec<f64>,

    /// Range of the first lifetime.
    #[arg(long, num_args = 2, value_names = ["LO", "HI"], default_values_t = [0.0, 5.0])]
    pub tau1_range: Vec<f64>,

    /// Range of the second lifetime.
    #[arg(long, num_args = 2, value_names = ["LO", "HI"], default_values_t = [0.0, 5.0])]
    pub tau2_range: Vec<f64>,

    /// Starting `[fraction, tau1, tau2]`.
    #[arg(long, num_args = 3, value_names = ["F", "TAU1", "TAU2"], default_values_t = [0.5, 1.0, 2.0])]
    pub start: Vec<f64>,
}

/// Synthetic dataset kinds.
#[derive(Debug, Subcommand)]
pub enum GenerateKind {
    /// Two-component `(t, θ)` decay events (accept-reject).
    Decay(GenerateDecayArgs),
    /// Noisy straight-line `(x, y, error)` points.
    Line(GenerateLineArgs),
    /// Exponential decay times.
    Lifetime(GenerateLifetimeArgs),
}

#[derive(Debug, Args, Clone)]
pub struct GenerateDecayArgs {
    /// Output file.
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: PathBuf,

    #[arg(short = 'n', long, default_value_t = 10_000)]
    pub events: usize,

    #[arg(long, default_value_t = 1.0)]
    pub tau1: f64,

    #[arg(long, default_value_t = 2.0)]
    pub tau2: f64,

    /// Fraction of the first component.
    #[arg(long, default_value_t = 0.5)]
    pub fraction: f64,

    #[command(flatten)]
    pub window: WindowArgs,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Debug, Args, Clone)]
pub struct GenerateLineArgs {
    /// Output file.
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: PathBuf,

    #[arg(short = 'n', long, default_value_t = 50)]
    pub points: usize,

    #[arg(long, default_value_t = -0.5, allow_negative_numbers = true)]
    pub m: f64,

    #[arg(long, default_value_t = 0.3, allow_negative_numbers = true)]
    pub c: f64,

    /// Gaussian noise on y (also written as the error column).
    #[arg(long, default_value_t = 0.05)]
    pub sigma: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub x_min: f64,

    #[arg(long, default_value_t = 2.0, allow_negative_numbers = true)]
    pub x_max: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Debug, Args, Clone)]
pub struct GenerateLifetimeArgs {
    /// Output file.
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: PathBuf,

    #[arg(short = 'n', long, default_value_t = 1_000)]
    pub events: usize,

    #[arg(long, default_value_t = 2.2)]
    pub tau: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn line_defaults() {
        let cli = Cli::parse_from(["decay-fit", "line", "--data", "points.txt"]);
        assert_eq!(cli.log_level, tracing::Level::WARN);
        let Command::Line(args) = cli.command else {
            panic!("expected line subcommand");
        };
        assert_eq!(args.m_range, vec![-1.0, 0.0]);
        assert_eq!(args.c_range, vec![0.0, 1.0]);
        assert_eq!(args.fit.scan_points, 200);
        assert_eq!(args.fit.threshold, 1e-6);
        assert_eq!(args.fit.profile_direction, Direction::Up);
        assert!(!args.fit.no_profile);
    }

    #[test]
    fn decay_ranges_and_global_log_level() {
        let cli = Cli::parse_from([
            "decay-fit",
            "decay",
            "-d",
            "events.txt",
            "--tau2-range",
            "0.5",
            "4",
            "--no-profile",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
        let Command::Decay(args) = cli.command else {
            panic!("expected decay subcommand");
        };
        assert_eq!(args.tau2_range, vec![0.5, 4.0]);
        assert_eq!(args.start, vec![0.5, 1.0, 2.0]);
        assert!(args.fit.no_profile);
        assert_eq!(args.window.t_max, 10.0);
    }

    #[test]
    fn generate_subcommands_parse() {
        let cli = Cli::parse_from(["decay-fit", "generate", "line", "-o", "out.txt", "--m", "-0.25"]);
        let Command::Generate(GenerateKind::Line(args)) = cli.command else {
            panic!("expected generate line");
        };
        assert_eq!(args.m, -0.25);
        assert_eq!(args.output, PathBuf::from("out.txt"));
    }
}
