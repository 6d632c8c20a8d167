//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - loads a dataset (or generates one)
//! - runs the fit pipeline
//! - prints the report and writes optional exports

use clap::Parser;

use crate::cli::{
    Command, DecayArgs, FitArgs, GenerateDecayArgs, GenerateKind, GenerateLifetimeArgs, GenerateLineArgs,
    LifetimeArgs, LineArgs, WindowArgs,
};
use crate::domain::{BackendOptions, Bound, FitConfig, FitSummary, ProfileStep};
use crate::error::AppError;
use crate::models::{DecayNll, DecayWindow, LifetimeNll, LineChiSquared};

pub mod pipeline;

use pipeline::FitProblem;

/// Entry point for the `decay-fit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Line(args) => handle_line(args),
        Command::Lifetime(args) => handle_lifetime(args),
        Command::Decay(args) => handle_decay(args),
        Command::Generate(kind) => handle_generate(kind),
    }
}

fn handle_line(args: LineArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args.fit);
    let data = crate::io::read_line_data(&config.data_path)?;
    let problem = FitProblem::new(
        "Straight Line",
        LineChiSquared::KIND,
        &LineChiSquared::NAMES,
        vec![bound_from_range("m", &args.m_range)?, bound_from_range("c", &args.c_range)?],
        vec![args.m_start, args.c_start],
        data.len(),
    );
    let summary = run_problem(&problem, &LineChiSquared::new(&data), &config)?;
    finish(&summary, &config)
}

fn handle_lifetime(args: LifetimeArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args.fit);
    let times = crate::io::read_lifetimes(&config.data_path)?;
    let problem = FitProblem::new(
        "Lifetime",
        LifetimeNll::KIND,
        &LifetimeNll::NAMES,
        vec![bound_from_range("tau", &args.tau_range)?],
        vec![args.tau_start],
        times.len(),
    );
    let summary = run_problem(&problem, &LifetimeNll::new(&times), &config)?;
    finish(&summary, &config)
}

fn handle_decay(args: DecayArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args.fit);
    let window = window_from_args(&args.window);
    window.validate()?;
    let events = crate::io::read_decay_events(&config.data_path)?;
    if let Some(i) = (0..events.len()).find(|&i| !window.contains(events.times[i], events.angles[i])) {
        return Err(AppError::new(
            2,
            format!(
                "Record {}: event (t={}, theta={}) lies outside the decay window.",
                i + 1,
                events.times[i],
                events.angles[i]
            ),
        ));
    }
    let problem = FitProblem::new(
        "Two-Component Decay",
        DecayNll::KIND,
        &DecayNll::NAMES,
        vec![
            bound_from_range("fraction", &args.fraction_range)?,
            bound_from_range("tau1", &args.tau1_range)?,
            bound_from_range("tau2", &args.tau2_range)?,
        ],
        args.start.clone(),
        events.len(),
    );
    let summary = run_problem(&problem, &DecayNll::new(&events, window), &config)?;
    finish(&summary, &config)
}

fn run_problem(
    problem: &FitProblem,
    objective: &dyn crate::models::Objective,
    config: &FitConfig,
) -> Result<FitSummary, AppError> {
    let backend = pipeline::backend_from_config(config);
    pipeline::run_fit(&backend, problem, objective, config)
}

fn finish(summary: &FitSummary, config: &FitConfig) -> Result<(), AppError> {
    println!("{}", crate::report::format_fit_summary(summary));
    if let Some(path) = &config.export {
        crate::io::write_fit_report_json(path, summary, config)?;
    }
    Ok(())
}

fn handle_generate(kind: GenerateKind) -> Result<(), AppError> {
    match kind {
        GenerateKind::Decay(args) => generate_decay(args),
        GenerateKind::Line(args) => generate_line(args),
        GenerateKind::Lifetime(args) => generate_lifetime(args),
    }
}

fn generate_decay(args: GenerateDecayArgs) -> Result<(), AppError> {
    let events = crate::data::generate_decay_events(&crate::data::DecaySampleConfig {
        n_events: args.events,
        tau1: args.tau1,
        tau2: args.tau2,
        fraction: args.fraction,
        window: window_from_args(&args.window),
        seed: args.seed,
    })?;
    crate::io::write_decay_events(&args.output, &events)?;
    println!("Wrote {} decay events to {}", events.len(), args.output.display());
    Ok(())
}

fn generate_line(args: GenerateLineArgs) -> Result<(), AppError> {
    let data = crate::data::generate_line_data(&crate::data::LineSampleConfig {
        n_points: args.points,
        m: args.m,
        c: args.c,
        sigma: args.sigma,
        x_min: args.x_min,
        x_max: args.x_max,
        seed: args.seed,
    })?;
    crate::io::write_line_data(&args.output, &data)?;
    println!("Wrote {} points to {}", data.len(), args.output.display());
    Ok(())
}

fn generate_lifetime(args: GenerateLifetimeArgs) -> Result<(), AppError> {
    let times = crate::data::generate_lifetimes(&crate::data::LifetimeSampleConfig {
        n_events: args.events,
        tau: args.tau,
        seed: args.seed,
    })?;
    crate::io::write_lifetimes(&args.output, &times)?;
    println!("Wrote {} decay times to {}", times.len(), args.output.display());
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        data_path: args.data.clone(),
        threshold: args.threshold,
        max_iterations: args.max_iterations,
        profile: ProfileStep {
            base_step: args.profile_step,
            max_steps: args.profile_max_steps,
            direction: args.profile_direction,
        },
        skip_profile: args.no_profile,
        scan_points: args.scan_points,
        scan_span: args.scan_span,
        backend: BackendOptions {
            max_iters: args.simplex_iters,
            sd_tolerance: args.simplex_tolerance,
            initial_step: args.simplex_step,
        },
        export: args.export.clone(),
    }
}

fn window_from_args(args: &WindowArgs) -> DecayWindow {
    DecayWindow {
        t_min: args.t_min,
        t_max: args.t_max,
        theta_min: args.theta_min,
        theta_max: args.theta_max,
    }
}

fn bound_from_range(name: &str, range: &[f64]) -> Result<Bound, AppError> {
    match range {
        [lo, hi] => Ok(Bound::new(*lo, *hi)),
        _ => Err(AppError::new(
            2,
            format!("--{name}-range takes exactly two values (got {}).", range.len()),
        )),
    }
}
