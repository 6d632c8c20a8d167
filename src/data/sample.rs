//! Seeded synthetic datasets.
//!
//! Three generators, one per fit:
//!
//! - decay events `(t, θ)` drawn from [`DecayPdf`] by accept–reject
//! - straight-line points `y = m·x + c + N(0, σ)` with error column `σ`
//! - exponential lifetimes
//!
//! Every generator takes an explicit seed, so the same flags always reproduce the
//! same file.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Exp, Normal};

use crate::domain::{DecayEvents, LineData};
use crate::error::AppError;
use crate::models::{DecayPdf, DecayWindow, Density};

/// Give up on accept–reject after this many rejected throws per requested event.
const MAX_THROWS_PER_EVENT: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecaySampleConfig {
    pub n_events: usize,
    pub tau1: f64,
    pub tau2: f64,
    pub fraction: f64,
    pub window: DecayWindow,
    pub seed: u64,
}

impl Default for DecaySampleConfig {
    fn default() -> Self {
        Self {
            n_events: 10_000,
            tau1: 1.0,
            tau2: 2.0,
            fraction: 0.5,
            window: DecayWindow::default(),
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSampleConfig {
    pub n_points: usize,
    pub m: f64,
    pub c: f64,
    pub sigma: f64,
    pub x_min: f64,
    pub x_max: f64,
    pub seed: u64,
}

impl Default for LineSampleConfig {
    fn default() -> Self {
        Self {
            n_points: 50,
            m: -0.5,
            c: 0.3,
            sigma: 0.05,
            x_min: 0.0,
            x_max: 2.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifetimeSampleConfig {
    pub n_events: usize,
    pub tau: f64,
    pub seed: u64,
}

impl Default for LifetimeSampleConfig {
    fn default() -> Self {
        Self {
            n_events: 1_000,
            tau: 2.2,
            seed: 42,
        }
    }
}

/// Draw `(t, θ)` events with the box method: throw uniformly inside the window
/// and under the density's envelope, keep the throws that land under the density.
pub fn generate_decay_events(config: &DecaySampleConfig) -> Result<DecayEvents, AppError> {
    if config.n_events == 0 {
        return Err(AppError::new(2, "Event count must be > 0."));
    }
    let pdf = DecayPdf::new(config.window, config.tau1, config.tau2, config.fraction)?;
    let window = pdf.window();
    let envelope = pdf.envelope();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut events = DecayEvents {
        times: Vec::with_capacity(config.n_events),
        angles: Vec::with_capacity(config.n_events),
    };
    let max_throws = config.n_events.saturating_mul(MAX_THROWS_PER_EVENT);
    let mut throws = 0usize;

    while events.len() < config.n_events {
        if throws >= max_throws {
            return Err(AppError::new(
                4,
                format!(
                    "Accept-reject gave up after {throws} throws ({} of {} events accepted).",
                    events.len(),
                    config.n_events
                ),
            ));
        }
        throws += 1;

        let t = rng.gen_range(window.t_min..window.t_max);
        let theta = rng.gen_range(window.theta_min..window.theta_max);
        let y = envelope * rng.r#gen::<f64>();
        if y < pdf.evaluate(t, theta, Density::Total) {
            events.times.push(t);
            events.angles.push(theta);
        }
    }

    tracing::info!(
        events = events.len(),
        throws,
        acceptance = events.len() as f64 / throws as f64,
        "generated decay events"
    );
    Ok(events)
}

/// Straight-line points at evenly spaced `x`, with Gaussian noise on `y`.
pub fn generate_line_data(config: &LineSampleConfig) -> Result<LineData, AppError> {
    if config.n_points < 2 {
        return Err(AppError::new(2, "Point count must be >= 2."));
    }
    if !(config.x_min.is_finite() && config.x_max.is_finite() && config.x_max > config.x_min) {
        return Err(AppError::new(2, "Invalid x range for line generation."));
    }
    if !(config.m.is_finite() && config.c.is_finite()) {
        return Err(AppError::new(2, "Line parameters must be finite."));
    }
    if !(config.sigma.is_finite() && config.sigma > 0.0) {
        return Err(AppError::new(2, "Noise sigma must be finite and > 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, config.sigma)
        .map_err(|e| AppError::new(2, format!("Invalid noise sigma {}: {e}", config.sigma)))?;

    let step = (config.x_max - config.x_min) / (config.n_points as f64 - 1.0);
    let mut data = LineData::default();
    for i in 0..config.n_points {
        let x = config.x_min + step * i as f64;
        data.x.push(x);
        data.y.push(config.m * x + config.c + normal.sample(&mut rng));
        data.y_err.push(config.sigma);
    }
    Ok(data)
}

/// Exponentially distributed decay times with mean `tau`.
pub fn generate_lifetimes(config: &LifetimeSampleConfig) -> Result<Vec<f64>, AppError> {
    if config.n_events == 0 {
        return Err(AppError::new(2, "Event count must be > 0."));
    }
    if !(config.tau.is_finite() && config.tau > 0.0) {
        return Err(AppError::new(2, format!("Lifetime must be finite and > 0 (got {}).", config.tau)));
    }
    let exp = Exp::new(1.0 / config.tau)
        .map_err(|e| AppError::new(2, format!("Invalid lifetime {}: {e}", config.tau)))?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    Ok((0..config.n_events).map(|_| exp.sample(&mut rng)).collect())
}
