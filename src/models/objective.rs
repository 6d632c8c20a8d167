//! Objective functions: parameter vector in, scalar cost out.
//!
//! The engine only sees the [`Objective`] trait. Plain closures work too, which is
//! what most tests use.

use crate::domain::{DecayEvents, LineData, ObjectiveKind};
use crate::models::decay::{normalisation, shape, Component, DecayWindow};

/// A scalar cost over a parameter vector.
///
/// Objectives must be pure; `Sync` lets grid scans evaluate them in parallel.
pub trait Objective: Sync {
    fn value(&self, params: &[f64]) -> f64;
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    fn value(&self, params: &[f64]) -> f64 {
        self(params)
    }
}

/// Chi-squared of a straight line `y = m·x + c`; parameters `[m, c]`.
#[derive(Debug, Clone, Copy)]
pub struct LineChiSquared<'a> {
    data: &'a LineData,
}

impl<'a> LineChiSquared<'a> {
    pub const KIND: ObjectiveKind = ObjectiveKind::ChiSquared;
    pub const NAMES: [&'static str; 2] = ["m", "c"];

    pub fn new(data: &'a LineData) -> Self {
        Self { data }
    }
}

impl Objective for LineChiSquared<'_> {
    fn value(&self, params: &[f64]) -> f64 {
        let (m, c) = (params[0], params[1]);
        self.data
            .x
            .iter()
            .zip(&self.data.y)
            .zip(&self.data.y_err)
            .map(|((&x, &y), &err)| {
                let pull = (y - (m * x + c)) / err;
                pull * pull
            })
            .sum()
    }
}

/// NLL of a single exponential lifetime; parameters `[τ]`.
///
/// Uses the untruncated density `exp(-t/τ)/τ`.
#[derive(Debug, Clone, Copy)]
pub struct LifetimeNll<'a> {
    times: &'a [f64],
}

impl<'a> LifetimeNll<'a> {
    pub const KIND: ObjectiveKind = ObjectiveKind::Nll;
    pub const NAMES: [&'static str; 1] = ["tau"];

    pub fn new(times: &'a [f64]) -> Self {
        Self { times }
    }
}

impl Objective for LifetimeNll<'_> {
    fn value(&self, params: &[f64]) -> f64 {
        let tau = params[0];
        if !(tau.is_finite() && tau > 0.0) {
            return f64::INFINITY;
        }
        let ln_tau = tau.ln();
        self.times.iter().map(|&t| ln_tau + t / tau).sum()
    }
}

/// NLL of the two-component decay density; parameters `[fraction, τ1, τ2]`.
#[derive(Debug, Clone, Copy)]
pub struct DecayNll<'a> {
    events: &'a DecayEvents,
    window: DecayWindow,
}

impl<'a> DecayNll<'a> {
    pub const KIND: ObjectiveKind = ObjectiveKind::Nll;
    pub const NAMES: [&'static str; 3] = ["fraction", "tau1", "tau2"];

    pub fn new(events: &'a DecayEvents, window: DecayWindow) -> Self {
        Self { events, window }
    }
}

impl Objective for DecayNll<'_> {
    fn value(&self, params: &[f64]) -> f64 {
        let (fraction, tau1, tau2) = (params[0], params[1], params[2]);
        if !(tau1.is_finite() && tau2.is_finite() && tau1 > 0.0 && tau2 > 0.0) {
            return f64::INFINITY;
        }
        let w1 = fraction / normalisation(&self.window, Component::First, tau1);
        let w2 = (1.0 - fraction) / normalisation(&self.window, Component::Second, tau2);

        let mut nll = 0.0;
        for (&t, &theta) in self.events.times.iter().zip(&self.events.angles) {
            let pdf = w1 * shape(Component::First, tau1, t, theta)
                + w2 * shape(Component::Second, tau2, t, theta);
            if !(pdf > 0.0) {
                return f64::INFINITY;
            }
            nll -= pdf.ln();
        }
        nll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::decay::{DecayPdf, Density};

    #[test]
    fn line_chi_squared_is_zero_on_exact_data() {
        let data = LineData {
            x: vec![0.0, 1.0, 2.0],
            y: vec![0.3, -0.2, -0.7],
            y_err: vec![0.1, 0.1, 0.1],
        };
        let chi = LineChiSquared::new(&data);
        assert!(chi.value(&[-0.5, 0.3]).abs() < 1e-20);
        // One unit of error off on every point.
        assert!((chi.value(&[-0.5, 0.4]) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn lifetime_nll_minimum_is_sample_mean() {
        let times = [0.5, 1.0, 2.5, 4.0];
        let nll = LifetimeNll::new(&times);
        let mean = 2.0;
        let at_mean = nll.value(&[mean]);
        assert!(nll.value(&[mean * 0.95]) > at_mean);
        assert!(nll.value(&[mean * 1.05]) > at_mean);
        assert!(nll.value(&[0.0]).is_infinite());
    }

    #[test]
    fn decay_nll_matches_density() {
        let events = DecayEvents {
            times: vec![0.2, 1.3, 4.0],
            angles: vec![0.1, 2.0, 5.5],
        };
        let window = DecayWindow::default();
        let pdf = DecayPdf::new(window, 1.1, 2.3, 0.4).unwrap();
        let expected: f64 = events
            .times
            .iter()
            .zip(&events.angles)
            .map(|(&t, &theta)| -pdf.evaluate(t, theta, Density::Total).ln())
            .sum();
        let nll = DecayNll::new(&events, window);
        assert!((nll.value(&[0.4, 1.1, 2.3]) - expected).abs() < 1e-10);
        assert!(nll.value(&[0.4, -1.0, 2.3]).is_infinite());
    }

    #[test]
    fn closures_are_objectives() {
        let parabola = |p: &[f64]| (p[0] - 1.0).powi(2);
        assert_eq!(Objective::value(&parabola, &[3.0]), 4.0);
    }
}
