//! Two-component decay density in decay time `t` and emission angle `θ`.
//!
//! The components are
//!
//! - `shape1(t, θ) = (1 + cos²θ) · exp(-t/τ1)`
//! - `shape2(t, θ) = 3 sin²θ · exp(-t/τ2)`
//!
//! each normalised over a rectangular `(t, θ)` window, and mixed as
//! `F · shape1/N1 + (1 - F) · shape2/N2`.
//!
//! The window integrals factorise into a time part and an angular part, both of
//! which have closed forms, so normalisation is exact and cheap enough to redo on
//! every objective evaluation.

use std::f64::consts::PI;

use crate::error::{FitError, FitResultT};

/// Integration window for the density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayWindow {
    pub t_min: f64,
    pub t_max: f64,
    pub theta_min: f64,
    pub theta_max: f64,
}

impl Default for DecayWindow {
    fn default() -> Self {
        Self {
            t_min: 0.0,
            t_max: 10.0,
            theta_min: 0.0,
            theta_max: 2.0 * PI,
        }
    }
}

impl DecayWindow {
    pub fn validate(&self) -> FitResultT<()> {
        let finite = [self.t_min, self.t_max, self.theta_min, self.theta_max]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.t_min < 0.0 || self.t_max <= self.t_min || self.theta_max <= self.theta_min {
            return Err(FitError::Configuration(format!(
                "Invalid decay window: t=[{}, {}], theta=[{}, {}].",
                self.t_min, self.t_max, self.theta_min, self.theta_max
            )));
        }
        Ok(())
    }

    pub fn contains(&self, t: f64, theta: f64) -> bool {
        t >= self.t_min && t <= self.t_max && theta >= self.theta_min && theta <= self.theta_max
    }
}

/// One of the two decay components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    First,
    Second,
}

/// Which part of the mixture to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Density {
    Total,
    Only(Component),
}

/// Normalised two-component decay density with fixed parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayPdf {
    window: DecayWindow,
    tau1: f64,
    tau2: f64,
    fraction: f64,
    norm1: f64,
    norm2: f64,
}

impl DecayPdf {
    pub fn new(window: DecayWindow, tau1: f64, tau2: f64, fraction: f64) -> FitResultT<Self> {
        window.validate()?;
        if !(tau1.is_finite() && tau2.is_finite() && tau1 > 0.0 && tau2 > 0.0) {
            return Err(FitError::Configuration(format!(
                "Lifetimes must be finite and > 0 (tau1={tau1}, tau2={tau2})."
            )));
        }
        if !(0.0..=1.0).contains(&fraction) {
            return Err(FitError::Configuration(format!(
                "Fraction must lie in [0, 1] (got {fraction})."
            )));
        }
        Ok(Self {
            window,
            tau1,
            tau2,
            fraction,
            norm1: normalisation(&window, Component::First, tau1),
            norm2: normalisation(&window, Component::Second, tau2),
        })
    }

    pub fn window(&self) -> &DecayWindow {
        &self.window
    }

    /// Unnormalised shape of one component.
    pub fn shape(&self, component: Component, t: f64, theta: f64) -> f64 {
        match component {
            Component::First => shape(component, self.tau1, t, theta),
            Component::Second => shape(component, self.tau2, t, theta),
        }
    }

    /// Integral of a component's shape over the window.
    pub fn normalisation(&self, component: Component) -> f64 {
        match component {
            Component::First => self.norm1,
            Component::Second => self.norm2,
        }
    }

    /// Evaluate the normalised density (or one weighted component of it).
    pub fn evaluate(&self, t: f64, theta: f64, density: Density) -> f64 {
        let first = || self.fraction * self.shape(Component::First, t, theta) / self.norm1;
        let second = || (1.0 - self.fraction) * self.shape(Component::Second, t, theta) / self.norm2;
        match density {
            Density::Total => first() + second(),
            Density::Only(Component::First) => first(),
            Density::Only(Component::Second) => second(),
        }
    }

    /// Upper bound of the total density over the window.
    ///
    /// The angular factors never exceed 2 and 3 respectively, and the time factor
    /// peaks at `t_min`.
    pub fn envelope(&self) -> f64 {
        let t0 = self.window.t_min;
        self.fraction * 2.0 * (-t0 / self.tau1).exp() / self.norm1
            + (1.0 - self.fraction) * 3.0 * (-t0 / self.tau2).exp() / self.norm2
    }
}

pub(crate) fn shape(component: Component, tau: f64, t: f64, theta: f64) -> f64 {
    match component {
        Component::First => (1.0 + theta.cos().powi(2)) * (-t / tau).exp(),
        Component::Second => 3.0 * theta.sin().powi(2) * (-t / tau).exp(),
    }
}

pub(crate) fn normalisation(window: &DecayWindow, component: Component, tau: f64) -> f64 {
    let time = tau * ((-window.t_min / tau).exp() - (-window.t_max / tau).exp());
    let (a, b) = (window.theta_min, window.theta_max);
    let half_width = (b - a) / 2.0;
    let oscillation = ((2.0 * b).sin() - (2.0 * a).sin()) / 4.0;
    let angular = match component {
        // ∫ 1 + cos²θ dθ
        Component::First => (b - a) + half_width + oscillation,
        // ∫ 3 sin²θ dθ
        Component::Second => 3.0 * (half_width - oscillation),
    };
    time * angular
}
