//! Stopping rules for the iterative loops.
//!
//! Both predicates are pure: the caller passes the previous objective value (or
//! `None` on the first pass) and the current one every time.

/// `true` once successive objective values differ by at most `threshold`.
///
/// The first pass (`previous == None`) is never converged. A threshold of `0.0`
/// demands bitwise-equal values, which a continuous objective may never produce;
/// pick a positive threshold unless the objective is known to settle exactly.
pub fn is_converged(previous: Option<f64>, current: f64, threshold: f64) -> bool {
    match previous {
        None => false,
        Some(prev) => (prev - current).abs() <= threshold,
    }
}

/// `true` once the objective has moved at least `threshold` away from `previous`.
///
/// Mirror image of [`is_converged`], used to stop profile walks.
pub fn is_exceeded(previous: Option<f64>, current: f64, threshold: f64) -> bool {
    match previous {
        None => false,
        Some(prev) => (prev - current).abs() >= threshold,
    }
}
