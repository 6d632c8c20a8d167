//! Mathematical utilities: finite-difference curvature and covariance.

pub mod hessian;

pub use hessian::*;
