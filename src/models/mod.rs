//! Probability models and the objectives built from them.
//!
//! Models are implemented as small, pure functions so that the minimization engine
//! can stay generic over any [`Objective`].

pub mod decay;
pub mod objective;

pub use decay::{Component, DecayPdf, DecayWindow, Density};
pub use objective::*;
