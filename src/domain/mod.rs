//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - engine vocabulary (`Bound`, `ParamIndex`, `ObjectiveKind`, `FitResult`, `ObjectiveCurve`)
//! - tunables (`ProfileStep`, `BackendOptions`, `FitConfig`)
//! - datasets (`LineData`, `DecayEvents`) and report records (`FitSummary`)

pub mod types;

pub use types::*;
