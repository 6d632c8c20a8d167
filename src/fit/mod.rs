//! Fitting engine.
//!
//! Responsibilities:
//!
//! - run box-constrained minimizations through an injected backend
//! - repeat them until the objective settles (with an iteration cap)
//! - estimate parameter errors by grid scan and by profile walk

pub mod backend;
pub mod convergence;
pub mod minimiser;
pub mod uncertainty;

pub use backend::*;
pub use convergence::*;
pub use minimiser::*;
pub use uncertainty::*;
