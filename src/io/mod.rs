//! Input/output helpers.
//!
//! - whitespace dataset ingest + validation (`ingest`)
//! - dataset writers and JSON report export (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
