//! `decay-fit` library crate.
//!
//! The binary (`decay-fit`) is a thin wrapper around this library so that:
//!
//! - the engine is testable without spawning processes
//! - objectives and backends can be swapped from other Rust code
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
