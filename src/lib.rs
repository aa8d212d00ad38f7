//! opchain — declarative operation-pipeline runner.
//!
//! Reads a line-oriented config of named shell operations, expands
//! `include-config` directives, and runs the operations in order, leaving an
//! auditable record of each one in a state directory.

pub mod cli;
pub mod core;
pub mod error;
pub mod transport;

pub use error::{OpchainError, Result};
