//! Core pipeline logic — resolution, expansion, parsing, execution, state.

pub mod executor;
pub mod include;
pub mod parser;
pub mod resolver;
pub mod scan;
pub mod state;
pub mod timestamp;
pub mod types;
