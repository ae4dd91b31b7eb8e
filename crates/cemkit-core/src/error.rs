//! Error type shared by the cemkit crates.
//!
//! Library code returns [`CemResult`]; the command-line front end wraps it in
//! `anyhow` with context about which stage failed.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CemError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed text input such as a constraint sense or a timestamp
    #[error("Parse error: {0}")]
    Parse(String),

    /// The network cannot be turned into a well-posed linear program
    #[error("Validation error: {0}")]
    Validation(String),

    /// Infeasible, unbounded or numerically failed solve
    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Duplicate names or references to components that do not exist
    #[error("Network error: {0}")]
    Network(String),
}

pub type CemResult<T> = Result<T, CemError>;
