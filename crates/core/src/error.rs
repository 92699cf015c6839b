//! Error types for the comfort and morphology engines
//!
//! Out-of-envelope and unknown inputs are not errors: index routines return
//! `Ok(None)` for them so the row stays in the output with an empty entry.

use thiserror::Error;

/// Crate error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Argument of the wrong geometric type or numeric shape
    #[error("Invalid inputs: {0}")]
    InvalidInputs(String),

    /// Column referenced by the configuration is absent from the input table
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Iterative solver exceeded its iteration bound
    #[error("{solver} did not converge after {iterations} iterations")]
    NonConvergence {
        /// Name of the loop that overflowed
        solver: &'static str,
        /// Iterations performed
        iterations: usize,
    },

    /// Viewpoint lies strictly inside a building
    #[error("Viewpoint ({x}, {y}) is inside a building")]
    IndoorViewpoint { x: f64, y: f64 },

    /// Ray from a viewpoint on a wall enters its anchoring building
    #[error("Ray from a border viewpoint points into its anchoring building")]
    AnchoredInside,

    /// Target unreachable from source in the road graph
    #[error("No path between the requested nodes")]
    NoPath,
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInputs(msg.into())
    }

    pub(crate) fn non_convergence(solver: &'static str, iterations: usize) -> Self {
        Error::NonConvergence { solver, iterations }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
