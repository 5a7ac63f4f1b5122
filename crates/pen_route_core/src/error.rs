use std::collections::BTreeMap;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Raised by the spatial index when no ids remain. The greedy walk treats
    /// it as its normal stop signal.
    #[error("spatial index is empty")]
    EmptyIndex,
    /// Per-path `expected - actual` visit counts of a tour that does not
    /// draw every path exactly once.
    #[error("invalid solution: {}", format_differences(.differences))]
    InvalidSolution { differences: BTreeMap<usize, i64> },
    #[error("solver found no feasible tour: {0}")]
    SolverInfeasible(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn solver_infeasible(message: impl Into<String>) -> Self {
        Self::SolverInfeasible(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Only a search that ends without a feasible route is recoverable; a
/// rejected model or seed is a contract violation upstream.
impl From<gls::GlsError> for Error {
    fn from(err: gls::GlsError) -> Self {
        match err {
            gls::GlsError::Infeasible(reason) => Self::solver_infeasible(reason),
            err @ (gls::GlsError::InvalidModel(_) | gls::GlsError::InvalidRoute(_)) => {
                Self::other(format!("search engine rejected its input: {err}"))
            }
        }
    }
}

fn format_differences(differences: &BTreeMap<usize, i64>) -> String {
    differences
        .iter()
        .map(|(id, diff)| format!("path {id} {diff:+}"))
        .collect::<Vec<_>>()
        .join(", ")
}
