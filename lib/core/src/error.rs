use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// No venues available for retrieval. Degraded, not a programming error:
    /// the pipeline surfaces a single user-facing message.
    #[error("no venues available for retrieval")]
    EmptyCatalog,

    #[error("invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    /// Per-pair measurement failure. Degrades the matrix entry to infinity
    /// rather than aborting the request.
    #[error("walking distance unavailable between '{from}' and '{to}'")]
    DistanceUnavailable { from: String, to: String },

    /// No Hamiltonian completion exists over the distance matrix.
    #[error("no feasible route through the candidate set")]
    RouteInfeasible,

    /// Session-level failure of an external collaborator (distance oracle or
    /// route visualizer). Retried once per request, then surfaced.
    #[error("collaborator failure: {0}")]
    Collaborator(String),

    #[error("route visualization timed out after {0:?}")]
    VisualizationTimeout(Duration),
}
