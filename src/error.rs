//! Error type for the generation pipeline.

use thiserror::Error;

/// Failure modes of a generation run.
///
/// `Cancelled` doubles as the internal early-exit signal so stages can
/// propagate it with `?`; the orchestrator turns it into the
/// [`Outcome::Cancelled`](crate::pipeline::Outcome) terminal state rather
/// than reporting a failure.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("a generation run is already in progress")]
    Busy,

    #[error("generation was cancelled")]
    Cancelled,

    #[error("no background run to finish")]
    NotRunning,

    #[error("background worker failed: {0}")]
    Worker(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("buffer is {buffer_width}x{buffer_height} but grid is {grid_width}x{grid_height}")]
    GridMismatch {
        buffer_width: usize,
        buffer_height: usize,
        grid_width: usize,
        grid_height: usize,
    },

    #[error("export failed: {0}")]
    Export(String),
}
