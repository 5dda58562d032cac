use thiserror::Error;

/// Errors raised by the Game of Life engine and its platform adapters.
#[derive(Debug, Error)]
pub enum LifeError {
    /// Invalid run configuration (cell size, zero-sized grid). Fatal at start.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A loaded or imported grid does not have the shape the run expects.
    #[error("grid is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    DimensionMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("render failed: {0}")]
    Render(String),

    #[error("snapshot persistence failed: {0}")]
    Persistence(String),

    /// The artifact sink could not apply or remove an image.
    #[error("artifact sink failed: {0}")]
    Sink(String),

    /// A control command that makes no sense in the current loop state.
    #[error("{0}")]
    InvalidState(String),
}

impl LifeError {
    pub fn config(msg: impl Into<String>) -> Self {
        LifeError::Config(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        LifeError::Persistence(msg.into())
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        LifeError::Sink(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        LifeError::Render(msg.into())
    }

    /// True for errors the loop recovers from locally with a fallback grid.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LifeError::DimensionMismatch { .. })
    }
}
