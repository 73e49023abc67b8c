use thiserror::Error;

/// General decoding errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input data.
    #[error("Invalid input data: {0}")]
    InvalidInputData(String),
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Sequence-level error (unexpected state, repeat-header mismatch).
    #[error("Sequence error: {0}")]
    SequenceError(String),
    /// Slice error.
    #[error("Slice error: {0}")]
    SliceError(String),
    /// Frame error.
    #[error("Frame error: {0}")]
    FrameError(String),
    /// The sink rejected a call (e.g. `setup` failed). Fatal.
    #[error("Sink error: {0}")]
    SinkError(String),
}

/// A specialised `Result` type for decoding operations.
pub type Result<T> = ::std::result::Result<T, Error>;
