use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Frame-level errors. These never propagate across a task boundary on
/// their own — the session layer converts them into an `ErrorData` and
/// keeps going.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open image: {0}")]
    Open(String),

    #[error("loader error: {0}")]
    Loader(String),

    /// The requested `(channel, stokes)` no longer matches the live plane;
    /// the caller must silently drop whatever it was computing.
    #[error("stale plane request")]
    Stale,

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Core(#[from] specview_core::Error),

    #[error(transparent)]
    Compute(#[from] specview_compute::Error),
}
