use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown region id {0}")]
    UnknownRegion(i32),

    #[error("export is disabled in read-only mode")]
    ReadOnly,

    #[error("region import/export error: {0}")]
    Io(String),

    #[error(transparent)]
    Core(#[from] specview_core::Error),

    #[error(transparent)]
    Frame(#[from] specview_frame::Error),

    #[error(transparent)]
    Fit(#[from] specview_fit::Error),
}
