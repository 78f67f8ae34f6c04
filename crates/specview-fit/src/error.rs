use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("fit configuration invalid: {0}")]
    InvalidConfig(String),

    #[error("solver did not converge: {0}")]
    DidNotConverge(String),

    #[error("region has no pixels to fit")]
    EmptyRegion,
}
