use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the numeric kernels in this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("downsample factor {factor} must be positive")]
    InvalidFactor { factor: i64 },

    #[error("buffer length {actual} does not match expected {expected} for a {width}x{height} plane")]
    BufferSizeMismatch {
        expected: usize,
        actual: usize,
        width: i64,
        height: i64,
    },

    #[error("compression quality {quality} out of range [1, 32]")]
    InvalidCompressionQuality { quality: i32 },

    #[error("contour level {level} is not finite")]
    NonFiniteLevel { level: f64 },
}
