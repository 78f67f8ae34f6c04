//! Shared error types for the specview backend.
//!
//! Every subsystem (frame, region, session, fit) defines its own
//! [`thiserror`]-derived error enum for the failures specific to it, but all
//! of them converge on [`ErrorData`] at the task boundary: loader/numerical
//! failures are caught where a task finishes and turned into a structured,
//! non-fatal message sent back to the client instead of unwinding across
//! the scheduler.

use std::fmt;
use thiserror::Error;

/// Result alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by shared geometry/collaborator-contract code in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A tile coordinate or layer was outside the addressable range.
    #[error("tile ({x}, {y}) at layer {layer} is out of range")]
    InvalidTile { x: i32, y: i32, layer: i32 },

    /// A region of interest doesn't fit within the image bounds.
    #[error("region ({x}, {y}, {w}x{h}) exceeds image bounds {width}x{height}")]
    InvalidRegion {
        x: i64,
        y: i64,
        w: i64,
        h: i64,
        width: i64,
        height: i64,
    },

    /// The requested image shape has an unsupported number of dimensions.
    #[error("unsupported dimensionality: {ndim} (must be 2-4)")]
    UnsupportedDimensionality { ndim: usize },

    /// Channel or stokes index outside the discovered axis bounds.
    #[error("index {index} out of bounds for axis of size {size}")]
    AxisOutOfBounds { index: i64, size: i64 },

    /// Opaque failure from an external collaborator (loader, WCS, importer).
    #[error("{0}")]
    Collaborator(String),
}

/// Severity levels surfaced to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorSeverity::Debug => "DEBUG",
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// The wire-level error contract: `{message, tags, severity}`.
///
/// Kinds are not a literal field — they are implied by which constructor was
/// used and folded into `tags` for client-side filtering (e.g.
/// `["validation"]`, `["stale"]`).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ErrorData {
    pub message: String,
    pub tags: Vec<String>,
    pub severity: ErrorSeverity,
}

impl ErrorData {
    fn new(message: impl Into<String>, tags: &[&str], severity: ErrorSeverity) -> Self {
        Self {
            message: message.into(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            severity,
        }
    }

    /// Bad region type, unknown file id, bad channel/stokes, unsupported
    /// dimensionality.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(message, &["validation"], ErrorSeverity::Warning)
    }

    /// Missing file, unreadable path, unsupported format, no image HDU.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(message, &["unavailable"], ErrorSeverity::Error)
    }

    /// Task cancelled, stale tile, insufficient data points to fit.
    ///
    /// A stale-tile response is *silently dropped* rather than sent; callers
    /// that hit that specific case should not construct an `ErrorData` at
    /// all. This constructor covers the other transient cases
    /// (cancellation, insufficient data).
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(message, &["transient"], ErrorSeverity::Debug)
    }

    /// Loader threw, fit solver produced non-finite output, compression
    /// failed.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message, &["internal"], ErrorSeverity::Error)
    }

    /// Write attempted while the server is running in read-only mode.
    pub fn read_only(message: impl Into<String>) -> Self {
        Self::new(message, &["read-only"], ErrorSeverity::Warning)
    }
}

impl From<Error> for ErrorData {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidTile { .. } | Error::InvalidRegion { .. } => {
                ErrorData::validation(err.to_string())
            }
            Error::UnsupportedDimensionality { .. } | Error::AxisOutOfBounds { .. } => {
                ErrorData::validation(err.to_string())
            }
            Error::Collaborator(msg) => ErrorData::internal(msg),
        }
    }
}
