use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown file id {0}")]
    UnknownFile(i32),

    #[error("read-only mode rejects this operation")]
    ReadOnly,

    #[error(transparent)]
    Frame(#[from] specview_frame::Error),

    #[error(transparent)]
    Region(#[from] specview_region::Error),

    #[error(transparent)]
    Fit(#[from] specview_fit::Error),
}

impl Error {
    /// Maps this error onto the wire-level severity/tag contract:
    /// nothing from a loader or numerical failure is ever fatal to a
    /// session, only reported.
    pub fn to_wire(&self) -> specview_wire::ErrorData {
        use specview_wire::ErrorSeverity::*;
        let (severity, tags): (specview_wire::ErrorSeverity, &[&str]) = match self {
            Error::UnknownFile(_) => (Warning, &["validation"]),
            Error::ReadOnly => (Warning, &["read-only"]),
            Error::Frame(specview_frame::Error::Stale) => (Debug, &["transient", "stale"]),
            Error::Frame(specview_frame::Error::Cancelled) => (Debug, &["transient", "cancelled"]),
            Error::Frame(_) => (Error, &["internal"]),
            Error::Region(specview_region::Error::UnknownRegion(_)) => (Warning, &["validation"]),
            Error::Region(specview_region::Error::ReadOnly) => (Warning, &["read-only"]),
            Error::Region(_) => (Error, &["internal"]),
            Error::Fit(specview_fit::Error::EmptyRegion) => (Debug, &["transient"]),
            Error::Fit(_) => (Error, &["internal"]),
        };
        specview_wire::ErrorData {
            message: self.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            severity,
        }
    }
}
