use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    #[error("icd version mismatch: server is {server}, client sent {client}")]
    IcdVersionMismatch { server: u16, client: u16 },

    #[error("unrecognized event type {0:#06x}")]
    UnknownEventType(u16),

    #[error("failed to encode message body: {0}")]
    Encode(String),

    #[error("failed to decode message body: {0}")]
    Decode(String),
}
