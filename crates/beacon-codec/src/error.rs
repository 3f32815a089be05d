use thiserror::Error;

/// Errors returned when parsing beacon identity and address values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// UUID text could not be parsed.
    #[error("invalid uuid: {0}")]
    InvalidUuid(String),
    /// Hardware address text or bytes are malformed.
    #[error("invalid address: {0}")]
    InvalidAddress(&'static str),
}
