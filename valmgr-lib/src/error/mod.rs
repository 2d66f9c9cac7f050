//! Error types

mod decode;

pub use decode::*;

/// Errors raised by the validation manager.
///
/// Only direct precondition violations and undecodable top-level input end up
/// here. Anomalies inside an accepted payload are skipped and logged instead.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// A required argument was empty or missing.
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    /// The supplied payload could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl ValidationError {
    /// Returns `true` if this is a precondition violation.
    pub fn is_missing_argument(&self) -> bool {
        matches!(self, Self::MissingArgument(_))
    }
}
