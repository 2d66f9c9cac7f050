//! Payload decoding errors

/// Errors that can occur while decoding a ModelState or block payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The text is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A ModelState document must be a JSON object.
    #[error("model state is not an object")]
    NotAnObject,

    /// A complex editor payload must be a JSON array.
    #[error("block payload is not an array")]
    NotAnArray,
}
