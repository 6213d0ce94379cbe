// Error types for tagging and tag reading

use thiserror::Error;

/// Result type alias using `TagError`
pub type Result<T> = std::result::Result<T, TagError>;

/// Errors raised by the container engines.
///
/// None of these ever reach callers of the orchestrator: writes fall back to the
/// original buffer and reads fall back to default metadata.
#[derive(Error, Debug)]
pub enum TagError {
    /// Signature not recognized; the buffer is passed through untouched
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A block or atom failed structural validation
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// A declared size runs past the end of the buffer
    #[error("Truncated data at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedData {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Cover art could not be resolved; tagging continues without it
    #[error("Artwork unavailable: {0}")]
    ArtworkUnavailable(String),
}

impl TagError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        TagError::MalformedContainer(msg.into())
    }
}
