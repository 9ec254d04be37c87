//! TransLoc API error types.

/// Errors that can occur when talking to the TransLoc feed.
#[derive(Debug, thiserror::Error)]
pub enum TransLocError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response JSON
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// Response did not carry the expected top-level key
    #[error("response has no {0:?} key")]
    MissingKey(&'static str),
}
