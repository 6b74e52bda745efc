use std::time::Duration;

use crate::gemini::GeminiError;

/// The model's text could not be read as a fan-out response.
/// `raw` is the text after fence stripping, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("JSON parse failed: {message}")]
pub struct ParseError {
    pub message: String,
    pub raw: String,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, raw: &str) -> Self {
        Self {
            message: message.into(),
            raw: raw.to_string(),
        }
    }
}

/// Failure of a single lookup. Never crosses the batch boundary.
#[derive(Debug, thiserror::Error)]
pub enum FanOutError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error(transparent)]
    Generation(#[from] GeminiError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
}

impl FanOutError {
    /// Raw model text when the failure happened while parsing it.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            FanOutError::Parse(e) => Some(&e.raw),
            _ => None,
        }
    }
}
