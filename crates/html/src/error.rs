use thiserror::Error;

/// Failure reported by an [`InputSource`](crate::input::InputSource).
#[derive(Debug, Error)]
pub enum InputError {
    #[error("input source read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the tokenizer and normalizer.
///
/// Malformed markup is never an error; these are resource limits, caller
/// misuse and source failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Element nesting reached the configured maximum. Fatal.
    #[error("element nesting exceeded the maximum depth of {max}")]
    DepthExceeded { max: usize },
    /// A fatal error was already returned; the parser cannot continue.
    #[error("parser is unusable after a fatal error")]
    Poisoned,
    /// Restart was requested after output became unrecoverable.
    #[error("restart requested after output became unrecoverable")]
    RestartDisabled,
    #[error(transparent)]
    Input(#[from] InputError),
}

impl ParseError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DepthExceeded { .. } | Self::Poisoned)
    }
}
