use std::fmt;

/// Failure reported by an inference backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The backend could not be reached or refused the request.
    Unavailable(String),
    /// The backend answered with something the engine cannot use.
    InvalidResponse(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Unavailable(msg) => write!(f, "backend unavailable: {msg}"),
            BackendError::InvalidResponse(msg) => write!(f, "invalid backend response: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

#[derive(Debug)]
pub enum ChordError {
    NotInitialized,
    EmptyInput,
    Backend(BackendError),
    ConfigurationInvalid(String),
}

impl fmt::Display for ChordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChordError::NotInitialized => write!(f, "engine not initialized"),
            ChordError::EmptyInput => write!(f, "input text is empty"),
            ChordError::Backend(e) => write!(f, "{e}"),
            ChordError::ConfigurationInvalid(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ChordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChordError::Backend(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BackendError> for ChordError {
    fn from(e: BackendError) -> Self {
        ChordError::Backend(e)
    }
}

pub type Result<T> = std::result::Result<T, ChordError>;
