use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    /// Malformed or empty upload, or an image payload that cannot be decoded.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Caller broke a precondition (bad reorder indices).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The generation call failed or produced nothing usable.
    #[error("{0}")]
    ExternalService(String),
    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl EditorError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, EditorError>;
