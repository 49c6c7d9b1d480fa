use std::error::Error;
use thiserror::Error;

/// Result alias for catalog operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by song catalog backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached.
    #[error("song catalog unavailable: {message}")]
    Unavailable {
        /// What the backend was doing.
        message: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message: message.into(),
            source: Box::new(source),
        }
    }
}
