/// The five kinds of failure a store can report.
///
/// Concrete [`StoreError`] variants carry more detail; callers that only care
/// about the category (e.g. "was the key missing?") match on the kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The requested key is absent.
    NotFound,
    /// The store or decorator does not implement the operation.
    NotSupported,
    /// A key-validating layer refused the key before any delegation.
    KeyRejected,
    /// A store was constructed with invalid parameters.
    Configuration,
    /// The underlying storage or transport failed.
    Backend,
}

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested key was not found.
    #[error("key not found: {0}")]
    NotFound(String),

    /// The operation is not implemented by this store.
    #[error("{store} does not support {operation}")]
    NotSupported {
        store: &'static str,
        operation: &'static str,
    },

    /// A key was refused by a validating or decoding layer.
    #[error("key rejected: {key}: {reason}")]
    KeyRejected { key: String, reason: String },

    /// A store or transformer was constructed with invalid parameters.
    #[error("invalid store configuration: {0}")]
    Configuration(String),

    /// A payload could not be transformed or reverse-transformed.
    #[error("codec error: {0}")]
    Codec(String),

    /// The backend failed for reasons unrelated to key presence.
    #[error("backend error: {message}")]
    Backend { message: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding in-memory state was poisoned.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// Create a not-found error for `key`.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    /// Create a not-supported error for `operation` on `store`.
    pub fn not_supported(store: &'static str, operation: &'static str) -> Self {
        Self::NotSupported { store, operation }
    }

    /// Create a key-rejected error.
    pub fn key_rejected(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::KeyRejected {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a backend error from any displayable cause.
    pub fn backend(message: impl std::fmt::Display) -> Self {
        Self::Backend {
            message: message.to_string(),
        }
    }

    /// Create a codec error from any displayable cause.
    pub fn codec(message: impl std::fmt::Display) -> Self {
        Self::Codec(message.to_string())
    }

    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotSupported { .. } => ErrorKind::NotSupported,
            Self::KeyRejected { .. } => ErrorKind::KeyRejected,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Codec(_) | Self::Backend { .. } | Self::Io(_) | Self::LockPoisoned(_) => {
                ErrorKind::Backend
            }
        }
    }

    /// Returns `true` if this is a [`ErrorKind::NotFound`] error.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::backend(format!("worker task failed: {err}"))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
