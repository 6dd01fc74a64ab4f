//! Error types for ContentCheck

/// Result type alias using ContentCheck's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ContentCheck operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// User-correctable input problems
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A model artifact could not be loaded at startup
    #[error("registry load error: {0}")]
    RegistryLoad(String),

    /// Tokenization or forward pass failed for a single request
    #[error("inference error: {0}")]
    Inference(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Broken internal invariants
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new registry load error
    pub fn registry_load(msg: impl Into<String>) -> Self {
        Self::RegistryLoad(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller can fix this by changing the request
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Short machine-readable kind, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::RegistryLoad(_) => "registry_load",
            Self::Inference(_) => "inference",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}

/// Request validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Input text is empty after trimming whitespace
    #[error("input text is empty")]
    EmptyInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_converts_into_error() {
        let err: Error = ValidationError::EmptyInput.into();
        assert!(err.is_validation());
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.to_string(), "validation error: input text is empty");
    }

    #[test]
    fn test_constructors() {
        assert!(matches!(Error::inference("boom"), Error::Inference(m) if m == "boom"));
        assert!(matches!(Error::registry_load("sms"), Error::RegistryLoad(_)));
        assert!(!Error::internal("x").is_validation());
    }
}
