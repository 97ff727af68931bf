//! Error types for the RAN simulator.

use thiserror::Error;

/// Errors produced across the simulator.
///
/// The first six variants form the taxonomy shared by the stores, the
/// subscription engine and the service-model clients; the remaining
/// variants wrap external failure sources.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An entity with the same identifier already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Malformed input or identifier.
    #[error("invalid: {0}")]
    Invalid(String),

    /// A required collaborator is missing, e.g. no codec plugin for an OID.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The operation is not supported by the target, e.g. KPM control.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Internal failure: codec error, channel error.
    #[error("internal: {0}")]
    Internal(String),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML model parse errors.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

impl Error {
    /// Returns true if this is a [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Returns true if this is an [`Error::Invalid`].
    pub fn is_invalid(&self) -> bool {
        matches!(self, Error::Invalid(_))
    }
}

/// Result alias used across the simulator.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("UE 1234567".to_string());
        assert_eq!(err.to_string(), "not found: UE 1234567");
        let err = Error::NotSupported("control".to_string());
        assert_eq!(err.to_string(), "not supported: control");
    }

    #[test]
    fn test_error_predicates() {
        assert!(Error::NotFound(String::new()).is_not_found());
        assert!(!Error::NotFound(String::new()).is_invalid());
        assert!(Error::Invalid(String::new()).is_invalid());
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
