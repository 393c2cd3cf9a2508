//! Error types for manifest decoding
//!
//! Checkers never return errors. These variants only cover turning raw
//! manifests into [`IstioObject`](crate::IstioObject)s.

use thiserror::Error;

/// Main error type for mesh validation
#[derive(Debug, Error)]
pub enum Error {
    /// Manifest text could not be parsed as YAML
    #[error("yaml error: {message}")]
    Yaml {
        /// Description of what failed
        message: String,
    },

    /// A parsed document could not be decoded into an object
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being decoded (if known)
        kind: Option<String>,
    },
}

impl Error {
    /// Create a YAML parse error
    pub fn yaml(msg: impl Into<String>) -> Self {
        Self::Yaml {
            message: msg.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Get the resource kind this error refers to, if known
    pub fn kind(&self) -> Option<&str> {
        match self {
            Error::Serialization { kind, .. } => kind.as_deref(),
            Error::Yaml { .. } => None,
        }
    }
}
