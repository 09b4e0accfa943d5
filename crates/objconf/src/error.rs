// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for table configuration and glob analysis

use crate::EngineKind;

/// Errors raised while building, validating or using a [`crate::Configuration`]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed glob syntax, detected from the pattern alone
    #[error("{}Invalid glob pattern '{pattern}': {reason} at '{fragment}'", engine_label(.engine))]
    Pattern {
        engine: Option<EngineKind>,
        pattern: String,
        fragment: String,
        reason: String,
    },

    /// Contract violation by the caller (e.g. accessor before initialization)
    #[error("Usage error: {0}")]
    Usage(String),

    /// Backend-specific rule violation
    #[error("{engine} validation error: {message}")]
    Validation { engine: EngineKind, message: String },

    /// Failure while resolving arguments into a configuration
    #[error("{engine} configuration error: {message}")]
    Configuration { engine: EngineKind, message: String },

    /// The adapter factory cannot build a handle for this backend
    #[error("No storage adapter available for {engine}")]
    UnsupportedBackend { engine: EngineKind },

    /// Listing found nothing and the query settings forbid that
    #[error("No files match pattern: {pattern}")]
    NoMatchingFiles { pattern: String },

    /// Object store error
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Settings could not be parsed
    #[error("Invalid settings: {0}")]
    Settings(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn pattern<P, F, R>(pattern: P, fragment: F, reason: R) -> Self
    where
        P: Into<String>,
        F: Into<String>,
        R: Into<String>,
    {
        Error::Pattern {
            engine: None,
            pattern: pattern.into(),
            fragment: fragment.into(),
            reason: reason.into(),
        }
    }

    /// Attribute a pattern error to the backend that raised it
    #[must_use]
    pub fn in_engine(self, kind: EngineKind) -> Self {
        match self {
            Error::Pattern {
                pattern,
                fragment,
                reason,
                ..
            } => Error::Pattern {
                engine: Some(kind),
                pattern,
                fragment,
                reason,
            },
            other => other,
        }
    }

    pub fn usage<S: Into<String>>(message: S) -> Self {
        Error::Usage(message.into())
    }

    pub fn validation<S: Into<String>>(engine: EngineKind, message: S) -> Self {
        Error::Validation {
            engine,
            message: message.into(),
        }
    }

    pub fn configuration<S: Into<String>>(engine: EngineKind, message: S) -> Self {
        Error::Configuration {
            engine,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_pattern(&self) -> bool {
        matches!(self, Error::Pattern { .. })
    }

    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }
}

fn engine_label(engine: &Option<EngineKind>) -> String {
    engine.map(|e| format!("{}: ", e)).unwrap_or_default()
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, Error>;
