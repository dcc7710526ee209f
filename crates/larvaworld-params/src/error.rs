//! Error types for parameter registration and evaluation

use thiserror::Error;

/// Errors raised while building or evaluating a parameter registry
#[derive(Debug, Error)]
pub enum ParError {
    #[error("Key {0} already exists")]
    DuplicateKey(String),

    #[error("Parameter {key} depends on unregistered key {missing}")]
    UnresolvedDependency { key: String, missing: String },

    #[error("Unknown parameter key: {0}")]
    UnknownKey(String),

    #[error("No accessor registered for raw parameter {0}")]
    MissingAccessor(String),

    #[error("Parameter {0} is not available for this agent")]
    Unavailable(String),

    #[error("Cannot convert {from} to {to}")]
    IncompatibleUnits { from: String, to: String },

    #[error("Unknown parameter collection: {0}")]
    UnknownCollection(String),

    #[error("Registry serialization failed: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, ParError>;
