//! Error types for switchboard-core

use thiserror::Error;

/// Errors returned by the routing engine and its collaborators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// Input outside the fixed enumerations, or an unusable ticket id
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown ticket id
    #[error("ticket not found: {0}")]
    NotFound(String),

    /// Classification requested but no classifier is loaded
    #[error("advisory model not loaded")]
    ModelUnavailable,

    /// The classifier failed to load or to score
    #[error("model error: {0}")]
    Model(String),

    /// The routing policy is not internally consistent
    #[error("invalid routing policy: {0}")]
    Policy(String),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
