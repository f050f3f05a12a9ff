// Domain failures raised by the repos.
//
// Repos return `anyhow::Result`; these travel inside the `anyhow::Error`
// and the API layer downcasts to pick a status code.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MesError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl MesError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Finds a `MesError` anywhere in the chain.
pub fn domain_error(err: &anyhow::Error) -> Option<&MesError> {
    err.chain().find_map(|cause| cause.downcast_ref::<MesError>())
}
