use cqrs_es::AggregateError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Entity not found: {entity}")]
    NotFound { entity: String },

    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: u64 },

    #[error("Uniqueness conflict: {field}")]
    Uniqueness { field: String },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Cannot {action} during the {step} step")]
    WrongStep { action: String, step: String },

    #[error("Step blocked: {message}")]
    Gate { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Extraction failed: {message}")]
    Extraction { message: String },

    #[error("Submission failed: {message}")]
    Submission { message: String },

    #[error("Store error: {message}")]
    Store { message: String },
}

impl Error {
    pub(crate) fn gate(message: impl Into<String>) -> Self {
        Self::Gate { message: message.into() }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }
}

impl From<AggregateError<Error>> for Error {
    fn from(err: AggregateError<Error>) -> Self {
        match err {
            AggregateError::UserError(e) => e,
            other => Self::Store { message: other.to_string() },
        }
    }
}
