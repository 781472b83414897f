//! Error types for the Lectern system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LecternError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Authorization denied: {reason}")]
    Forbidden { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type LecternResult<T> = Result<T, LecternError>;
